use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::waste_report::{CreateWasteReport, WasteReport},
    types::ReportStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_report_middleware};

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub status: Option<ReportStatus>,
}

pub async fn get_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<WasteReport>>>, ApiError> {
    let reports = WasteReport::find_all(&state.db().pool, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(reports)))
}

pub async fn get_report(
    Extension(report): Extension<WasteReport>,
) -> Result<ResponseJson<ApiResponse<WasteReport>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn create_report(
    State(state): State<AppState>,
    Json(payload): Json<CreateWasteReport>,
) -> Result<ResponseJson<ApiResponse<WasteReport>>, ApiError> {
    let report = WasteReport::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn reject_report(
    Extension(report): Extension<WasteReport>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<WasteReport>>, ApiError> {
    let report = WasteReport::reject(&state.db().pool, report.id).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let report_id_router = Router::new()
        .route("/", get(get_report))
        .route("/reject", post(reject_report))
        .layer(from_fn_with_state(state.clone(), load_report_middleware));

    Router::new()
        .route("/reports", get(get_reports).post(create_report))
        .nest("/reports/{id}", report_id_router)
}

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::enterprise::{CreateEnterprise, Enterprise};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn get_enterprises(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Enterprise>>>, ApiError> {
    let enterprises = Enterprise::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(enterprises)))
}

pub async fn get_enterprise(
    State(state): State<AppState>,
    Path(enterprise_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Enterprise>>, ApiError> {
    let enterprise = Enterprise::find_by_id(&state.db().pool, enterprise_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Enterprise not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(enterprise)))
}

pub async fn create_enterprise(
    State(state): State<AppState>,
    Json(payload): Json<CreateEnterprise>,
) -> Result<ResponseJson<ApiResponse<Enterprise>>, ApiError> {
    let enterprise = Enterprise::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(enterprise)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enterprises", get(get_enterprises).post(create_enterprise))
        .route("/enterprises/{id}", get(get_enterprise))
}

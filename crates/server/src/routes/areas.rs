use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::area::{Area, CreateArea};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn get_areas(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Area>>>, ApiError> {
    let areas = Area::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(areas)))
}

pub async fn get_area(
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Area>>, ApiError> {
    let area = Area::find_by_id(&state.db().pool, area_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Area not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(area)))
}

pub async fn create_area(
    State(state): State<AppState>,
    Json(payload): Json<CreateArea>,
) -> Result<ResponseJson<ApiResponse<Area>>, ApiError> {
    let area = Area::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(area)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/areas", get(get_areas).post(create_area))
        .route("/areas/{id}", get(get_area))
}

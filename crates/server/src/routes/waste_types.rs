use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::waste_type::{CreateWasteType, WasteType};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn get_waste_types(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<WasteType>>>, ApiError> {
    let waste_types = WasteType::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(waste_types)))
}

pub async fn get_waste_type(
    State(state): State<AppState>,
    Path(waste_type_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WasteType>>, ApiError> {
    let waste_type = WasteType::find_by_id(&state.db().pool, waste_type_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Waste type not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(waste_type)))
}

pub async fn create_waste_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateWasteType>,
) -> Result<ResponseJson<ApiResponse<WasteType>>, ApiError> {
    let waste_type = WasteType::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(waste_type)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/waste-types", get(get_waste_types).post(create_waste_type))
        .route("/waste-types/{id}", get(get_waste_type))
}

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::capability::{Capability, CreateCapability},
    types::CapabilityStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_capability_middleware};

#[derive(Debug, Deserialize)]
pub struct CapabilityQuery {
    pub enterprise_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCapability {
    pub daily_capacity_kg: f64,
}

pub async fn get_capabilities(
    State(state): State<AppState>,
    Query(query): Query<CapabilityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Capability>>>, ApiError> {
    let capabilities = match query.enterprise_id {
        Some(enterprise_id) => {
            Capability::find_by_enterprise_id(&state.db().pool, enterprise_id).await?
        }
        None => Capability::find_all(&state.db().pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(capabilities)))
}

pub async fn get_capability(
    Extension(capability): Extension<Capability>,
) -> Result<ResponseJson<ApiResponse<Capability>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(capability)))
}

pub async fn create_capability(
    State(state): State<AppState>,
    Json(payload): Json<CreateCapability>,
) -> Result<ResponseJson<ApiResponse<Capability>>, ApiError> {
    let capability = Capability::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(capability)))
}

pub async fn update_capability(
    Extension(capability): Extension<Capability>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCapability>,
) -> Result<ResponseJson<ApiResponse<Capability>>, ApiError> {
    let capability =
        Capability::update_daily_capacity(&state.db().pool, capability.id, payload.daily_capacity_kg)
            .await?;
    Ok(ResponseJson(ApiResponse::success(capability)))
}

pub async fn deactivate_capability(
    Extension(capability): Extension<Capability>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Capability>>, ApiError> {
    let capability =
        Capability::set_status(&state.db().pool, capability.id, CapabilityStatus::Inactive).await?;
    Ok(ResponseJson(ApiResponse::success(capability)))
}

pub async fn reactivate_capability(
    Extension(capability): Extension<Capability>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Capability>>, ApiError> {
    let capability =
        Capability::set_status(&state.db().pool, capability.id, CapabilityStatus::Active).await?;
    Ok(ResponseJson(ApiResponse::success(capability)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let capability_id_router = Router::new()
        .route("/", get(get_capability).put(update_capability))
        .route("/deactivate", post(deactivate_capability))
        .route("/reactivate", post(reactivate_capability))
        .layer(from_fn_with_state(
            state.clone(),
            load_capability_middleware,
        ));

    Router::new()
        .route("/capabilities", get(get_capabilities).post(create_capability))
        .nest("/capabilities/{id}", capability_id_router)
}

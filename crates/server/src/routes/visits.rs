use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    TransactionTrait,
    models::collection_visit::{
        AddPhoto, AddWasteItem, CollectionVisit, EvidencePhoto, StartVisit, VisitWasteItem,
    },
    types::VisitStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_visit_middleware};

#[derive(Debug, Deserialize)]
pub struct CompleteVisit {
    pub status: Option<VisitStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RateVisit {
    pub rating: i32,
    pub comment: Option<String>,
}

pub async fn start_visit(
    State(state): State<AppState>,
    Json(payload): Json<StartVisit>,
) -> Result<ResponseJson<ApiResponse<CollectionVisit>>, ApiError> {
    let tx = state.db().pool.begin().await?;
    let visit = CollectionVisit::start(&tx, &payload, Uuid::new_v4()).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(visit)))
}

pub async fn get_visit(
    Extension(visit): Extension<CollectionVisit>,
) -> Result<ResponseJson<ApiResponse<CollectionVisit>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(visit)))
}

pub async fn get_reconciliation_queue(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<CollectionVisit>>>, ApiError> {
    let visits = CollectionVisit::find_needing_reconciliation(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(visits)))
}

pub async fn add_waste_item(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
    Json(payload): Json<AddWasteItem>,
) -> Result<ResponseJson<ApiResponse<VisitWasteItem>>, ApiError> {
    let item =
        CollectionVisit::add_waste_item(&state.db().pool, visit.id, &payload, Uuid::new_v4())
            .await?;
    Ok(ResponseJson(ApiResponse::success(item)))
}

pub async fn get_waste_items(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<VisitWasteItem>>>, ApiError> {
    let items = CollectionVisit::list_waste_items(&state.db().pool, visit.id).await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

pub async fn add_photo(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
    Json(payload): Json<AddPhoto>,
) -> Result<ResponseJson<ApiResponse<EvidencePhoto>>, ApiError> {
    let photo =
        CollectionVisit::add_photo(&state.db().pool, visit.id, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(photo)))
}

pub async fn get_photos(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<EvidencePhoto>>>, ApiError> {
    let photos = CollectionVisit::list_photos(&state.db().pool, visit.id).await?;
    Ok(ResponseJson(ApiResponse::success(photos)))
}

pub async fn complete_visit(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
    Json(payload): Json<CompleteVisit>,
) -> Result<ResponseJson<ApiResponse<CollectionVisit>>, ApiError> {
    let outcome = payload.status.unwrap_or(VisitStatus::Visited);
    let tx = state.db().pool.begin().await?;
    let visit = CollectionVisit::complete(&tx, visit.id, outcome).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(visit)))
}

pub async fn rate_visit(
    Extension(visit): Extension<CollectionVisit>,
    State(state): State<AppState>,
    Json(payload): Json<RateVisit>,
) -> Result<ResponseJson<ApiResponse<CollectionVisit>>, ApiError> {
    let visit =
        CollectionVisit::rate(&state.db().pool, visit.id, payload.rating, payload.comment).await?;
    Ok(ResponseJson(ApiResponse::success(visit)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let visit_id_router = Router::new()
        .route("/", get(get_visit))
        .route("/items", get(get_waste_items).post(add_waste_item))
        .route("/photos", get(get_photos).post(add_photo))
        .route("/complete", post(complete_visit))
        .route("/rating", post(rate_visit))
        .layer(from_fn_with_state(state.clone(), load_visit_middleware));

    Router::new()
        .route("/visits", post(start_visit))
        .route("/visits/reconciliation", get(get_reconciliation_queue))
        .nest("/visits/{id}", visit_id_router)
}

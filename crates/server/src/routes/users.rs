use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::Duration;
use db::models::user::{CreateUser, User};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_user_middleware};

const DELETE_GRACE_DAYS_ENV: &str = "BINFLOW_DELETE_GRACE_DAYS";
const DEFAULT_DELETE_GRACE_DAYS: i64 = 14;

pub(crate) fn delete_grace() -> Duration {
    let days = std::env::var(DELETE_GRACE_DAYS_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_DELETE_GRACE_DAYS);
    Duration::days(days)
}

pub async fn get_users(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = User::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn get_user(
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn schedule_user_delete(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::schedule_delete(&state.db().pool, user.id, delete_grace()).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn restore_user(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::cancel_delete(&state.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let user_id_router = Router::new()
        .route("/", get(get_user))
        .route("/delete", post(schedule_user_delete))
        .route("/restore", post(restore_user))
        .layer(from_fn_with_state(state.clone(), load_user_middleware));

    Router::new()
        .route("/users", get(get_users).post(create_user))
        .nest("/users/{id}", user_id_router)
}

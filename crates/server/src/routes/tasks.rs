use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    TransactionTrait,
    models::{
        task::{CreateTask, Task},
        task_assignment::TaskAssignment,
    },
    types::TaskStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_task_middleware};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTask {
    pub collector_id: Uuid,
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_all(&state.db().pool, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let tx = state.db().pool.begin().await?;
    let task = Task::create_from_report(&tx, &payload, Uuid::new_v4()).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn assign_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<AssignTask>,
) -> Result<ResponseJson<ApiResponse<TaskAssignment>>, ApiError> {
    let tx = state.db().pool.begin().await?;
    let assignment =
        TaskAssignment::assign(&tx, task.id, payload.collector_id, Uuid::new_v4()).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(assignment)))
}

pub async fn cancel_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let tx = state.db().pool.begin().await?;
    let task = Task::cancel(&tx, task.id).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

async fn active_assignment(state: &AppState, task_id: Uuid) -> Result<TaskAssignment, ApiError> {
    let assignments = TaskAssignment::find_by_task(&state.db().pool, task_id).await?;
    assignments
        .into_iter()
        .find(|assignment| assignment.status.is_active())
        .ok_or_else(|| ApiError::Conflict("Task has no active assignment".to_string()))
}

pub async fn accept_assignment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskAssignment>>, ApiError> {
    let assignment = active_assignment(&state, task.id).await?;
    let tx = state.db().pool.begin().await?;
    let assignment = TaskAssignment::accept(&tx, assignment.id).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(assignment)))
}

pub async fn reject_assignment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskAssignment>>, ApiError> {
    let assignment = active_assignment(&state, task.id).await?;
    let tx = state.db().pool.begin().await?;
    let assignment = TaskAssignment::reject(&tx, assignment.id).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(assignment)))
}

pub async fn unassign_assignment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskAssignment>>, ApiError> {
    let assignment = active_assignment(&state, task.id).await?;
    let tx = state.db().pool.begin().await?;
    let assignment = TaskAssignment::unassign(&tx, assignment.id).await?;
    tx.commit().await?;
    Ok(ResponseJson(ApiResponse::success(assignment)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task))
        .route("/assign", post(assign_task))
        .route("/cancel", post(cancel_task))
        .route("/assignment/accept", post(accept_assignment))
        .route("/assignment/reject", post(reject_assignment))
        .route("/assignment/unassign", post(unassign_assignment))
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .nest("/tasks/{id}", task_id_router)
}

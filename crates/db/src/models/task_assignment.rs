use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{task, task_assignment, user},
    models::ids,
    types::{AssignmentStatus, TaskStatus, UserRole},
};

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Assignment not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Collector not found")]
    CollectorNotFound,
    #[error("User does not have the collector role")]
    NotACollector,
    #[error("Task already has an active assignment")]
    AssignmentConflict,
    #[error("Task is not open for assignment (status: {0})")]
    TaskNotAssignable(TaskStatus),
    #[error("Assignment is not in a state that permits this operation: {0}")]
    InvalidState(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub collector_id: Uuid,
    pub status: AssignmentStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskAssignment {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task_assignment::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let collector_id = ids::user_uuid_by_id(db, model.collector_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Collector not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id,
            collector_id,
            status: model.status,
            accepted_at: model.accepted_at.map(Into::into),
            unassigned_at: model.unassigned_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task_assignment::Entity::find()
            .filter(task_assignment::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = task_assignment::Entity::find()
            .filter(task_assignment::Column::TaskId.eq(task_row_id))
            .order_by_desc(task_assignment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut assignments = Vec::with_capacity(models.len());
        for model in models {
            assignments.push(Self::from_model(db, model).await?);
        }
        Ok(assignments)
    }

    pub(crate) async fn find_active_by_task_row_id<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Option<task_assignment::Model>, DbErr> {
        task_assignment::Entity::find()
            .filter(task_assignment::Column::TaskId.eq(task_row_id))
            .filter(
                task_assignment::Column::Status
                    .is_in([AssignmentStatus::Assigned, AssignmentStatus::Accepted]),
            )
            .one(db)
            .await
    }

    /// Hand a pending task to a collector. The task flips to ASSIGNED with a
    /// status-guarded update, so two dispatchers racing on the same task
    /// produce exactly one assignment.
    pub async fn assign<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        collector_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Self, AssignmentError> {
        let task_record = task::Entity::find()
            .filter(task::Column::Uuid.eq(task_id))
            .one(db)
            .await?
            .ok_or(AssignmentError::TaskNotFound)?;

        let collector = user::Entity::find()
            .filter(user::Column::Uuid.eq(collector_id))
            .one(db)
            .await?
            .ok_or(AssignmentError::CollectorNotFound)?;
        if collector.role != UserRole::Collector {
            return Err(AssignmentError::NotACollector);
        }

        if Self::find_active_by_task_row_id(db, task_record.id)
            .await?
            .is_some()
        {
            return Err(AssignmentError::AssignmentConflict);
        }

        let moved = crate::models::task::Task::transition_by_row_id(
            db,
            task_record.id,
            TaskStatus::Pending,
            TaskStatus::Assigned,
        )
        .await?;
        if !moved {
            // Either the task was never pending or another assignment won.
            let reloaded = task::Entity::find_by_id(task_record.id)
                .one(db)
                .await?
                .ok_or(AssignmentError::TaskNotFound)?;
            return Err(AssignmentError::TaskNotAssignable(reloaded.status));
        }

        let now = Utc::now();
        let active = task_assignment::ActiveModel {
            uuid: Set(assignment_id),
            task_id: Set(task_record.id),
            collector_id: Set(collector.id),
            status: Set(AssignmentStatus::Assigned),
            accepted_at: Set(None),
            unassigned_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    /// Collector takes the job: assignment to ACCEPTED, task to IN_PROGRESS.
    pub async fn accept<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, AssignmentError> {
        let record = task_assignment::Entity::find()
            .filter(task_assignment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AssignmentError::NotFound)?;

        if record.status != AssignmentStatus::Assigned {
            return Err(AssignmentError::InvalidState(format!(
                "Only pending assignments can be accepted (current status: {})",
                record.status
            )));
        }

        crate::models::task::Task::transition_by_row_id(
            db,
            record.task_id,
            TaskStatus::Assigned,
            TaskStatus::InProgress,
        )
        .await?;

        let now = Utc::now();
        let mut active: task_assignment::ActiveModel = record.into();
        active.status = Set(AssignmentStatus::Accepted);
        active.accepted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Collector turns the job down; the task returns to the pool.
    pub async fn reject<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, AssignmentError> {
        let record = task_assignment::Entity::find()
            .filter(task_assignment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AssignmentError::NotFound)?;

        if record.status != AssignmentStatus::Assigned {
            return Err(AssignmentError::InvalidState(format!(
                "Only pending assignments can be rejected (current status: {})",
                record.status
            )));
        }

        crate::models::task::Task::transition_by_row_id(
            db,
            record.task_id,
            TaskStatus::Assigned,
            TaskStatus::Pending,
        )
        .await?;

        let mut active: task_assignment::ActiveModel = record.into();
        active.status = Set(AssignmentStatus::Rejected);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Dispatcher withdraws an active assignment; the task returns to the
    /// pool whether or not work had started.
    pub async fn unassign<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, AssignmentError> {
        let record = task_assignment::Entity::find()
            .filter(task_assignment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AssignmentError::NotFound)?;

        if !record.status.is_active() {
            return Err(AssignmentError::InvalidState(format!(
                "Only active assignments can be withdrawn (current status: {})",
                record.status
            )));
        }

        task::Entity::update_many()
            .col_expr(task::Column::Status, Expr::value(TaskStatus::Pending))
            .col_expr(
                task::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(task::Column::Id.eq(record.task_id))
            .filter(task::Column::Status.is_in([TaskStatus::Assigned, TaskStatus::InProgress]))
            .exec(db)
            .await?;

        let now = Utc::now();
        let mut active: task_assignment::ActiveModel = record.into();
        active.status = Set(AssignmentStatus::Unassigned);
        active.unassigned_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Close the task's active assignment. Used when a visit completes.
    pub(crate) async fn complete_by_task_row_id<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<(), DbErr> {
        task_assignment::Entity::update_many()
            .col_expr(
                task_assignment::Column::Status,
                Expr::value(AssignmentStatus::Completed),
            )
            .col_expr(
                task_assignment::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(task_assignment::Column::TaskId.eq(task_row_id))
            .filter(
                task_assignment::Column::Status
                    .is_in([AssignmentStatus::Assigned, AssignmentStatus::Accepted]),
            )
            .exec(db)
            .await?;
        Ok(())
    }
}

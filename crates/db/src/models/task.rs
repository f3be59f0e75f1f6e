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
    entities::{task, task_assignment, waste_report},
    models::{ids, waste_report::WasteReport},
    types::{AssignmentStatus, ReportStatus, TaskPriority, TaskStatus},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("Waste report not found")]
    ReportNotFound,
    #[error("Enterprise not found")]
    EnterpriseNotFound,
    #[error("Report is not in a state that permits scheduling: {0}")]
    InvalidReportState(String),
    #[error("Task cannot move from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub report_id: Uuid,
    pub enterprise_id: Uuid,
    pub area_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub report_id: Uuid,
    pub enterprise_id: Uuid,
    pub priority: Option<TaskPriority>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

impl Task {
    pub(crate) async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task::Model,
    ) -> Result<Self, DbErr> {
        let report_id = ids::waste_report_uuid_by_id(db, model.report_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Waste report not found".to_string()))?;
        let enterprise_id = ids::enterprise_uuid_by_id(db, model.enterprise_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Enterprise not found".to_string()))?;
        let area_id = ids::area_uuid_by_id(db, model.area_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Area not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            report_id,
            enterprise_id,
            area_id,
            status: model.status,
            priority: model.priority,
            scheduled_date: model.scheduled_date.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = task::Entity::find();
        if let Some(status) = status {
            query = query.filter(task::Column::Status.eq(status));
        }
        let models = query
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    /// Schedule a submitted report: create the pickup task and move the
    /// report to SCHEDULED in the same connection (callers wrap this in a
    /// transaction).
    pub async fn create_from_report<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let report = waste_report::Entity::find()
            .filter(waste_report::Column::Uuid.eq(data.report_id))
            .one(db)
            .await?
            .ok_or(TaskError::ReportNotFound)?;
        if report.status != ReportStatus::Submitted {
            return Err(TaskError::InvalidReportState(format!(
                "Report is {}, only submitted reports can be scheduled",
                report.status
            )));
        }

        let enterprise_row_id = ids::enterprise_id_by_uuid(db, data.enterprise_id)
            .await?
            .ok_or(TaskError::EnterpriseNotFound)?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            report_id: Set(report.id),
            enterprise_id: Set(enterprise_row_id),
            area_id: Set(report.area_id),
            status: Set(TaskStatus::Pending),
            priority: Set(data.priority.clone().unwrap_or_default()),
            scheduled_date: Set(data.scheduled_date.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        WasteReport::update_status_by_row_id(db, model.report_id, ReportStatus::Scheduled).await?;

        Ok(Self::from_model(db, model).await?)
    }

    /// Guarded status flip: succeeds only when the row is still in `from`.
    /// Returns false when another writer won the race.
    pub(crate) async fn transition_by_row_id<C: ConnectionTrait>(
        db: &C,
        row_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, DbErr> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::Status, Expr::value(to))
            .col_expr(
                task::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(task::Column::Id.eq(row_id))
            .filter(task::Column::Status.eq(from))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;

        if !record.status.can_transition_to(&status) {
            return Err(TaskError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        if !Self::transition_by_row_id(db, record.id, record.status.clone(), status.clone()).await?
        {
            // The row moved between the read and the guarded write.
            let reloaded = task::Entity::find_by_id(record.id)
                .one(db)
                .await?
                .ok_or(TaskError::NotFound)?;
            return Err(TaskError::InvalidTransition {
                from: reloaded.status,
                to: status,
            });
        }

        let updated = task::Entity::find_by_id(record.id)
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Cancel a task from any non-terminal state, withdrawing its active
    /// assignment if one exists.
    pub async fn cancel<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;

        let result = task::Entity::update_many()
            .col_expr(task::Column::Status, Expr::value(TaskStatus::Cancelled))
            .col_expr(
                task::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(task::Column::Id.eq(record.id))
            .filter(task::Column::Status.is_in([
                TaskStatus::Pending,
                TaskStatus::Assigned,
                TaskStatus::InProgress,
            ]))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            let reloaded = task::Entity::find_by_id(record.id)
                .one(db)
                .await?
                .ok_or(TaskError::NotFound)?;
            return Err(TaskError::InvalidTransition {
                from: reloaded.status,
                to: TaskStatus::Cancelled,
            });
        }

        let now = Utc::now();
        task_assignment::Entity::update_many()
            .col_expr(
                task_assignment::Column::Status,
                Expr::value(AssignmentStatus::Unassigned),
            )
            .col_expr(
                task_assignment::Column::UnassignedAt,
                Expr::value(Some(sea_orm::prelude::DateTimeUtc::from(now))),
            )
            .col_expr(
                task_assignment::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(now)),
            )
            .filter(task_assignment::Column::TaskId.eq(record.id))
            .filter(
                task_assignment::Column::Status
                    .is_in([AssignmentStatus::Assigned, AssignmentStatus::Accepted]),
            )
            .exec(db)
            .await?;

        let updated = task::Entity::find_by_id(record.id)
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn update_priority<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        priority: TaskPriority,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.priority = Set(priority);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        area::{Area, CreateArea},
        enterprise::{CreateEnterprise, Enterprise},
        user::{CreateUser, User},
        waste_report::{CreateWasteReport, WasteReport},
        waste_type::{CreateWasteType, WasteType},
    };
    use crate::types::UserRole;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    pub(crate) async fn seed_report(db: &sea_orm::DatabaseConnection) -> (WasteReport, Enterprise) {
        let reporter = User::create(
            db,
            &CreateUser {
                email: "reporter@example.org".to_string(),
                display_name: "Reporter".to_string(),
                role: Some(UserRole::Citizen),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let area = Area::create(
            db,
            &CreateArea {
                name: "East side".to_string(),
                district: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let waste_type = WasteType::create(
            db,
            &CreateWasteType {
                name: "Plastic".to_string(),
                hazardous: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let enterprise = Enterprise::create(
            db,
            &CreateEnterprise {
                name: "City Haulers".to_string(),
                contact_email: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let report = WasteReport::create(
            db,
            &CreateWasteReport {
                reporter_id: reporter.id,
                area_id: area.id,
                waste_type_id: waste_type.id,
                description: Some("Overflowing bins".to_string()),
                estimated_weight_kg: Some(12.5),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        (report, enterprise)
    }

    #[tokio::test]
    async fn scheduling_a_report_creates_a_pending_task() {
        let db = setup_db().await;
        let (report, enterprise) = seed_report(&db).await;

        let task = Task::create_from_report(
            &db,
            &CreateTask {
                report_id: report.id,
                enterprise_id: enterprise.id,
                priority: None,
                scheduled_date: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.area_id, report.area_id);

        let reloaded = WasteReport::find_by_id(&db, report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, ReportStatus::Scheduled);

        // The report moved off SUBMITTED, so it cannot be scheduled twice.
        let err = Task::create_from_report(
            &db,
            &CreateTask {
                report_id: report.id,
                enterprise_id: enterprise.id,
                priority: None,
                scheduled_date: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::InvalidReportState(_)));
    }

    #[tokio::test]
    async fn status_transitions_follow_the_lifecycle() {
        let db = setup_db().await;
        let (report, enterprise) = seed_report(&db).await;
        let task = Task::create_from_report(
            &db,
            &CreateTask {
                report_id: report.id,
                enterprise_id: enterprise.id,
                priority: Some(TaskPriority::High),
                scheduled_date: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        // Pending tasks cannot jump straight to completed.
        let err = Task::update_status(&db, task.id, TaskStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));

        let cancelled = Task::update_status(&db, task.id, TaskStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        // Terminal states stay terminal.
        let err = Task::update_status(&db, task.id, TaskStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }
}

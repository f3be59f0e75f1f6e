use std::collections::HashMap;

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
    entities::{collection_visit, evidence_photo, task, visit_waste_item},
    models::{
        capability::{Capability, CapabilityError},
        ids,
        task::Task,
        task_assignment::TaskAssignment,
        waste_report::WasteReport,
    },
    types::{ReportStatus, SortingLevel, TaskStatus, VisitStatus},
};

#[derive(Debug, Error)]
pub enum VisitError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Visit not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Waste type not found")]
    WasteTypeNotFound,
    #[error("Task is not open for a visit (status: {0})")]
    TaskNotAssignable(TaskStatus),
    #[error("Collector does not hold the task's active assignment")]
    CollectorMismatch,
    #[error("Task already has an open visit")]
    OpenVisitExists,
    #[error("Visit is already completed")]
    VisitClosed,
    #[error("Visit is still open")]
    VisitOpen,
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionVisit {
    pub id: Uuid,
    pub task_id: Uuid,
    pub collector_id: Uuid,
    pub visited_at: DateTime<Utc>,
    pub visit_status: VisitStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub needs_reconciliation: bool,
    pub rating: Option<i32>,
    pub rating_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartVisit {
    pub task_id: Uuid,
    pub collector_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitWasteItem {
    pub id: Uuid,
    pub waste_type_id: Uuid,
    pub weight_kg: f64,
    pub sorting_level: SortingLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddWasteItem {
    pub waste_type_id: Uuid,
    pub weight_kg: f64,
    pub sorting_level: Option<SortingLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePhoto {
    pub id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPhoto {
    pub url: String,
    pub caption: Option<String>,
}

impl CollectionVisit {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: collection_visit::Model,
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
            visited_at: model.visited_at.into(),
            visit_status: model.visit_status,
            completed_at: model.completed_at.map(Into::into),
            needs_reconciliation: model.needs_reconciliation,
            rating: model.rating,
            rating_comment: model.rating_comment,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = collection_visit::Entity::find()
            .filter(collection_visit::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Visits whose weights could not be reserved against the capability
    /// ledger at completion time.
    pub async fn find_needing_reconciliation<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<Self>, DbErr> {
        let models = collection_visit::Entity::find()
            .filter(collection_visit::Column::NeedsReconciliation.eq(true))
            .order_by_asc(collection_visit::Column::CompletedAt)
            .all(db)
            .await?;

        let mut visits = Vec::with_capacity(models.len());
        for model in models {
            visits.push(Self::from_model(db, model).await?);
        }
        Ok(visits)
    }

    /// Open a visit for a task the calling collector is actively working on.
    pub async fn start<C: ConnectionTrait>(
        db: &C,
        data: &StartVisit,
        visit_id: Uuid,
    ) -> Result<Self, VisitError> {
        let task_record = task::Entity::find()
            .filter(task::Column::Uuid.eq(data.task_id))
            .one(db)
            .await?
            .ok_or(VisitError::TaskNotFound)?;

        if task_record.status != TaskStatus::InProgress {
            return Err(VisitError::TaskNotAssignable(task_record.status));
        }

        let assignment = TaskAssignment::find_active_by_task_row_id(db, task_record.id)
            .await?
            .ok_or(VisitError::TaskNotAssignable(TaskStatus::InProgress))?;
        let collector_row_id = ids::user_id_by_uuid(db, data.collector_id)
            .await?
            .ok_or(VisitError::CollectorMismatch)?;
        if assignment.collector_id != collector_row_id {
            return Err(VisitError::CollectorMismatch);
        }

        let open_visit = collection_visit::Entity::find()
            .filter(collection_visit::Column::TaskId.eq(task_record.id))
            .filter(collection_visit::Column::CompletedAt.is_null())
            .one(db)
            .await?;
        if open_visit.is_some() {
            return Err(VisitError::OpenVisitExists);
        }

        let now = Utc::now();
        let active = collection_visit::ActiveModel {
            uuid: Set(visit_id),
            task_id: Set(task_record.id),
            collector_id: Set(collector_row_id),
            visited_at: Set(now.into()),
            visit_status: Set(VisitStatus::Visited),
            completed_at: Set(None),
            needs_reconciliation: Set(false),
            rating: Set(None),
            rating_comment: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    async fn open_visit_row<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<collection_visit::Model, VisitError> {
        let record = collection_visit::Entity::find()
            .filter(collection_visit::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(VisitError::NotFound)?;
        if record.completed_at.is_some() {
            return Err(VisitError::VisitClosed);
        }
        Ok(record)
    }

    pub async fn add_waste_item<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &AddWasteItem,
        item_id: Uuid,
    ) -> Result<VisitWasteItem, VisitError> {
        if !data.weight_kg.is_finite() || data.weight_kg <= 0.0 {
            return Err(VisitError::ValidationError(
                "Weight must be a positive number of kilograms".to_string(),
            ));
        }

        let visit = Self::open_visit_row(db, id).await?;
        let waste_type_row_id = ids::waste_type_id_by_uuid(db, data.waste_type_id)
            .await?
            .ok_or(VisitError::WasteTypeNotFound)?;

        let now = Utc::now();
        let active = visit_waste_item::ActiveModel {
            uuid: Set(item_id),
            visit_id: Set(visit.id),
            waste_type_id: Set(waste_type_row_id),
            weight_kg: Set(data.weight_kg),
            sorting_level: Set(data.sorting_level.clone().unwrap_or_default()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Ok(VisitWasteItem {
            id: model.uuid,
            waste_type_id: data.waste_type_id,
            weight_kg: model.weight_kg,
            sorting_level: model.sorting_level,
            created_at: model.created_at.into(),
        })
    }

    pub async fn add_photo<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &AddPhoto,
        photo_id: Uuid,
    ) -> Result<EvidencePhoto, VisitError> {
        if data.url.trim().is_empty() {
            return Err(VisitError::ValidationError(
                "Photo url must not be empty".to_string(),
            ));
        }

        let visit = Self::open_visit_row(db, id).await?;

        let now = Utc::now();
        let active = evidence_photo::ActiveModel {
            uuid: Set(photo_id),
            visit_id: Set(visit.id),
            url: Set(data.url.clone()),
            caption: Set(data.caption.clone()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Ok(EvidencePhoto {
            id: model.uuid,
            url: model.url,
            caption: model.caption,
            created_at: model.created_at.into(),
        })
    }

    pub async fn list_waste_items<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Vec<VisitWasteItem>, VisitError> {
        let visit_row_id = ids::collection_visit_id_by_uuid(db, id)
            .await?
            .ok_or(VisitError::NotFound)?;

        let models = visit_waste_item::Entity::find()
            .filter(visit_waste_item::Column::VisitId.eq(visit_row_id))
            .order_by_asc(visit_waste_item::Column::CreatedAt)
            .all(db)
            .await?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            let waste_type_id = ids::waste_type_uuid_by_id(db, model.waste_type_id)
                .await?
                .ok_or(VisitError::WasteTypeNotFound)?;
            items.push(VisitWasteItem {
                id: model.uuid,
                waste_type_id,
                weight_kg: model.weight_kg,
                sorting_level: model.sorting_level,
                created_at: model.created_at.into(),
            });
        }
        Ok(items)
    }

    pub async fn list_photos<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Vec<EvidencePhoto>, VisitError> {
        let visit_row_id = ids::collection_visit_id_by_uuid(db, id)
            .await?
            .ok_or(VisitError::NotFound)?;

        let models = evidence_photo::Entity::find()
            .filter(evidence_photo::Column::VisitId.eq(visit_row_id))
            .order_by_asc(evidence_photo::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(models
            .into_iter()
            .map(|model| EvidencePhoto {
                id: model.uuid,
                url: model.url,
                caption: model.caption,
                created_at: model.created_at.into(),
            })
            .collect())
    }

    /// Close the visit and settle its consequences: the task and its
    /// assignment complete, the report resolves, and the weighed items are
    /// reserved against the enterprise's capability ledger. The close itself
    /// is a guarded update on `completed_at`, so only one caller wins.
    ///
    /// A reservation that no longer fits does not fail the call. The pickup
    /// already happened; the visit is flagged for reconciliation instead.
    /// The same applies when the task left `InProgress` while the visit was
    /// open: its state and the report's are left alone and the visit is
    /// flagged.
    pub async fn complete<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        outcome: VisitStatus,
    ) -> Result<Self, VisitError> {
        let now = Utc::now();
        let result = collection_visit::Entity::update_many()
            .col_expr(
                collection_visit::Column::CompletedAt,
                Expr::value(Some(sea_orm::prelude::DateTimeUtc::from(now))),
            )
            .col_expr(
                collection_visit::Column::VisitStatus,
                Expr::value(outcome.clone()),
            )
            .col_expr(
                collection_visit::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(now)),
            )
            .filter(collection_visit::Column::Uuid.eq(id))
            .filter(collection_visit::Column::CompletedAt.is_null())
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            let exists = collection_visit::Entity::find()
                .filter(collection_visit::Column::Uuid.eq(id))
                .one(db)
                .await?;
            return Err(match exists {
                Some(_) => VisitError::VisitClosed,
                None => VisitError::NotFound,
            });
        }

        let visit = collection_visit::Entity::find()
            .filter(collection_visit::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(VisitError::NotFound)?;
        let task_record = task::Entity::find_by_id(visit.task_id)
            .one(db)
            .await?
            .ok_or(VisitError::TaskNotFound)?;

        // The task and report only settle when the task was still in
        // progress; a task that left that state while the visit was open
        // keeps its state and the visit goes to the reconciliation queue.
        let task_settled = Task::transition_by_row_id(
            db,
            task_record.id,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        )
        .await?;
        let mut reconcile = false;
        if task_settled {
            TaskAssignment::complete_by_task_row_id(db, task_record.id).await?;
            WasteReport::update_status_by_row_id(db, task_record.report_id, ReportStatus::Resolved)
                .await?;
        } else {
            tracing::warn!(
                visit_id = %id,
                task_status = %task_record.status,
                "visit completed for a task that is no longer in progress, flagging for reconciliation"
            );
            reconcile = true;
        }

        let items = visit_waste_item::Entity::find()
            .filter(visit_waste_item::Column::VisitId.eq(visit.id))
            .all(db)
            .await?;
        let mut totals: HashMap<i64, f64> = HashMap::new();
        for item in &items {
            *totals.entry(item.waste_type_id).or_insert(0.0) += item.weight_kg;
        }

        for (waste_type_row_id, kg) in totals {
            match Capability::reserve_for(
                db,
                task_record.enterprise_id,
                task_record.area_id,
                waste_type_row_id,
                kg,
            )
            .await
            {
                Ok(()) => {}
                Err(CapabilityError::Database(err)) => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(
                        visit_id = %id,
                        weight_kg = kg,
                        "could not reserve collected weight, flagging for reconciliation: {err}"
                    );
                    reconcile = true;
                }
            }
        }

        if reconcile {
            collection_visit::Entity::update_many()
                .col_expr(
                    collection_visit::Column::NeedsReconciliation,
                    Expr::value(true),
                )
                .col_expr(
                    collection_visit::Column::UpdatedAt,
                    Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
                )
                .filter(collection_visit::Column::Id.eq(visit.id))
                .exec(db)
                .await?;
        }

        let reloaded = collection_visit::Entity::find_by_id(visit.id)
            .one(db)
            .await?
            .ok_or(VisitError::NotFound)?;
        Ok(Self::from_model(db, reloaded).await?)
    }

    /// Citizen feedback on a closed visit. The rating is the only field that
    /// stays mutable after completion.
    pub async fn rate<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Self, VisitError> {
        if !(1..=5).contains(&rating) {
            return Err(VisitError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let record = collection_visit::Entity::find()
            .filter(collection_visit::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(VisitError::NotFound)?;
        if record.completed_at.is_none() {
            return Err(VisitError::VisitOpen);
        }

        let mut active: collection_visit::ActiveModel = record.into();
        active.rating = Set(Some(rating));
        active.rating_comment = Set(comment);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        area::{Area, CreateArea},
        capability::CreateCapability,
        enterprise::{CreateEnterprise, Enterprise},
        task::{CreateTask, Task},
        user::{CreateUser, User},
        waste_report::{CreateWasteReport, WasteReport},
        waste_type::{CreateWasteType, WasteType},
    };
    use crate::types::{AssignmentStatus, UserRole};

    use super::*;

    struct Fixture {
        db: sea_orm::DatabaseConnection,
        task: Task,
        collector: User,
        waste_type: WasteType,
        capability: Capability,
    }

    async fn setup(daily_capacity_kg: f64) -> Fixture {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let reporter = User::create(
            &db,
            &CreateUser {
                email: "citizen@example.org".to_string(),
                display_name: "Citizen".to_string(),
                role: Some(UserRole::Citizen),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let collector = User::create(
            &db,
            &CreateUser {
                email: "collector@example.org".to_string(),
                display_name: "Collector".to_string(),
                role: Some(UserRole::Collector),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let area = Area::create(
            &db,
            &CreateArea {
                name: "Harbor".to_string(),
                district: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let waste_type = WasteType::create(
            &db,
            &CreateWasteType {
                name: "Glass".to_string(),
                hazardous: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let enterprise = Enterprise::create(
            &db,
            &CreateEnterprise {
                name: "Harbor Recycling".to_string(),
                contact_email: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let capability = Capability::create(
            &db,
            &CreateCapability {
                enterprise_id: enterprise.id,
                area_id: area.id,
                waste_type_id: waste_type.id,
                daily_capacity_kg,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let report = WasteReport::create(
            &db,
            &CreateWasteReport {
                reporter_id: reporter.id,
                area_id: area.id,
                waste_type_id: waste_type.id,
                description: None,
                estimated_weight_kg: Some(20.0),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
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

        Fixture {
            db,
            task,
            collector,
            waste_type,
            capability,
        }
    }

    async fn assign_and_accept(fixture: &Fixture) -> TaskAssignment {
        let assignment = TaskAssignment::assign(
            &fixture.db,
            fixture.task.id,
            fixture.collector.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        TaskAssignment::accept(&fixture.db, assignment.id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn visit_cannot_start_before_work_begins() {
        let fixture = setup(100.0).await;

        let err = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VisitError::TaskNotAssignable(_)));
    }

    #[tokio::test]
    async fn completing_a_visit_settles_task_assignment_report_and_ledger() {
        let fixture = setup(100.0).await;
        let assignment = assign_and_accept(&fixture).await;

        let visit = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        CollectionVisit::add_waste_item(
            &fixture.db,
            visit.id,
            &AddWasteItem {
                waste_type_id: fixture.waste_type.id,
                weight_kg: 18.0,
                sorting_level: Some(SortingLevel::Good),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        CollectionVisit::add_photo(
            &fixture.db,
            visit.id,
            &AddPhoto {
                url: "https://photos.example.org/1.jpg".to_string(),
                caption: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let completed = CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap();
        assert!(completed.completed_at.is_some());
        assert!(!completed.needs_reconciliation);

        let task = Task::find_by_id(&fixture.db, fixture.task.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let assignment = TaskAssignment::find_by_id(&fixture.db, assignment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Completed);
        let report = WasteReport::find_by_id(&fixture.db, task.report_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);

        let capability = Capability::find_by_id(&fixture.db, fixture.capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capability.used_capacity_kg, 18.0);
    }

    #[tokio::test]
    async fn a_visit_closes_exactly_once() {
        let fixture = setup(100.0).await;
        assign_and_accept(&fixture).await;
        let visit = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap();

        let err = CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::VisitClosed));

        // Item and photo mutation is frozen too.
        let err = CollectionVisit::add_waste_item(
            &fixture.db,
            visit.id,
            &AddWasteItem {
                waste_type_id: fixture.waste_type.id,
                weight_kg: 1.0,
                sorting_level: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VisitError::VisitClosed));
    }

    #[tokio::test]
    async fn overweight_completion_is_flagged_for_reconciliation() {
        let fixture = setup(10.0).await;
        assign_and_accept(&fixture).await;
        let visit = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        CollectionVisit::add_waste_item(
            &fixture.db,
            visit.id,
            &AddWasteItem {
                waste_type_id: fixture.waste_type.id,
                weight_kg: 25.0,
                sorting_level: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let completed = CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap();
        assert!(completed.needs_reconciliation);

        let queue = CollectionVisit::find_needing_reconciliation(&fixture.db)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, visit.id);

        // The ledger itself never overshoots.
        let capability = Capability::find_by_id(&fixture.db, fixture.capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capability.used_capacity_kg, 0.0);
    }

    #[tokio::test]
    async fn completing_after_cancel_leaves_task_and_report_alone() {
        let fixture = setup(100.0).await;
        assign_and_accept(&fixture).await;
        let visit = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        CollectionVisit::add_waste_item(
            &fixture.db,
            visit.id,
            &AddWasteItem {
                waste_type_id: fixture.waste_type.id,
                weight_kg: 12.0,
                sorting_level: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        Task::cancel(&fixture.db, fixture.task.id).await.unwrap();

        let completed = CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap();
        assert!(completed.completed_at.is_some());
        assert!(completed.needs_reconciliation);

        let task = Task::find_by_id(&fixture.db, fixture.task.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        let report = WasteReport::find_by_id(&fixture.db, task.report_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.status, ReportStatus::Scheduled);

        // The collected weight still lands on the ledger.
        let capability = Capability::find_by_id(&fixture.db, fixture.capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capability.used_capacity_kg, 12.0);

        let queue = CollectionVisit::find_needing_reconciliation(&fixture.db)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, visit.id);
    }

    #[tokio::test]
    async fn rating_is_allowed_only_after_close() {
        let fixture = setup(100.0).await;
        assign_and_accept(&fixture).await;
        let visit = CollectionVisit::start(
            &fixture.db,
            &StartVisit {
                task_id: fixture.task.id,
                collector_id: fixture.collector.id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let err = CollectionVisit::rate(&fixture.db, visit.id, 4, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::VisitOpen));

        CollectionVisit::complete(&fixture.db, visit.id, VisitStatus::Visited)
            .await
            .unwrap();

        let err = CollectionVisit::rate(&fixture.db, visit.id, 6, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::ValidationError(_)));

        let rated = CollectionVisit::rate(
            &fixture.db,
            visit.id,
            5,
            Some("Spotless".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(rated.rating, Some(5));
        assert_eq!(rated.rating_comment.as_deref(), Some("Spotless"));
    }
}

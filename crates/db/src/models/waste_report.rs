use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::waste_report, models::ids, types::ReportStatus};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Waste report not found")]
    NotFound,
    #[error("Reporter not found")]
    ReporterNotFound,
    #[error("Area not found")]
    AreaNotFound,
    #[error("Waste type not found")]
    WasteTypeNotFound,
    #[error("Report is not in a state that permits this operation: {0}")]
    InvalidState(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub area_id: Uuid,
    pub waste_type_id: Uuid,
    pub description: Option<String>,
    pub estimated_weight_kg: Option<f64>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWasteReport {
    pub reporter_id: Uuid,
    pub area_id: Uuid,
    pub waste_type_id: Uuid,
    pub description: Option<String>,
    pub estimated_weight_kg: Option<f64>,
}

impl WasteReport {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: waste_report::Model,
    ) -> Result<Self, DbErr> {
        let reporter_id = ids::user_uuid_by_id(db, model.reporter_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Reporter not found".to_string()))?;
        let area_id = ids::area_uuid_by_id(db, model.area_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Area not found".to_string()))?;
        let waste_type_id = ids::waste_type_uuid_by_id(db, model.waste_type_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Waste type not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            reporter_id,
            area_id,
            waste_type_id,
            description: model.description,
            estimated_weight_kg: model.estimated_weight_kg,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = waste_report::Entity::find()
            .filter(waste_report::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = waste_report::Entity::find();
        if let Some(status) = status {
            query = query.filter(waste_report::Column::Status.eq(status));
        }
        let models = query
            .order_by_desc(waste_report::Column::CreatedAt)
            .all(db)
            .await?;

        let mut reports = Vec::with_capacity(models.len());
        for model in models {
            reports.push(Self::from_model(db, model).await?);
        }
        Ok(reports)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWasteReport,
        report_id: Uuid,
    ) -> Result<Self, ReportError> {
        if let Some(weight) = data.estimated_weight_kg
            && (!weight.is_finite() || weight < 0.0)
        {
            return Err(ReportError::ValidationError(
                "Estimated weight must be a non-negative number of kilograms".to_string(),
            ));
        }

        let reporter_row_id = ids::user_id_by_uuid(db, data.reporter_id)
            .await?
            .ok_or(ReportError::ReporterNotFound)?;
        let area_row_id = ids::area_id_by_uuid(db, data.area_id)
            .await?
            .ok_or(ReportError::AreaNotFound)?;
        let waste_type_row_id = ids::waste_type_id_by_uuid(db, data.waste_type_id)
            .await?
            .ok_or(ReportError::WasteTypeNotFound)?;

        let now = Utc::now();
        let active = waste_report::ActiveModel {
            uuid: Set(report_id),
            reporter_id: Set(reporter_row_id),
            area_id: Set(area_row_id),
            waste_type_id: Set(waste_type_row_id),
            description: Set(data.description.clone()),
            estimated_weight_kg: Set(data.estimated_weight_kg),
            status: Set(ReportStatus::Submitted),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub(crate) async fn update_status_by_row_id<C: ConnectionTrait>(
        db: &C,
        row_id: i64,
        status: ReportStatus,
    ) -> Result<(), DbErr> {
        let record = waste_report::Entity::find_by_id(row_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Waste report not found".to_string()))?;

        let mut active: waste_report::ActiveModel = record.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    /// Operator rejection of a report that has not yet been scheduled.
    pub async fn reject<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, ReportError> {
        let record = waste_report::Entity::find()
            .filter(waste_report::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ReportError::NotFound)?;

        if record.status != ReportStatus::Submitted {
            return Err(ReportError::InvalidState(format!(
                "Only submitted reports can be rejected (current status: {})",
                record.status
            )));
        }

        let mut active: waste_report::ActiveModel = record.into();
        active.status = Set(ReportStatus::Rejected);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }
}

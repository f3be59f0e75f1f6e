use chrono::{DateTime, Utc};
use sea_orm::sea_query::{CaseStatement, Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::capability,
    models::ids,
    types::CapabilityStatus,
};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Capability not found")]
    NotFound,
    #[error("Enterprise not found")]
    EnterpriseNotFound,
    #[error("Area not found")]
    AreaNotFound,
    #[error("Waste type not found")]
    WasteTypeNotFound,
    #[error("A capability for this enterprise, area and waste type already exists")]
    DuplicateCapability,
    #[error("Capability is inactive")]
    Inactive,
    #[error("Capacity exceeded: requested {requested} kg, {available} kg available")]
    CapacityExceeded { requested: f64, available: f64 },
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: Uuid,
    pub enterprise_id: Uuid,
    pub area_id: Uuid,
    pub waste_type_id: Uuid,
    pub daily_capacity_kg: f64,
    pub used_capacity_kg: f64,
    pub status: CapabilityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCapability {
    pub enterprise_id: Uuid,
    pub area_id: Uuid,
    pub waste_type_id: Uuid,
    pub daily_capacity_kg: f64,
}

fn validate_kg(kg: f64) -> Result<(), CapabilityError> {
    if !kg.is_finite() || kg <= 0.0 {
        return Err(CapabilityError::ValidationError(
            "Weight must be a positive number of kilograms".to_string(),
        ));
    }
    Ok(())
}

impl Capability {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: capability::Model,
    ) -> Result<Self, DbErr> {
        let enterprise_id = ids::enterprise_uuid_by_id(db, model.enterprise_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Enterprise not found".to_string()))?;
        let area_id = ids::area_uuid_by_id(db, model.area_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Area not found".to_string()))?;
        let waste_type_id = ids::waste_type_uuid_by_id(db, model.waste_type_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Waste type not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            enterprise_id,
            area_id,
            waste_type_id,
            daily_capacity_kg: model.daily_capacity_kg,
            used_capacity_kg: model.used_capacity_kg,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = capability::Entity::find()
            .filter(capability::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_enterprise_id<C: ConnectionTrait>(
        db: &C,
        enterprise_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let enterprise_row_id = match ids::enterprise_id_by_uuid(db, enterprise_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = capability::Entity::find()
            .filter(capability::Column::EnterpriseId.eq(enterprise_row_id))
            .order_by_asc(capability::Column::CreatedAt)
            .all(db)
            .await?;

        let mut capabilities = Vec::with_capacity(models.len());
        for model in models {
            capabilities.push(Self::from_model(db, model).await?);
        }
        Ok(capabilities)
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = capability::Entity::find()
            .order_by_asc(capability::Column::CreatedAt)
            .all(db)
            .await?;

        let mut capabilities = Vec::with_capacity(models.len());
        for model in models {
            capabilities.push(Self::from_model(db, model).await?);
        }
        Ok(capabilities)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateCapability,
        capability_id: Uuid,
    ) -> Result<Self, CapabilityError> {
        if !data.daily_capacity_kg.is_finite() || data.daily_capacity_kg <= 0.0 {
            return Err(CapabilityError::ValidationError(
                "Daily capacity must be a positive number of kilograms".to_string(),
            ));
        }

        let enterprise_row_id = ids::enterprise_id_by_uuid(db, data.enterprise_id)
            .await?
            .ok_or(CapabilityError::EnterpriseNotFound)?;
        let area_row_id = ids::area_id_by_uuid(db, data.area_id)
            .await?
            .ok_or(CapabilityError::AreaNotFound)?;
        let waste_type_row_id = ids::waste_type_id_by_uuid(db, data.waste_type_id)
            .await?
            .ok_or(CapabilityError::WasteTypeNotFound)?;

        let existing = capability::Entity::find()
            .filter(capability::Column::EnterpriseId.eq(enterprise_row_id))
            .filter(capability::Column::AreaId.eq(area_row_id))
            .filter(capability::Column::WasteTypeId.eq(waste_type_row_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(CapabilityError::DuplicateCapability);
        }

        let now = Utc::now();
        let active = capability::ActiveModel {
            uuid: Set(capability_id),
            enterprise_id: Set(enterprise_row_id),
            area_id: Set(area_row_id),
            waste_type_id: Set(waste_type_row_id),
            daily_capacity_kg: Set(data.daily_capacity_kg),
            used_capacity_kg: Set(0.0),
            status: Set(CapabilityStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    /// Check-and-reserve against the daily ceiling. Applied as a single
    /// conditional UPDATE so concurrent callers cannot jointly overshoot.
    pub async fn reserve<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        kg: f64,
    ) -> Result<(), CapabilityError> {
        validate_kg(kg)?;

        let result = capability::Entity::update_many()
            .col_expr(
                capability::Column::UsedCapacityKg,
                Expr::col(capability::Column::UsedCapacityKg).add(kg),
            )
            .col_expr(
                capability::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(capability::Column::Uuid.eq(id))
            .filter(capability::Column::Status.eq(CapabilityStatus::Active))
            .filter(
                Expr::col(capability::Column::UsedCapacityKg)
                    .add(kg)
                    .lte(Expr::col(capability::Column::DailyCapacityKg)),
            )
            .exec(db)
            .await?;

        if result.rows_affected > 0 {
            return Ok(());
        }

        // The guarded update matched nothing; re-read to report why.
        let record = capability::Entity::find()
            .filter(capability::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CapabilityError::NotFound)?;
        if record.status != CapabilityStatus::Active {
            return Err(CapabilityError::Inactive);
        }
        Err(CapabilityError::CapacityExceeded {
            requested: kg,
            available: record.daily_capacity_kg - record.used_capacity_kg,
        })
    }

    /// Reserve against the capability identified by its (enterprise, area,
    /// waste type) row ids. Used by visit completion, which works with
    /// resolved rows rather than client-facing uuids.
    pub async fn reserve_for<C: ConnectionTrait>(
        db: &C,
        enterprise_row_id: i64,
        area_row_id: i64,
        waste_type_row_id: i64,
        kg: f64,
    ) -> Result<(), CapabilityError> {
        let capability_uuid: Option<Uuid> = {
            use sea_orm::QuerySelect;
            capability::Entity::find()
                .select_only()
                .column(capability::Column::Uuid)
                .filter(capability::Column::EnterpriseId.eq(enterprise_row_id))
                .filter(capability::Column::AreaId.eq(area_row_id))
                .filter(capability::Column::WasteTypeId.eq(waste_type_row_id))
                .into_tuple()
                .one(db)
                .await?
        };

        let capability_uuid = capability_uuid.ok_or(CapabilityError::NotFound)?;
        Self::reserve(db, capability_uuid, kg).await
    }

    /// Return reserved kilograms to the ledger, floored at zero.
    pub async fn release<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        kg: f64,
    ) -> Result<(), CapabilityError> {
        validate_kg(kg)?;

        let floored = CaseStatement::new()
            .case(
                Expr::col(capability::Column::UsedCapacityKg).sub(kg).lt(0.0),
                Expr::value(0.0),
            )
            .finally(Expr::col(capability::Column::UsedCapacityKg).sub(kg));

        let result = capability::Entity::update_many()
            .col_expr(capability::Column::UsedCapacityKg, floored.into())
            .col_expr(
                capability::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(capability::Column::Uuid.eq(id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CapabilityError::NotFound);
        }
        Ok(())
    }

    /// Zero every active ledger's used-capacity counter. One bulk update, so
    /// a failed run leaves no partially reset mix, and re-running on the same
    /// day is a no-op in effect.
    pub async fn daily_reset<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let result = capability::Entity::update_many()
            .col_expr(capability::Column::UsedCapacityKg, Expr::value(0.0))
            .col_expr(
                capability::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(capability::Column::Status.eq(CapabilityStatus::Active))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn update_daily_capacity<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        daily_capacity_kg: f64,
    ) -> Result<Self, CapabilityError> {
        if !daily_capacity_kg.is_finite() || daily_capacity_kg <= 0.0 {
            return Err(CapabilityError::ValidationError(
                "Daily capacity must be a positive number of kilograms".to_string(),
            ));
        }

        // Guard against lowering the ceiling below what is already used.
        let result = capability::Entity::update_many()
            .col_expr(
                capability::Column::DailyCapacityKg,
                Expr::value(daily_capacity_kg),
            )
            .col_expr(
                capability::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeUtc::from(Utc::now())),
            )
            .filter(capability::Column::Uuid.eq(id))
            .filter(Expr::col(capability::Column::UsedCapacityKg).lte(daily_capacity_kg))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            let record = capability::Entity::find()
                .filter(capability::Column::Uuid.eq(id))
                .one(db)
                .await?
                .ok_or(CapabilityError::NotFound)?;
            return Err(CapabilityError::ValidationError(format!(
                "Daily capacity {} kg is below current usage of {} kg",
                daily_capacity_kg, record.used_capacity_kg
            )));
        }

        let record = capability::Entity::find()
            .filter(capability::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CapabilityError::NotFound)?;
        Ok(Self::from_model(db, record).await?)
    }

    pub async fn set_status<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        status: CapabilityStatus,
    ) -> Result<Self, CapabilityError> {
        let record = capability::Entity::find()
            .filter(capability::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CapabilityError::NotFound)?;

        let mut active: capability::ActiveModel = record.into();
        active.status = Set(status);
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
        enterprise::{CreateEnterprise, Enterprise},
        waste_type::{CreateWasteType, WasteType},
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_capability(
        db: &sea_orm::DatabaseConnection,
        daily_capacity_kg: f64,
    ) -> Capability {
        let enterprise = Enterprise::create(
            db,
            &CreateEnterprise {
                name: "Green Hauling".to_string(),
                contact_email: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let area = Area::create(
            db,
            &CreateArea {
                name: "North district".to_string(),
                district: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let waste_type = WasteType::create(
            db,
            &CreateWasteType {
                name: "Organic".to_string(),
                hazardous: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        Capability::create(
            db,
            &CreateCapability {
                enterprise_id: enterprise.id,
                area_id: area.id,
                waste_type_id: waste_type.id,
                daily_capacity_kg,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn reserve_rejects_overflow_and_fills_to_ceiling() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 100.0).await;

        Capability::reserve(&db, capability.id, 90.0).await.unwrap();

        let err = Capability::reserve(&db, capability.id, 15.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::CapacityExceeded { .. }));

        Capability::reserve(&db, capability.id, 10.0).await.unwrap();

        let reloaded = Capability::find_by_id(&db, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 100.0);
    }

    #[tokio::test]
    async fn release_floors_at_zero() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 50.0).await;

        Capability::reserve(&db, capability.id, 20.0).await.unwrap();
        Capability::release(&db, capability.id, 35.0).await.unwrap();

        let reloaded = Capability::find_by_id(&db, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 0.0);
    }

    #[tokio::test]
    async fn daily_reset_is_idempotent() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 80.0).await;
        Capability::reserve(&db, capability.id, 42.0).await.unwrap();

        let reset_rows = Capability::daily_reset(&db).await.unwrap();
        assert_eq!(reset_rows, 1);
        let reloaded = Capability::find_by_id(&db, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 0.0);

        Capability::daily_reset(&db).await.unwrap();
        let reloaded = Capability::find_by_id(&db, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 0.0);
    }

    #[tokio::test]
    async fn inactive_capability_rejects_reservations() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 100.0).await;

        Capability::set_status(&db, capability.id, CapabilityStatus::Inactive)
            .await
            .unwrap();

        let err = Capability::reserve(&db, capability.id, 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Inactive));
    }

    #[tokio::test]
    async fn duplicate_triple_is_rejected() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 100.0).await;

        let err = Capability::create(
            &db,
            &CreateCapability {
                enterprise_id: capability.enterprise_id,
                area_id: capability.area_id,
                waste_type_id: capability.waste_type_id,
                daily_capacity_kg: 10.0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CapabilityError::DuplicateCapability));
    }

    #[tokio::test]
    async fn ceiling_cannot_drop_below_usage() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 100.0).await;
        Capability::reserve(&db, capability.id, 60.0).await.unwrap();

        let err = Capability::update_daily_capacity(&db, capability.id, 50.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::ValidationError(_)));

        let updated = Capability::update_daily_capacity(&db, capability.id, 120.0)
            .await
            .unwrap();
        assert_eq!(updated.daily_capacity_kg, 120.0);
    }

    #[tokio::test]
    async fn concurrent_reservations_never_overshoot() {
        let db = setup_db().await;
        let capability = seed_capability(&db, 100.0).await;

        let mut join_set = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let db = db.clone();
            let id = capability.id;
            join_set.spawn(async move { Capability::reserve(&db, id, 30.0).await });
        }

        let mut successes = 0;
        let mut exceeded = 0;
        while let Some(result) = join_set.join_next().await {
            match result.unwrap() {
                Ok(()) => successes += 1,
                Err(CapabilityError::CapacityExceeded { .. }) => exceeded += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // 3 x 30 kg fit under the 100 kg ceiling; the fourth must fail.
        assert_eq!(successes, 3);
        assert_eq!(exceeded, 7);

        let reloaded = Capability::find_by_id(&db, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 90.0);
        assert!(reloaded.used_capacity_kg <= reloaded.daily_capacity_kg);
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::waste_type;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteType {
    pub id: Uuid,
    pub name: String,
    pub hazardous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWasteType {
    pub name: String,
    #[serde(default)]
    pub hazardous: bool,
}

impl WasteType {
    fn from_model(model: waste_type::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            hazardous: model.hazardous,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = waste_type::Entity::find()
            .filter(waste_type::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = waste_type::Entity::find()
            .order_by_asc(waste_type::Column::Name)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWasteType,
        waste_type_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = waste_type::ActiveModel {
            uuid: Set(waste_type_id),
            name: Set(data.name.clone()),
            hazardous: Set(data.hazardous),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }
}

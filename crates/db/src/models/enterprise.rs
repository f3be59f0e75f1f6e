use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::enterprise;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enterprise {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnterprise {
    pub name: String,
    pub contact_email: Option<String>,
}

impl Enterprise {
    fn from_model(model: enterprise::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            contact_email: model.contact_email,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = enterprise::Entity::find()
            .filter(enterprise::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = enterprise::Entity::find()
            .order_by_asc(enterprise::Column::Name)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateEnterprise,
        enterprise_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = enterprise::ActiveModel {
            uuid: Set(enterprise_id),
            name: Set(data.name.clone()),
            contact_email: Set(data.contact_email.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }
}

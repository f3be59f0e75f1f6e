use sea_orm::entity::prelude::*;

use crate::types::CapabilityStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "capabilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub enterprise_id: i64,
    pub area_id: i64,
    pub waste_type_id: i64,
    pub daily_capacity_kg: f64,
    pub used_capacity_kg: f64,
    pub status: CapabilityStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

use crate::types::ReportStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "waste_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub reporter_id: i64,
    pub area_id: i64,
    pub waste_type_id: i64,
    pub description: Option<String>,
    pub estimated_weight_kg: Option<f64>,
    pub status: ReportStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{
    area, capability, collection_visit, enterprise, task, task_assignment, user, waste_report,
    waste_type,
};

pub async fn user_id_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn enterprise_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    enterprise::Entity::find()
        .select_only()
        .column(enterprise::Column::Id)
        .filter(enterprise::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn enterprise_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    enterprise::Entity::find()
        .select_only()
        .column(enterprise::Column::Uuid)
        .filter(enterprise::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn area_id_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<i64>, DbErr> {
    area::Entity::find()
        .select_only()
        .column(area::Column::Id)
        .filter(area::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn area_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    area::Entity::find()
        .select_only()
        .column(area::Column::Uuid)
        .filter(area::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn waste_type_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    waste_type::Entity::find()
        .select_only()
        .column(waste_type::Column::Id)
        .filter(waste_type::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn waste_type_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    waste_type::Entity::find()
        .select_only()
        .column(waste_type::Column::Uuid)
        .filter(waste_type::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn waste_report_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    waste_report::Entity::find()
        .select_only()
        .column(waste_report::Column::Id)
        .filter(waste_report::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn waste_report_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    waste_report::Entity::find()
        .select_only()
        .column(waste_report::Column::Uuid)
        .filter(waste_report::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn capability_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    capability::Entity::find()
        .select_only()
        .column(capability::Column::Id)
        .filter(capability::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn capability_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    capability::Entity::find()
        .select_only()
        .column(capability::Column::Uuid)
        .filter(capability::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Uuid)
        .filter(task::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_assignment_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    task_assignment::Entity::find()
        .select_only()
        .column(task_assignment::Column::Uuid)
        .filter(task_assignment::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn collection_visit_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    collection_visit::Entity::find()
        .select_only()
        .column(collection_visit::Column::Id)
        .filter(collection_visit::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn collection_visit_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    collection_visit::Entity::find()
        .select_only()
        .column(collection_visit::Column::Uuid)
        .filter(collection_visit::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

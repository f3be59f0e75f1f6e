use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("citizen")),
                    )
                    .col(
                        ColumnDef::new(Users::AccountStatus)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("active")),
                    )
                    .col(ColumnDef::new(Users::DeleteScheduledAt).timestamp())
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_account_status")
                    .table(Users::Table)
                    .col(Users::AccountStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Enterprises::Table)
                    .col(pk_id_col(manager, Enterprises::Id))
                    .col(uuid_col(Enterprises::Uuid))
                    .col(ColumnDef::new(Enterprises::Name).string().not_null())
                    .col(ColumnDef::new(Enterprises::ContactEmail).string())
                    .col(timestamp_col(Enterprises::CreatedAt))
                    .col(timestamp_col(Enterprises::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_enterprises_uuid")
                    .table(Enterprises::Table)
                    .col(Enterprises::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Areas::Table)
                    .col(pk_id_col(manager, Areas::Id))
                    .col(uuid_col(Areas::Uuid))
                    .col(ColumnDef::new(Areas::Name).string().not_null())
                    .col(ColumnDef::new(Areas::District).string())
                    .col(timestamp_col(Areas::CreatedAt))
                    .col(timestamp_col(Areas::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_areas_uuid")
                    .table(Areas::Table)
                    .col(Areas::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WasteTypes::Table)
                    .col(pk_id_col(manager, WasteTypes::Id))
                    .col(uuid_col(WasteTypes::Uuid))
                    .col(ColumnDef::new(WasteTypes::Name).string().not_null())
                    .col(
                        ColumnDef::new(WasteTypes::Hazardous)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(WasteTypes::CreatedAt))
                    .col(timestamp_col(WasteTypes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_waste_types_uuid")
                    .table(WasteTypes::Table)
                    .col(WasteTypes::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WasteReports::Table)
                    .col(pk_id_col(manager, WasteReports::Id))
                    .col(uuid_col(WasteReports::Uuid))
                    .col(fk_id_col(manager, WasteReports::ReporterId))
                    .col(fk_id_col(manager, WasteReports::AreaId))
                    .col(fk_id_col(manager, WasteReports::WasteTypeId))
                    .col(ColumnDef::new(WasteReports::Description).text())
                    .col(ColumnDef::new(WasteReports::EstimatedWeightKg).double())
                    .col(
                        ColumnDef::new(WasteReports::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("submitted")),
                    )
                    .col(timestamp_col(WasteReports::CreatedAt))
                    .col(timestamp_col(WasteReports::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_waste_reports_uuid")
                    .table(WasteReports::Table)
                    .col(WasteReports::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_waste_reports_status")
                    .table(WasteReports::Table)
                    .col(WasteReports::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Capabilities::Table)
                    .col(pk_id_col(manager, Capabilities::Id))
                    .col(uuid_col(Capabilities::Uuid))
                    .col(fk_id_col(manager, Capabilities::EnterpriseId))
                    .col(fk_id_col(manager, Capabilities::AreaId))
                    .col(fk_id_col(manager, Capabilities::WasteTypeId))
                    .col(
                        ColumnDef::new(Capabilities::DailyCapacityKg)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Capabilities::UsedCapacityKg)
                            .double()
                            .not_null()
                            .default(Expr::val(0.0)),
                    )
                    .col(
                        ColumnDef::new(Capabilities::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("active")),
                    )
                    .col(timestamp_col(Capabilities::CreatedAt))
                    .col(timestamp_col(Capabilities::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_capabilities_uuid")
                    .table(Capabilities::Table)
                    .col(Capabilities::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_capabilities_enterprise_area_waste_type")
                    .table(Capabilities::Table)
                    .col(Capabilities::EnterpriseId)
                    .col(Capabilities::AreaId)
                    .col(Capabilities::WasteTypeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ReportId))
                    .col(fk_id_col(manager, Tasks::EnterpriseId))
                    .col(fk_id_col(manager, Tasks::AreaId))
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("pending")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Tasks::ScheduledDate).timestamp())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_status")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_report_id")
                    .table(Tasks::Table)
                    .col(Tasks::ReportId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskAssignments::Table)
                    .col(pk_id_col(manager, TaskAssignments::Id))
                    .col(uuid_col(TaskAssignments::Uuid))
                    .col(fk_id_col(manager, TaskAssignments::TaskId))
                    .col(fk_id_col(manager, TaskAssignments::CollectorId))
                    .col(
                        ColumnDef::new(TaskAssignments::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("assigned")),
                    )
                    .col(ColumnDef::new(TaskAssignments::AcceptedAt).timestamp())
                    .col(ColumnDef::new(TaskAssignments::UnassignedAt).timestamp())
                    .col(timestamp_col(TaskAssignments::CreatedAt))
                    .col(timestamp_col(TaskAssignments::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_assignments_uuid")
                    .table(TaskAssignments::Table)
                    .col(TaskAssignments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_assignments_task_id")
                    .table(TaskAssignments::Table)
                    .col(TaskAssignments::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(CollectionVisits::Table)
                    .col(pk_id_col(manager, CollectionVisits::Id))
                    .col(uuid_col(CollectionVisits::Uuid))
                    .col(fk_id_col(manager, CollectionVisits::TaskId))
                    .col(fk_id_col(manager, CollectionVisits::CollectorId))
                    .col(timestamp_col(CollectionVisits::VisitedAt))
                    .col(
                        ColumnDef::new(CollectionVisits::VisitStatus)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("visited")),
                    )
                    .col(ColumnDef::new(CollectionVisits::CompletedAt).timestamp())
                    .col(
                        ColumnDef::new(CollectionVisits::NeedsReconciliation)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(CollectionVisits::Rating).integer())
                    .col(ColumnDef::new(CollectionVisits::RatingComment).text())
                    .col(timestamp_col(CollectionVisits::CreatedAt))
                    .col(timestamp_col(CollectionVisits::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_collection_visits_uuid")
                    .table(CollectionVisits::Table)
                    .col(CollectionVisits::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_collection_visits_task_id")
                    .table(CollectionVisits::Table)
                    .col(CollectionVisits::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(VisitWasteItems::Table)
                    .col(pk_id_col(manager, VisitWasteItems::Id))
                    .col(uuid_col(VisitWasteItems::Uuid))
                    .col(fk_id_col(manager, VisitWasteItems::VisitId))
                    .col(fk_id_col(manager, VisitWasteItems::WasteTypeId))
                    .col(
                        ColumnDef::new(VisitWasteItems::WeightKg)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VisitWasteItems::SortingLevel)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("fair")),
                    )
                    .col(timestamp_col(VisitWasteItems::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_visit_waste_items_uuid")
                    .table(VisitWasteItems::Table)
                    .col(VisitWasteItems::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_visit_waste_items_visit_id")
                    .table(VisitWasteItems::Table)
                    .col(VisitWasteItems::VisitId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(EvidencePhotos::Table)
                    .col(pk_id_col(manager, EvidencePhotos::Id))
                    .col(uuid_col(EvidencePhotos::Uuid))
                    .col(fk_id_col(manager, EvidencePhotos::VisitId))
                    .col(ColumnDef::new(EvidencePhotos::Url).string().not_null())
                    .col(ColumnDef::new(EvidencePhotos::Caption).string())
                    .col(timestamp_col(EvidencePhotos::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_evidence_photos_uuid")
                    .table(EvidencePhotos::Table)
                    .col(EvidencePhotos::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_evidence_photos_visit_id")
                    .table(EvidencePhotos::Table)
                    .col(EvidencePhotos::VisitId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EvidencePhotos::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VisitWasteItems::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CollectionVisits::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskAssignments::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Capabilities::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WasteReports::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WasteTypes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Areas::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enterprises::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Email,
    DisplayName,
    Role,
    AccountStatus,
    DeleteScheduledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Enterprises {
    Table,
    Id,
    Uuid,
    Name,
    ContactEmail,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Areas {
    Table,
    Id,
    Uuid,
    Name,
    District,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WasteTypes {
    Table,
    Id,
    Uuid,
    Name,
    Hazardous,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WasteReports {
    Table,
    Id,
    Uuid,
    ReporterId,
    AreaId,
    WasteTypeId,
    Description,
    EstimatedWeightKg,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Capabilities {
    Table,
    Id,
    Uuid,
    EnterpriseId,
    AreaId,
    WasteTypeId,
    DailyCapacityKg,
    UsedCapacityKg,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ReportId,
    EnterpriseId,
    AreaId,
    Status,
    Priority,
    ScheduledDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskAssignments {
    Table,
    Id,
    Uuid,
    TaskId,
    CollectorId,
    Status,
    AcceptedAt,
    UnassignedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CollectionVisits {
    Table,
    Id,
    Uuid,
    TaskId,
    CollectorId,
    VisitedAt,
    VisitStatus,
    CompletedAt,
    NeedsReconciliation,
    Rating,
    RatingComment,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum VisitWasteItems {
    Table,
    Id,
    Uuid,
    VisitId,
    WasteTypeId,
    WeightKg,
    SortingLevel,
    CreatedAt,
}

#[derive(Iden)]
enum EvidencePhotos {
    Table,
    Id,
    Uuid,
    VisitId,
    Url,
    Caption,
    CreatedAt,
}

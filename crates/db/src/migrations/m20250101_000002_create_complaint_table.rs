//! Create complaint table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_user_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Complaint::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Complaint::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Complaint::ComplaintCode).string_len(32).not_null())
                    .col(ColumnDef::new(Complaint::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Complaint::Description).text().not_null())
                    .col(ColumnDef::new(Complaint::Category).string_len(128).not_null())
                    .col(ColumnDef::new(Complaint::Priority).string_len(16).not_null())
                    .col(ColumnDef::new(Complaint::Status).string_len(16).not_null().default("PENDING"))
                    .col(ColumnDef::new(Complaint::Address).text())
                    .col(ColumnDef::new(Complaint::Latitude).double())
                    .col(ColumnDef::new(Complaint::Longitude).double())
                    .col(ColumnDef::new(Complaint::ImageUrl).string_len(1024))
                    .col(ColumnDef::new(Complaint::AssignedDept).string_len(256))
                    .col(ColumnDef::new(Complaint::ReportedById).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Complaint::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Complaint::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaint_reported_by")
                            .from(Complaint::Table, Complaint::ReportedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // Location is both coordinates or neither
                    .check(Expr::cust("(latitude IS NULL) = (longitude IS NULL)"))
                    .to_owned(),
            )
            .await?;

        // Index: reported_by_id (citizen's own reports)
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_reported_by_id")
                    .table(Complaint::Table)
                    .col(Complaint::ReportedById)
                    .to_owned(),
            )
            .await?;

        // Index: status
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_status")
                    .table(Complaint::Table)
                    .col(Complaint::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_created_at")
                    .table(Complaint::Table)
                    .col(Complaint::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Complaint::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Complaint {
    Table,
    Id,
    ComplaintCode,
    Title,
    Description,
    Category,
    Priority,
    Status,
    Address,
    Latitude,
    Longitude,
    ImageUrl,
    AssignedDept,
    ReportedById,
    CreatedAt,
    UpdatedAt,
}

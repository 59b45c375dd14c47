//! Create `complaint_helper` table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_user_table::User;
use super::m20250101_000002_create_complaint_table::Complaint;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComplaintHelper::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ComplaintHelper::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(ComplaintHelper::ComplaintId).string_len(32).not_null())
                    .col(ColumnDef::new(ComplaintHelper::NgoId).string_len(32).not_null())
                    .col(ColumnDef::new(ComplaintHelper::Status).string_len(16).not_null().default("HELPING"))
                    .col(ColumnDef::new(ComplaintHelper::Message).text())
                    .col(
                        ColumnDef::new(ComplaintHelper::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ComplaintHelper::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaint_helper_complaint")
                            .from(ComplaintHelper::Table, ComplaintHelper::ComplaintId)
                            .to(Complaint::Table, Complaint::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaint_helper_ngo")
                            .from(ComplaintHelper::Table, ComplaintHelper::NgoId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (complaint_id, ngo_id), the upsert conflict target
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_helper_unique")
                    .table(ComplaintHelper::Table)
                    .col(ComplaintHelper::ComplaintId)
                    .col(ComplaintHelper::NgoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: ngo_id
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_helper_ngo_id")
                    .table(ComplaintHelper::Table)
                    .col(ComplaintHelper::NgoId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ComplaintHelper::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ComplaintHelper {
    Table,
    Id,
    ComplaintId,
    NgoId,
    Status,
    Message,
    CreatedAt,
    UpdatedAt,
}

//! Create accident report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccidentReport::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccidentReport::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccidentReport::ReporterId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(AccidentReport::ReporterSnapshot)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccidentReport::Description).text().not_null())
                    .col(ColumnDef::new(AccidentReport::Longitude).double().not_null())
                    .col(ColumnDef::new(AccidentReport::Latitude).double().not_null())
                    .col(ColumnDef::new(AccidentReport::Address).string_len(512))
                    .col(ColumnDef::new(AccidentReport::AccuracyMeters).double())
                    .col(
                        ColumnDef::new(AccidentReport::Attachments)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(AccidentReport::VoiceRecording).json_binary())
                    .col(ColumnDef::new(AccidentReport::IdentityCapture).json_binary())
                    .col(
                        ColumnDef::new(AccidentReport::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AccidentReport::Priority)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(AccidentReport::AssignedTo).string_len(64))
                    .col(
                        ColumnDef::new(AccidentReport::Notes)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(AccidentReport::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(AccidentReport::ResponseTimeMinutes).big_integer())
                    .col(
                        ColumnDef::new(AccidentReport::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AccidentReport::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(AccidentReport::Longitude).between(-180.0, 180.0))
                    .check(Expr::col(AccidentReport::Latitude).between(-90.0, 90.0))
                    .check(
                        Expr::col(AccidentReport::ResponseTimeMinutes)
                            .is_null()
                            .or(Expr::col(AccidentReport::ResponseTimeMinutes).gte(0)),
                    )
                    .to_owned(),
            )
            .await?;

        // Spatial prefilter: (latitude, longitude)
        manager
            .create_index(
                Index::create()
                    .name("idx_accident_report_location")
                    .table(AccidentReport::Table)
                    .col(AccidentReport::Latitude)
                    .col(AccidentReport::Longitude)
                    .to_owned(),
            )
            .await?;

        // Index: status + created_at (admin listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_accident_report_status_created_at")
                    .table(AccidentReport::Table)
                    .col(AccidentReport::Status)
                    .col((AccidentReport::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Index: priority + created_at (admin listing by priority)
        manager
            .create_index(
                Index::create()
                    .name("idx_accident_report_priority_created_at")
                    .table(AccidentReport::Table)
                    .col(AccidentReport::Priority)
                    .col((AccidentReport::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Index: reporter_id + created_at (my reports)
        manager
            .create_index(
                Index::create()
                    .name("idx_accident_report_reporter_created_at")
                    .table(AccidentReport::Table)
                    .col(AccidentReport::ReporterId)
                    .col((AccidentReport::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccidentReport::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccidentReport {
    Table,
    Id,
    ReporterId,
    ReporterSnapshot,
    Description,
    Longitude,
    Latitude,
    Address,
    AccuracyMeters,
    Attachments,
    VoiceRecording,
    IdentityCapture,
    Status,
    Priority,
    AssignedTo,
    Notes,
    ResolvedAt,
    ResponseTimeMinutes,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProcessedTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProcessedTasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProcessedTasks::ResourceId).string().not_null())
                    .col(ColumnDef::new(ProcessedTasks::Action).string().not_null())
                    .col(ColumnDef::new(ProcessedTasks::Status).string().not_null())
                    .col(ColumnDef::new(ProcessedTasks::Result).text())
                    .col(ColumnDef::new(ProcessedTasks::LastEventId).uuid())
                    .col(
                        ColumnDef::new(ProcessedTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProcessedTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(ProcessedTasks::Table)
                    .col(ProcessedTasks::ResourceId)
                    .name("idx_processed_tasks_resource_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProcessedTasks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ProcessedTasks {
    Table,
    Id,
    ResourceId,
    Action,
    Status,
    Result,
    LastEventId,
    CreatedAt,
    UpdatedAt,
}

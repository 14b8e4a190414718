use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // `value` has BLOB affinity so SQLite keeps each row's storage class
        manager
            .create_table(
                Table::create()
                    .table(VssData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VssData::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VssData::Value).blob().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VssData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VssData {
    Table,
    Key,
    Value,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PickupLocations {
    Table,
    Id,
    Name,
    Address,
    City,
    Hours,
    Phone,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    PickupLocationId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PickupLocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickupLocations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PickupLocations::Name).string().not_null())
                    .col(ColumnDef::new(PickupLocations::Address).string().not_null())
                    .col(ColumnDef::new(PickupLocations::City).string().not_null())
                    .col(ColumnDef::new(PickupLocations::Hours).string().null())
                    .col(ColumnDef::new(PickupLocations::Phone).string().null())
                    .col(
                        ColumnDef::new(PickupLocations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PickupLocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // SQLite only accepts one column per ALTER TABLE statement
        manager
            .alter_table(
                Table::alter()
                    .table(Orders::Table)
                    .add_column(ColumnDef::new(Orders::PickupLocationId).uuid().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Orders::Table)
                    .drop_column(Orders::PickupLocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PickupLocations::Table).to_owned())
            .await?;

        Ok(())
    }
}

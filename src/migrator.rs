use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_warehouse_transfers_table::Migration),
            Box::new(m20240101_000002_create_warehouse_transfer_items_table::Migration),
            Box::new(m20240101_000003_create_warehouse_transfer_logs_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_warehouse_transfers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_warehouse_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseTransfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::TransferNumber)
                                .string_len(32)
                                .unique_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::SourceWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::TargetWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::InitiatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::InitiatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransfers::CourierName).string())
                        .col(ColumnDef::new(WarehouseTransfers::TrackingNumber).string())
                        .col(
                            ColumnDef::new(WarehouseTransfers::ExpectedDeliveryDate)
                                .timestamp_with_time_zone(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::DispatchedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(WarehouseTransfers::ReceivedBy).uuid())
                        .col(
                            ColumnDef::new(WarehouseTransfers::ReceivedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(WarehouseTransfers::ReceiptNotes).text())
                        .col(ColumnDef::new(WarehouseTransfers::ReturnCourierName).string())
                        .col(ColumnDef::new(WarehouseTransfers::ReturnTrackingNumber).string())
                        .col(
                            ColumnDef::new(WarehouseTransfers::ReturnDispatchedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(WarehouseTransfers::CancellationReason).text())
                        .col(
                            ColumnDef::new(WarehouseTransfers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransfers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfers_status")
                        .table(WarehouseTransfers::Table)
                        .col(WarehouseTransfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfers_source")
                        .table(WarehouseTransfers::Table)
                        .col(WarehouseTransfers::SourceWarehouseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfers_target")
                        .table(WarehouseTransfers::Table)
                        .col(WarehouseTransfers::TargetWarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseTransfers {
        Table,
        Id,
        TransferNumber,
        SourceWarehouseId,
        TargetWarehouseId,
        Status,
        InitiatedBy,
        InitiatedAt,
        CourierName,
        TrackingNumber,
        ExpectedDeliveryDate,
        DispatchedAt,
        ReceivedBy,
        ReceivedAt,
        ReceiptNotes,
        ReturnCourierName,
        ReturnTrackingNumber,
        ReturnDispatchedAt,
        CancellationReason,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_warehouse_transfer_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_warehouse_transfer_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseTransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseTransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransferItems::BatchNumber).string())
                        .col(
                            ColumnDef::new(WarehouseTransferItems::ExpiryDate)
                                .timestamp_with_time_zone(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::UnitPrice).decimal_len(19, 4),
                        )
                        .col(ColumnDef::new(WarehouseTransferItems::CurrencyCode).string_len(3))
                        .col(
                            ColumnDef::new(WarehouseTransferItems::QuantitySent)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::QuantityReceived)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::QuantityRejected)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::QuantityDisposed)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::QuantityReturned)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransferItems::RejectionReason).text())
                        .col(ColumnDef::new(WarehouseTransferItems::DisposalReason).text())
                        .col(ColumnDef::new(WarehouseTransferItems::ConditionNotes).text())
                        .col(
                            ColumnDef::new(WarehouseTransferItems::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_transfer")
                                .from(
                                    WarehouseTransferItems::Table,
                                    WarehouseTransferItems::TransferId,
                                )
                                .to(WarehouseTransfers::Table, WarehouseTransfers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfer_items_transfer")
                        .table(WarehouseTransferItems::Table)
                        .col(WarehouseTransferItems::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(WarehouseTransferItems::Table)
                        .to_owned(),
                )
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseTransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        BatchNumber,
        ExpiryDate,
        UnitPrice,
        CurrencyCode,
        QuantitySent,
        QuantityReceived,
        QuantityRejected,
        QuantityDisposed,
        QuantityReturned,
        Status,
        RejectionReason,
        DisposalReason,
        ConditionNotes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WarehouseTransfers {
        Table,
        Id,
    }
}

mod m20240101_000003_create_warehouse_transfer_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_warehouse_transfer_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to warehouse_transfers: log rows persist for
            // compliance independently of the transfer record's lifetime.
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseTransferLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransferLogs::ItemId).uuid())
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::Action)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::ActorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransferLogs::PreviousStatus).string_len(32))
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::NewStatus)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseTransferLogs::Detail).json())
                        .col(ColumnDef::new(WarehouseTransferLogs::Notes).text())
                        .col(ColumnDef::new(WarehouseTransferLogs::OriginIp).string_len(45))
                        .col(
                            ColumnDef::new(WarehouseTransferLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfer_logs_transfer")
                        .table(WarehouseTransferLogs::Table)
                        .col(WarehouseTransferLogs::TransferId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_transfer_logs_item")
                        .table(WarehouseTransferLogs::Table)
                        .col(WarehouseTransferLogs::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseTransferLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseTransferLogs {
        Table,
        Id,
        TransferId,
        ItemId,
        Action,
        ActorId,
        PreviousStatus,
        NewStatus,
        Detail,
        Notes,
        OriginIp,
        CreatedAt,
    }
}

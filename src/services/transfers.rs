use sea_orm::{
    ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    commands::transfers::{
        cancel_transfer_command::{CancelTransferCommand, CancelTransferResult},
        dispatch_return_command::{DispatchReturnCommand, DispatchReturnResult},
        dispatch_transfer_command::{DispatchTransferCommand, DispatchTransferResult},
        dispose_rejected_item_command::{DisposeRejectedItemCommand, DisposeRejectedItemResult},
        initiate_transfer_command::{InitiateTransferCommand, InitiateTransferResult},
        receive_transfer_items_command::{
            ReceiveTransferItemsCommand, ReceiveTransferItemsResult,
        },
        return_rejected_item_command::{ReturnRejectedItemCommand, ReturnRejectedItemResult},
    },
    commands::Command,
    db::DbPool,
    entities::{warehouse_transfer, warehouse_transfer_item, warehouse_transfer_log},
    errors::ServiceError,
    events::EventSender,
};

/// Read-only projection joining a transfer with its items and audit trail.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferWithHistory {
    pub transfer: warehouse_transfer::Model,
    pub items: Vec<warehouse_transfer_item::Model>,
    pub logs: Vec<warehouse_transfer_log::Model>,
}

/// Service for managing warehouse-to-warehouse transfers.
///
/// The sole writer of transfer, item and log records; every mutating method
/// runs as one atomic unit of work and appends its audit entries inside
/// that unit.
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl TransferService {
    /// Creates a new transfer service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a transfer in `initiated` state with its pending items.
    #[instrument(skip(self, command))]
    pub async fn initiate_transfer(
        &self,
        command: InitiateTransferCommand,
    ) -> Result<InitiateTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Records outbound courier metadata and moves the transfer in transit.
    #[instrument(skip(self, command))]
    pub async fn dispatch_transfer(
        &self,
        command: DispatchTransferCommand,
    ) -> Result<DispatchTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Applies a batch of receipt actions, all-or-nothing.
    #[instrument(skip(self, command))]
    pub async fn receive_items(
        &self,
        command: ReceiveTransferItemsCommand,
    ) -> Result<ReceiveTransferItemsResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Disposes rejected units of one item.
    #[instrument(skip(self, command))]
    pub async fn dispose_rejected_item(
        &self,
        command: DisposeRejectedItemCommand,
    ) -> Result<DisposeRejectedItemResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Marks rejected units of one item as returned to source.
    #[instrument(skip(self, command))]
    pub async fn return_rejected_item(
        &self,
        command: ReturnRejectedItemCommand,
    ) -> Result<ReturnRejectedItemResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Dispatches the return leg once every rejected unit is accounted for.
    #[instrument(skip(self, command))]
    pub async fn dispatch_return(
        &self,
        command: DispatchReturnCommand,
    ) -> Result<DispatchReturnResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Cancels a transfer that has seen no receipt activity.
    #[instrument(skip(self, command))]
    pub async fn cancel_transfer(
        &self,
        command: CancelTransferCommand,
    ) -> Result<CancelTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a transfer by ID
    #[instrument(skip(self))]
    pub async fn get_transfer(
        &self,
        transfer_id: &Uuid,
    ) -> Result<Option<warehouse_transfer::Model>, ServiceError> {
        let db = &*self.db_pool;
        warehouse_transfer::Entity::find_by_id(*transfer_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(transfer_id = %transfer_id, error = %e, "Database error when fetching transfer");
                ServiceError::db_error(e)
            })
    }

    /// Joins a transfer with its items and audit trail. Read-only.
    #[instrument(skip(self))]
    pub async fn get_transfer_with_history(
        &self,
        transfer_id: &Uuid,
    ) -> Result<TransferWithHistory, ServiceError> {
        let db = &*self.db_pool;

        let transfer = warehouse_transfer::Entity::find_by_id(*transfer_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
            })?;

        let items = transfer
            .find_related(warehouse_transfer_item::Entity)
            .order_by_asc(warehouse_transfer_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let logs = warehouse_transfer_log::Entity::find()
            .filter(warehouse_transfer_log::Column::TransferId.eq(*transfer_id))
            .order_by_asc(warehouse_transfer_log::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(TransferWithHistory {
            transfer,
            items,
            logs,
        })
    }

    /// Lists transfers with pagination
    #[instrument(skip(self))]
    pub async fn list_transfers(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<warehouse_transfer::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = warehouse_transfer::Entity::find()
            .order_by_desc(warehouse_transfer::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;

        let transfers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((transfers, total))
    }
}

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::transfers::audit::{append_log, require_actor, AuditEntry},
    commands::Command,
    db::DbPool,
    entities::{
        warehouse_transfer::{self, Entity as WarehouseTransfer, TransferStatus},
        warehouse_transfer_item::{self, Entity as WarehouseTransferItem},
        warehouse_transfer_log::TransferAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::transfer_state,
};

lazy_static! {
    static ref TRANSFER_CANCELLATIONS: IntCounter = IntCounter::new(
        "warehouse_transfer_cancellations_total",
        "Total number of cancelled warehouse transfers"
    )
    .expect("metric can be created");
    static ref TRANSFER_CANCELLATION_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_cancellation_failures_total",
        "Total number of failed warehouse transfer cancellations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CancelTransferCommand {
    pub transfer_id: Uuid,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Reason must be between 1 and 500 characters"
    ))]
    pub reason: String,
    pub actor_id: Uuid,
    /// Transfer version the caller read, for optimistic locking.
    pub version: i32,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelTransferResult {
    pub transfer: warehouse_transfer::Model,
}

#[async_trait::async_trait]
impl Command for CancelTransferCommand {
    type Result = CancelTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            TRANSFER_CANCELLATION_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let (transfer, previous_status) = db
            .transaction::<_, (warehouse_transfer::Model, String), ServiceError>(|txn| {
                Box::pin(async move {
                    let transfer = WarehouseTransfer::find_by_id(self.transfer_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Transfer {} not found",
                                self.transfer_id
                            ))
                        })?;

                    if transfer.version != self.version {
                        warn!(
                            transfer_id = %self.transfer_id,
                            "Concurrent modification detected while cancelling transfer"
                        );
                        return Err(ServiceError::ConcurrentModification(self.transfer_id));
                    }

                    let items = WarehouseTransferItem::find()
                        .filter(warehouse_transfer_item::Column::TransferId.eq(self.transfer_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;

                    let statuses: Vec<_> = items.iter().map(|i| i.status).collect();
                    if !transfer_state::can_cancel(transfer.status, &statuses) {
                        return Err(ServiceError::InvalidTransition(format!(
                            "cannot cancel a transfer in status {} with receipt activity",
                            transfer.status
                        )));
                    }

                    let previous_status = transfer.status;
                    let mut active: warehouse_transfer::ActiveModel = transfer.into();
                    active.status = Set(TransferStatus::Cancelled);
                    active.cancellation_reason = Set(Some(self.reason.clone()));
                    active.version = Set(self.version + 1);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                    append_log(
                        txn,
                        AuditEntry {
                            transfer_id: updated.id,
                            item_id: None,
                            action: TransferAction::TransferCancelled,
                            actor_id: self.actor_id,
                            previous_status: Some(previous_status.to_string()),
                            new_status: updated.status.to_string(),
                            detail: serde_json::json!({
                                "reason": self.reason,
                                "item_count": statuses.len(),
                            }),
                            notes: None,
                            origin_ip: self.origin_ip.clone(),
                        },
                    )
                    .await?;

                    Ok((updated, previous_status.to_string()))
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_CANCELLATION_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            reason = %self.reason,
            previous_status = %previous_status,
            "Warehouse transfer cancelled"
        );

        if let Err(e) = event_sender
            .send(Event::TransferCancelled(transfer.id))
            .await
        {
            warn!("Failed to publish transfer cancelled event: {}", e);
        }

        TRANSFER_CANCELLATIONS.inc();

        Ok(CancelTransferResult { transfer })
    }
}

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::transfers::audit::{append_log, require_actor, AuditEntry},
    commands::Command,
    db::DbPool,
    entities::{
        warehouse_transfer::Entity as WarehouseTransfer,
        warehouse_transfer_item::{self, Entity as WarehouseTransferItem},
        warehouse_transfer_log::TransferAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{transfer_item_state, ItemAction},
};

lazy_static! {
    static ref ITEM_DISPOSALS: IntCounter = IntCounter::new(
        "warehouse_transfer_item_disposals_total",
        "Total number of disposed transfer item quantities"
    )
    .expect("metric can be created");
    static ref ITEM_DISPOSAL_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_item_disposal_failures_total",
        "Total number of failed transfer item disposals"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DisposeRejectedItemCommand {
    pub item_id: Uuid,
    /// Units to dispose; `None` disposes the whole rejected remainder.
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 500, message = "Disposal reason cannot be empty"))]
    pub reason: String,
    pub actor_id: Uuid,
    /// Item version the caller read, for optimistic locking.
    pub version: i32,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisposeRejectedItemResult {
    pub item: warehouse_transfer_item::Model,
}

#[async_trait::async_trait]
impl Command for DisposeRejectedItemCommand {
    type Result = DisposeRejectedItemResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            ITEM_DISPOSAL_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let (item, previous_status) = db
            .transaction::<_, (warehouse_transfer_item::Model, String), ServiceError>(|txn| {
                Box::pin(async move {
                    let item = WarehouseTransferItem::find_by_id(self.item_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Item {} not found", self.item_id))
                        })?;

                    // The parent must still exist; disposal is part of its history.
                    WarehouseTransfer::find_by_id(item.transfer_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Transfer {} not found",
                                item.transfer_id
                            ))
                        })?;

                    if item.version != self.version {
                        warn!(
                            item_id = %self.item_id,
                            "Concurrent modification detected while disposing item"
                        );
                        return Err(ServiceError::ConcurrentModification(self.item_id));
                    }

                    let previous_status = item.status;
                    let (quantities, new_status) = transfer_item_state::apply(
                        item.status,
                        item.quantities(),
                        &ItemAction::Dispose {
                            quantity: self.quantity,
                        },
                    )?;
                    let disposed_delta = quantities.disposed - item.quantity_disposed;

                    let mut active: warehouse_transfer_item::ActiveModel = item.clone().into();
                    active.quantity_disposed = Set(quantities.disposed);
                    active.status = Set(new_status);
                    active.disposal_reason = Set(Some(self.reason.clone()));
                    active.version = Set(item.version + 1);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                    append_log(
                        txn,
                        AuditEntry {
                            transfer_id: updated.transfer_id,
                            item_id: Some(updated.id),
                            action: TransferAction::ItemDisposed,
                            actor_id: self.actor_id,
                            previous_status: Some(previous_status.to_string()),
                            new_status: updated.status.to_string(),
                            detail: serde_json::json!({
                                "quantity_disposed_delta": disposed_delta,
                                "quantity_disposed": updated.quantity_disposed,
                                "quantity_rejected": updated.quantity_rejected,
                                "reason": self.reason,
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
                ITEM_DISPOSAL_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            item_id = %item.id,
            transfer_id = %item.transfer_id,
            disposed = item.quantity_disposed,
            reason = %self.reason,
            "Rejected transfer item quantity disposed"
        );

        if let Err(e) = event_sender
            .send(Event::TransferItemStatusChanged {
                transfer_id: item.transfer_id,
                item_id: item.id,
                previous_status,
                new_status: item.status.to_string(),
                actor_id: self.actor_id,
            })
            .await
        {
            warn!("Failed to publish item disposal event: {}", e);
        }

        ITEM_DISPOSALS.inc();

        Ok(DisposeRejectedItemResult { item })
    }
}

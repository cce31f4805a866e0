use std::collections::HashMap;
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
    models::{transfer_item_state, transfer_state, ItemAction},
};

lazy_static! {
    static ref ITEM_RECEIPTS: IntCounter = IntCounter::new(
        "warehouse_transfer_item_receipts_total",
        "Total number of processed transfer item receipt actions"
    )
    .expect("metric can be created");
    static ref RECEIPT_BATCH_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_receipt_batch_failures_total",
        "Total number of failed transfer receipt batches"
    )
    .expect("metric can be created");
}

/// One receipt action against one line of the transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReceipt {
    pub item_id: Uuid,
    pub quantity_received: i32,
    pub quantity_rejected: i32,
    pub rejection_reason: Option<String>,
    pub condition_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReceiveTransferItemsCommand {
    pub transfer_id: Uuid,
    #[validate(length(min = 1, message = "Receipt batch needs at least one action"))]
    pub actions: Vec<ItemReceipt>,
    pub actor_id: Uuid,
    pub notes: Option<String>,
    /// Transfer version the caller read, for optimistic locking. Serializes
    /// concurrent receipt batches against the same transfer.
    pub version: i32,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiveTransferItemsResult {
    pub transfer: warehouse_transfer::Model,
    pub items: Vec<warehouse_transfer_item::Model>,
    pub status_changed: bool,
}

struct ItemOutcome {
    item_id: Uuid,
    previous_status: String,
    new_status: String,
}

#[async_trait::async_trait]
impl Command for ReceiveTransferItemsCommand {
    type Result = ReceiveTransferItemsResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            RECEIPT_BATCH_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        // The whole batch commits or nothing does; a single bad action rolls
        // back every other action in the call.
        let (result, outcomes, previous_transfer_status) = db
            .transaction::<_, (ReceiveTransferItemsResult, Vec<ItemOutcome>, TransferStatus), ServiceError>(
                |txn| {
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

                        match transfer.status {
                            TransferStatus::InTransit | TransferStatus::PartialReceived => {}
                            other => {
                                return Err(ServiceError::InvalidTransition(format!(
                                    "cannot receive items on a transfer in status {}",
                                    other
                                )));
                            }
                        }
                        if transfer.version != self.version {
                            warn!(
                                transfer_id = %self.transfer_id,
                                "Concurrent modification detected while receiving items"
                            );
                            return Err(ServiceError::ConcurrentModification(self.transfer_id));
                        }

                        let mut items: HashMap<Uuid, warehouse_transfer_item::Model> =
                            WarehouseTransferItem::find()
                                .filter(
                                    warehouse_transfer_item::Column::TransferId
                                        .eq(self.transfer_id),
                                )
                                .all(txn)
                                .await
                                .map_err(ServiceError::DatabaseError)?
                                .into_iter()
                                .map(|item| (item.id, item))
                                .collect();

                        let mut outcomes = Vec::with_capacity(self.actions.len());
                        let mut touched = Vec::with_capacity(self.actions.len());

                        for action in &self.actions {
                            let item = items.get(&action.item_id).cloned().ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Item {} not found on transfer {}",
                                    action.item_id, self.transfer_id
                                ))
                            })?;

                            let previous_status = item.status;
                            let (quantities, new_status) = transfer_item_state::apply(
                                item.status,
                                item.quantities(),
                                &ItemAction::Receive {
                                    received_delta: action.quantity_received,
                                    rejected_delta: action.quantity_rejected,
                                },
                            )?;

                            let mut active: warehouse_transfer_item::ActiveModel =
                                item.clone().into();
                            active.quantity_received = Set(quantities.received);
                            active.quantity_rejected = Set(quantities.rejected);
                            active.status = Set(new_status);
                            if action.rejection_reason.is_some() {
                                active.rejection_reason = Set(action.rejection_reason.clone());
                            }
                            if action.condition_notes.is_some() {
                                active.condition_notes = Set(action.condition_notes.clone());
                            }
                            active.version = Set(item.version + 1);
                            active.updated_at = Set(Utc::now());

                            let updated =
                                active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                            append_log(
                                txn,
                                AuditEntry {
                                    transfer_id: self.transfer_id,
                                    item_id: Some(updated.id),
                                    action: TransferAction::ItemReceived,
                                    actor_id: self.actor_id,
                                    previous_status: Some(previous_status.to_string()),
                                    new_status: updated.status.to_string(),
                                    detail: serde_json::json!({
                                        "quantity_received_delta": action.quantity_received,
                                        "quantity_rejected_delta": action.quantity_rejected,
                                        "quantity_received": updated.quantity_received,
                                        "quantity_rejected": updated.quantity_rejected,
                                        "quantity_outstanding": updated.outstanding_quantity(),
                                        "rejection_reason": action.rejection_reason,
                                    }),
                                    notes: None,
                                    origin_ip: self.origin_ip.clone(),
                                },
                            )
                            .await?;

                            outcomes.push(ItemOutcome {
                                item_id: updated.id,
                                previous_status: previous_status.to_string(),
                                new_status: updated.status.to_string(),
                            });
                            items.insert(updated.id, updated.clone());
                            touched.push(updated.id);
                        }

                        // Re-derive the aggregate from every item, touched or not.
                        let statuses: Vec<_> = items.values().map(|i| i.status).collect();
                        let derived = transfer_state::derive_status(&statuses);

                        let previous_transfer_status = transfer.status;
                        let status_changed = derived != previous_transfer_status;

                        let mut active: warehouse_transfer::ActiveModel = transfer.into();
                        active.status = Set(derived);
                        if let Some(notes) = &self.notes {
                            active.receipt_notes = Set(Some(notes.clone()));
                        }
                        // First receipt pins the receiver identity.
                        if matches!(
                            active.received_by,
                            sea_orm::ActiveValue::Unchanged(None)
                        ) {
                            active.received_by = Set(Some(self.actor_id));
                            active.received_at = Set(Some(Utc::now()));
                        }
                        active.version = Set(self.version + 1);
                        active.updated_at = Set(Utc::now());

                        let transfer =
                            active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                        if status_changed {
                            append_log(
                                txn,
                                AuditEntry {
                                    transfer_id: transfer.id,
                                    item_id: None,
                                    action: TransferAction::StatusChanged,
                                    actor_id: self.actor_id,
                                    previous_status: Some(previous_transfer_status.to_string()),
                                    new_status: transfer.status.to_string(),
                                    detail: serde_json::json!({
                                        "derived_from_items": statuses
                                            .iter()
                                            .map(|s| s.to_string())
                                            .collect::<Vec<_>>(),
                                    }),
                                    notes: self.notes.clone(),
                                    origin_ip: self.origin_ip.clone(),
                                },
                            )
                            .await?;
                        }

                        let updated_items = touched
                            .iter()
                            .filter_map(|id| items.get(id).cloned())
                            .collect();

                        Ok((
                            ReceiveTransferItemsResult {
                                transfer,
                                items: updated_items,
                                status_changed,
                            },
                            outcomes,
                            previous_transfer_status,
                        ))
                    })
                },
            )
            .await
            .map_err(|e| {
                RECEIPT_BATCH_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            transfer_id = %result.transfer.id,
            actions = outcomes.len(),
            status = %result.transfer.status,
            "Transfer receipt batch applied"
        );

        for outcome in &outcomes {
            if let Err(e) = event_sender
                .send(Event::TransferItemStatusChanged {
                    transfer_id: result.transfer.id,
                    item_id: outcome.item_id,
                    previous_status: outcome.previous_status.clone(),
                    new_status: outcome.new_status.clone(),
                    actor_id: self.actor_id,
                })
                .await
            {
                warn!("Failed to publish item status event: {}", e);
            }
            ITEM_RECEIPTS.inc();
        }
        if result.status_changed {
            if let Err(e) = event_sender
                .send(Event::TransferStatusChanged {
                    transfer_id: result.transfer.id,
                    previous_status: previous_transfer_status.to_string(),
                    new_status: result.transfer.status.to_string(),
                    actor_id: self.actor_id,
                })
                .await
            {
                warn!("Failed to publish transfer status event: {}", e);
            }
        }

        Ok(result)
    }
}

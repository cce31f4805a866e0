use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
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
};

lazy_static! {
    static ref TRANSFER_DISPATCHES: IntCounter = IntCounter::new(
        "warehouse_transfer_dispatches_total",
        "Total number of dispatched warehouse transfers"
    )
    .expect("metric can be created");
    static ref TRANSFER_DISPATCH_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_dispatch_failures_total",
        "Total number of failed warehouse transfer dispatches"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DispatchTransferCommand {
    pub transfer_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Courier name cannot be empty"))]
    pub courier_name: String,
    pub tracking_number: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actor_id: Uuid,
    /// Transfer version the caller read, for optimistic locking.
    pub version: i32,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchTransferResult {
    pub transfer: warehouse_transfer::Model,
}

#[async_trait::async_trait]
impl Command for DispatchTransferCommand {
    type Result = DispatchTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            TRANSFER_DISPATCH_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let transfer = db
            .transaction::<_, warehouse_transfer::Model, ServiceError>(|txn| {
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

                    if transfer.status != TransferStatus::Initiated {
                        return Err(ServiceError::InvalidTransition(format!(
                            "cannot dispatch a transfer in status {}",
                            transfer.status
                        )));
                    }
                    if transfer.version != self.version {
                        warn!(
                            transfer_id = %self.transfer_id,
                            "Concurrent modification detected while dispatching transfer"
                        );
                        return Err(ServiceError::ConcurrentModification(self.transfer_id));
                    }

                    let item_count = WarehouseTransferItem::find()
                        .filter(warehouse_transfer_item::Column::TransferId.eq(self.transfer_id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;
                    if item_count == 0 {
                        return Err(ServiceError::ValidationError(
                            "Transfer has no items to dispatch".to_string(),
                        ));
                    }

                    let previous_status = transfer.status;
                    let mut active: warehouse_transfer::ActiveModel = transfer.into();
                    active.status = Set(TransferStatus::InTransit);
                    active.courier_name = Set(Some(self.courier_name.clone()));
                    active.tracking_number = Set(self.tracking_number.clone());
                    active.expected_delivery_date = Set(self.expected_delivery_date);
                    active.dispatched_at = Set(Some(Utc::now()));
                    active.version = Set(self.version + 1);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                    append_log(
                        txn,
                        AuditEntry {
                            transfer_id: updated.id,
                            item_id: None,
                            action: TransferAction::TransferDispatched,
                            actor_id: self.actor_id,
                            previous_status: Some(previous_status.to_string()),
                            new_status: updated.status.to_string(),
                            detail: serde_json::json!({
                                "courier_name": self.courier_name,
                                "tracking_number": self.tracking_number,
                                "expected_delivery_date": self.expected_delivery_date,
                                "item_count": item_count,
                            }),
                            notes: None,
                            origin_ip: self.origin_ip.clone(),
                        },
                    )
                    .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_DISPATCH_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            courier = %self.courier_name,
            "Warehouse transfer dispatched"
        );

        if let Err(e) = event_sender
            .send(Event::TransferDispatched(transfer.id))
            .await
        {
            warn!("Failed to publish transfer dispatched event: {}", e);
        }

        TRANSFER_DISPATCHES.inc();

        Ok(DispatchTransferResult { transfer })
    }
}

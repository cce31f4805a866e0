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
    static ref RETURN_DISPATCHES: IntCounter = IntCounter::new(
        "warehouse_transfer_return_dispatches_total",
        "Total number of dispatched transfer return legs"
    )
    .expect("metric can be created");
    static ref RETURN_DISPATCH_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_return_dispatch_failures_total",
        "Total number of failed transfer return leg dispatches"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DispatchReturnCommand {
    pub transfer_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Courier name cannot be empty"))]
    pub courier_name: String,
    pub tracking_number: Option<String>,
    pub actor_id: Uuid,
    /// Transfer version the caller read, for optimistic locking.
    pub version: i32,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchReturnResult {
    pub transfer: warehouse_transfer::Model,
}

#[async_trait::async_trait]
impl Command for DispatchReturnCommand {
    type Result = DispatchReturnResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            RETURN_DISPATCH_FAILURES.inc();
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

                    match transfer.status {
                        TransferStatus::PartialReceived | TransferStatus::Rejected => {}
                        other => {
                            return Err(ServiceError::InvalidTransition(format!(
                                "cannot dispatch a return leg for a transfer in status {}",
                                other
                            )));
                        }
                    }
                    if transfer.version != self.version {
                        warn!(
                            transfer_id = %self.transfer_id,
                            "Concurrent modification detected while dispatching return leg"
                        );
                        return Err(ServiceError::ConcurrentModification(self.transfer_id));
                    }

                    let items = WarehouseTransferItem::find()
                        .filter(warehouse_transfer_item::Column::TransferId.eq(self.transfer_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;

                    let quantities: Vec<_> = items.iter().map(|i| i.quantities()).collect();
                    if !transfer_state::return_leg_complete(&quantities) {
                        return Err(ServiceError::InvalidTransition(
                            "rejected quantities are not fully marked returned".to_string(),
                        ));
                    }

                    let previous_status = transfer.status;
                    let mut active: warehouse_transfer::ActiveModel = transfer.into();
                    active.status = Set(TransferStatus::Returned);
                    active.return_courier_name = Set(Some(self.courier_name.clone()));
                    active.return_tracking_number = Set(self.tracking_number.clone());
                    active.return_dispatched_at = Set(Some(Utc::now()));
                    active.version = Set(self.version + 1);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                    let returned_total: i32 =
                        quantities.iter().map(|q| q.returned).sum();
                    append_log(
                        txn,
                        AuditEntry {
                            transfer_id: updated.id,
                            item_id: None,
                            action: TransferAction::ReturnDispatched,
                            actor_id: self.actor_id,
                            previous_status: Some(previous_status.to_string()),
                            new_status: updated.status.to_string(),
                            detail: serde_json::json!({
                                "return_courier_name": self.courier_name,
                                "return_tracking_number": self.tracking_number,
                                "quantity_returned_total": returned_total,
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
                RETURN_DISPATCH_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            courier = %self.courier_name,
            previous_status = %previous_status,
            "Transfer return leg dispatched"
        );

        if let Err(e) = event_sender
            .send(Event::TransferReturnDispatched(transfer.id))
            .await
        {
            warn!("Failed to publish return dispatch event: {}", e);
        }

        RETURN_DISPATCHES.inc();

        Ok(DispatchReturnResult { transfer })
    }
}

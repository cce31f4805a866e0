use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, TransactionError, TransactionTrait};
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
        warehouse_transfer::{self, TransferStatus},
        warehouse_transfer_item::{self, TransferItemStatus},
        warehouse_transfer_log::TransferAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

lazy_static! {
    static ref TRANSFER_INITIATIONS: IntCounter = IntCounter::new(
        "warehouse_transfer_initiations_total",
        "Total number of initiated warehouse transfers"
    )
    .expect("metric can be created");
    static ref TRANSFER_INITIATION_FAILURES: IntCounter = IntCounter::new(
        "warehouse_transfer_initiation_failures_total",
        "Total number of failed warehouse transfer initiations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransferItem {
    pub product_id: Uuid,
    pub quantity_sent: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub unit_price: Option<Decimal>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InitiateTransferCommand {
    pub source_warehouse_id: Uuid,
    pub target_warehouse_id: Uuid,
    #[validate(length(min = 1, message = "Transfer needs at least one item"))]
    pub items: Vec<NewTransferItem>,
    pub actor_id: Uuid,
    pub origin_ip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiateTransferResult {
    pub transfer: warehouse_transfer::Model,
    pub items: Vec<warehouse_transfer_item::Model>,
}

#[async_trait::async_trait]
impl Command for InitiateTransferCommand {
    type Result = InitiateTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        require_actor(self.actor_id)?;
        self.validate().map_err(|e| {
            TRANSFER_INITIATION_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        if self.source_warehouse_id == self.target_warehouse_id {
            TRANSFER_INITIATION_FAILURES.inc();
            return Err(ServiceError::ValidationError(
                "Source and target warehouse must differ".to_string(),
            ));
        }
        for item in &self.items {
            if item.quantity_sent <= 0 {
                TRANSFER_INITIATION_FAILURES.inc();
                return Err(ServiceError::ValidationError(format!(
                    "quantity_sent must be positive for product {}",
                    item.product_id
                )));
            }
        }

        let db = db_pool.as_ref();

        let result = db
            .transaction::<_, InitiateTransferResult, ServiceError>(|txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let transfer_id = Uuid::new_v4();
                    let transfer_number = generate_transfer_number(now);

                    let transfer = warehouse_transfer::ActiveModel {
                        id: Set(transfer_id),
                        transfer_number: Set(transfer_number),
                        source_warehouse_id: Set(self.source_warehouse_id),
                        target_warehouse_id: Set(self.target_warehouse_id),
                        status: Set(TransferStatus::Initiated),
                        initiated_by: Set(self.actor_id),
                        initiated_at: Set(now),
                        courier_name: Set(None),
                        tracking_number: Set(None),
                        expected_delivery_date: Set(None),
                        dispatched_at: Set(None),
                        received_by: Set(None),
                        received_at: Set(None),
                        receipt_notes: Set(None),
                        return_courier_name: Set(None),
                        return_tracking_number: Set(None),
                        return_dispatched_at: Set(None),
                        cancellation_reason: Set(None),
                        version: Set(1),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                    let mut items = Vec::with_capacity(self.items.len());
                    for line in &self.items {
                        let item = warehouse_transfer_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transfer_id: Set(transfer_id),
                            product_id: Set(line.product_id),
                            batch_number: Set(line.batch_number.clone()),
                            expiry_date: Set(line.expiry_date),
                            unit_price: Set(line.unit_price),
                            currency_code: Set(line.currency_code.clone()),
                            quantity_sent: Set(line.quantity_sent),
                            quantity_received: Set(0),
                            quantity_rejected: Set(0),
                            quantity_disposed: Set(0),
                            quantity_returned: Set(0),
                            status: Set(TransferItemStatus::Pending),
                            rejection_reason: Set(None),
                            disposal_reason: Set(None),
                            condition_notes: Set(None),
                            version: Set(1),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;
                        items.push(item);
                    }

                    append_log(
                        txn,
                        AuditEntry {
                            transfer_id,
                            item_id: None,
                            action: TransferAction::TransferInitiated,
                            actor_id: self.actor_id,
                            previous_status: None,
                            new_status: transfer.status.to_string(),
                            detail: serde_json::json!({
                                "item_count": items.len(),
                                "items": items
                                    .iter()
                                    .map(|i| serde_json::json!({
                                        "item_id": i.id,
                                        "product_id": i.product_id,
                                        "quantity_sent": i.quantity_sent,
                                    }))
                                    .collect::<Vec<_>>(),
                            }),
                            notes: None,
                            origin_ip: self.origin_ip.clone(),
                        },
                    )
                    .await?;

                    Ok(InitiateTransferResult { transfer, items })
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_INITIATION_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        info!(
            transfer_id = %result.transfer.id,
            transfer_number = %result.transfer.transfer_number,
            source = %self.source_warehouse_id,
            target = %self.target_warehouse_id,
            items = result.items.len(),
            "Warehouse transfer initiated"
        );

        if let Err(e) = event_sender
            .send(Event::TransferInitiated {
                transfer_id: result.transfer.id,
                transfer_number: result.transfer.transfer_number.clone(),
                actor_id: self.actor_id,
            })
            .await
        {
            warn!("Failed to publish transfer initiated event: {}", e);
        }

        TRANSFER_INITIATIONS.inc();

        Ok(result)
    }
}

/// Transfer numbers are unique and immutable once assigned, e.g.
/// `TRF-20250114-4K7QZA`.
fn generate_transfer_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("TRF-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_number_has_date_and_suffix() {
        let now = Utc::now();
        let number = generate_transfer_number(now);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TRF");
        assert_eq!(parts[1], now.format("%Y%m%d").to_string());
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn empty_item_list_fails_validation() {
        let command = InitiateTransferCommand {
            source_warehouse_id: Uuid::new_v4(),
            target_warehouse_id: Uuid::new_v4(),
            items: vec![],
            actor_id: Uuid::new_v4(),
            origin_ip: None,
        };
        assert!(command.validate().is_err());
    }
}

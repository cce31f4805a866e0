use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quantity_ledger::ItemQuantities;

/// Enum representing the possible statuses of a single transfer line.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferItemStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "partial_accepted")]
    PartialAccepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "disposed")]
    Disposed,
    #[sea_orm(string_value = "returned")]
    Returned,
}

/// The `warehouse_transfer_items` table: one product line within a transfer.
///
/// `quantity_sent` is fixed at creation; the other quantity fields start at
/// zero and only grow through receipt-time actions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_transfer_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub transfer_id: Uuid,

    pub product_id: Uuid,

    /// Batch tracking, absent for products that are not batch-tracked.
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,

    /// Informational only; no currency conversion happens here.
    pub unit_price: Option<Decimal>,
    pub currency_code: Option<String>,

    pub quantity_sent: i32,
    pub quantity_received: i32,
    pub quantity_rejected: i32,
    pub quantity_disposed: i32,
    pub quantity_returned: i32,

    pub status: TransferItemStatus,

    pub rejection_reason: Option<String>,
    pub disposal_reason: Option<String>,
    pub condition_notes: Option<String>,

    /// Revision counter for optimistic concurrency control.
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse_transfer::Entity",
        from = "Column::TransferId",
        to = "super::warehouse_transfer::Column::Id"
    )]
    Transfer,
}

impl Related<super::warehouse_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Quantity snapshot for the pure reconciliation functions.
    pub fn quantities(&self) -> ItemQuantities {
        ItemQuantities {
            sent: self.quantity_sent,
            received: self.quantity_received,
            rejected: self.quantity_rejected,
            disposed: self.quantity_disposed,
            returned: self.quantity_returned,
        }
    }

    pub fn outstanding_quantity(&self) -> i32 {
        self.quantities().outstanding()
    }
}

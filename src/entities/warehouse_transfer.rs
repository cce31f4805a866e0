use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the possible statuses of a warehouse transfer.
///
/// `initiated`, `in_transit`, `cancelled` and `returned` are set by explicit
/// top-level actions; the receipt outcomes are derived from item statuses.
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
pub enum TransferStatus {
    #[sea_orm(string_value = "initiated")]
    Initiated,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "partial_received")]
    PartialReceived,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TransferStatus {
    /// Terminal statuses are retained for audit and never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Received | TransferStatus::Rejected | TransferStatus::Returned | TransferStatus::Cancelled
        )
    }
}

/// The `warehouse_transfers` table: one shipment of one or more product
/// lines from a source warehouse to a target warehouse.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable transfer number, immutable once assigned.
    #[sea_orm(unique)]
    pub transfer_number: String,

    pub source_warehouse_id: Uuid,

    pub target_warehouse_id: Uuid,

    pub status: TransferStatus,

    /// Actor who submitted the line list.
    pub initiated_by: Uuid,

    pub initiated_at: DateTime<Utc>,

    // Outbound leg courier metadata, recorded at dispatch.
    pub courier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,

    /// Actor who recorded the first receipt action.
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub receipt_notes: Option<String>,

    // Return leg courier metadata, used only when rejected items travel
    // back to the source warehouse.
    pub return_courier_name: Option<String>,
    pub return_tracking_number: Option<String>,
    pub return_dispatched_at: Option<DateTime<Utc>>,

    pub cancellation_reason: Option<String>,

    /// Revision counter for optimistic concurrency control.
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouse_transfer_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::warehouse_transfer_log::Entity")]
    Logs,
}

impl Related<super::warehouse_transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::warehouse_transfer_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(TransferStatus::InTransit.to_string(), "in_transit");
        assert_eq!(TransferStatus::PartialReceived.to_string(), "partial_received");
    }

    #[test]
    fn terminal_statuses() {
        assert!(TransferStatus::Received.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
        assert!(!TransferStatus::Initiated.is_terminal());
        assert!(!TransferStatus::InTransit.is_terminal());
        assert!(!TransferStatus::PartialReceived.is_terminal());
    }
}

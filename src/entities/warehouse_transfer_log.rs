use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action tags recorded in the transfer audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferAction {
    TransferInitiated,
    TransferDispatched,
    ItemReceived,
    ItemDisposed,
    ItemReturned,
    StatusChanged,
    ReturnDispatched,
    TransferCancelled,
}

impl TransferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::TransferInitiated => "transfer_initiated",
            TransferAction::TransferDispatched => "transfer_dispatched",
            TransferAction::ItemReceived => "item_received",
            TransferAction::ItemDisposed => "item_disposed",
            TransferAction::ItemReturned => "item_returned",
            TransferAction::StatusChanged => "status_changed",
            TransferAction::ReturnDispatched => "return_dispatched",
            TransferAction::TransferCancelled => "transfer_cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transfer_initiated" => Some(TransferAction::TransferInitiated),
            "transfer_dispatched" => Some(TransferAction::TransferDispatched),
            "item_received" => Some(TransferAction::ItemReceived),
            "item_disposed" => Some(TransferAction::ItemDisposed),
            "item_returned" => Some(TransferAction::ItemReturned),
            "status_changed" => Some(TransferAction::StatusChanged),
            "return_dispatched" => Some(TransferAction::ReturnDispatched),
            "transfer_cancelled" => Some(TransferAction::TransferCancelled),
            _ => None,
        }
    }
}

/// The `warehouse_transfer_logs` table: append-only audit events.
///
/// Rows are written in the same transaction as the state change they
/// describe and are never updated or deleted. They reference the transfer
/// without owning it, so they survive for compliance independently of the
/// transfer record's lifetime.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_transfer_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub transfer_id: Uuid,

    /// Null for transfer-level events.
    pub item_id: Option<Uuid>,

    /// Action tag, stored as string; see [`TransferAction`].
    pub action: String,

    pub actor_id: Uuid,

    pub previous_status: Option<String>,

    pub new_status: String,

    /// Structured payload carrying the quantity deltas of the action, so
    /// the ledger history can be replayed from the log alone.
    pub detail: Option<Json>,

    pub notes: Option<String>,

    /// Network address the action originated from, when the caller knows it.
    pub origin_ip: Option<String>,

    pub created_at: DateTime<Utc>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_round_trip() {
        for action in [
            TransferAction::TransferInitiated,
            TransferAction::TransferDispatched,
            TransferAction::ItemReceived,
            TransferAction::ItemDisposed,
            TransferAction::ItemReturned,
            TransferAction::StatusChanged,
            TransferAction::ReturnDispatched,
            TransferAction::TransferCancelled,
        ] {
            assert_eq!(TransferAction::from_str(action.as_str()), Some(action));
        }
        assert_eq!(TransferAction::from_str("unknown"), None);
    }
}

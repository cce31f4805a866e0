use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use tracing::error;
use uuid::Uuid;

use crate::{
    entities::warehouse_transfer_log::{self, TransferAction},
    errors::ServiceError,
};

/// One audit record to append for an accepted state change.
#[derive(Debug)]
pub struct AuditEntry {
    pub transfer_id: Uuid,
    pub item_id: Option<Uuid>,
    pub action: TransferAction,
    pub actor_id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    /// Quantity deltas and totals of the action, sufficient to replay the
    /// ledger history from the log alone.
    pub detail: serde_json::Value,
    pub notes: Option<String>,
    pub origin_ip: Option<String>,
}

/// Appends one immutable log row inside the caller's transaction.
///
/// A failed insert must fail the whole operation: no state change is
/// durable without its audit record.
pub async fn append_log<C: ConnectionTrait>(
    db: &C,
    entry: AuditEntry,
) -> Result<warehouse_transfer_log::Model, ServiceError> {
    let row = warehouse_transfer_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        transfer_id: Set(entry.transfer_id),
        item_id: Set(entry.item_id),
        action: Set(entry.action.as_str().to_string()),
        actor_id: Set(entry.actor_id),
        previous_status: Set(entry.previous_status),
        new_status: Set(entry.new_status),
        detail: Set(Some(entry.detail)),
        notes: Set(entry.notes),
        origin_ip: Set(entry.origin_ip),
        created_at: Set(Utc::now()),
    };

    row.insert(db).await.map_err(|e| {
        error!(transfer_id = %entry.transfer_id, error = %e, "Failed to append transfer audit log");
        ServiceError::DatabaseError(e)
    })
}

/// Guard shared by every mutating command: the caller must supply a
/// non-nil actor identity.
pub fn require_actor(actor_id: Uuid) -> Result<(), ServiceError> {
    if actor_id.is_nil() {
        return Err(ServiceError::UnauthenticatedCaller);
    }
    Ok(())
}

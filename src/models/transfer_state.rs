use crate::entities::warehouse_transfer::TransferStatus;
use crate::entities::warehouse_transfer_item::TransferItemStatus;
use crate::models::quantity_ledger::ItemQuantities;

/// Derives the transfer-level status from its items' statuses.
///
/// Only meaningful for a dispatched transfer; `initiated`, `cancelled` and
/// `returned` are set by explicit top-level actions, never by derivation.
/// Re-deriving from the same item statuses always yields the same result.
pub fn derive_status(items: &[TransferItemStatus]) -> TransferStatus {
    if items.is_empty() || items.iter().any(|s| *s == TransferItemStatus::Pending) {
        return TransferStatus::InTransit;
    }
    if items.iter().all(|s| *s == TransferItemStatus::Accepted) {
        return TransferStatus::Received;
    }
    if items.iter().all(|s| is_rejected_outcome(*s)) {
        return TransferStatus::Rejected;
    }
    TransferStatus::PartialReceived
}

/// Statuses reached by rejecting the full line, including its follow-ups.
fn is_rejected_outcome(status: TransferItemStatus) -> bool {
    matches!(
        status,
        TransferItemStatus::Rejected | TransferItemStatus::Disposed | TransferItemStatus::Returned
    )
}

/// Cancellation is only legal before any receipt activity.
pub fn can_cancel(status: TransferStatus, items: &[TransferItemStatus]) -> bool {
    matches!(status, TransferStatus::Initiated | TransferStatus::InTransit)
        && items.iter().all(|s| *s == TransferItemStatus::Pending)
}

/// Whether the return leg may be dispatched: every rejected unit that was
/// not disposed has been marked returned, and at least one unit is going
/// back to the source warehouse.
pub fn return_leg_complete(quantities: &[ItemQuantities]) -> bool {
    let mut returned_total = 0;
    for q in quantities {
        if q.returned != q.rejected - q.disposed {
            return false;
        }
        returned_total += q.returned;
    }
    returned_total > 0
}

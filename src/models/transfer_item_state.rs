use thiserror::Error;

use crate::entities::warehouse_transfer_item::TransferItemStatus;
use crate::models::quantity_ledger::{ConservationBreach, ItemQuantities};

/// An action applied to a single transfer line at or after receipt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    /// Record units received and/or rejected at the target warehouse.
    Receive {
        received_delta: i32,
        rejected_delta: i32,
    },
    /// Dispose rejected units. `quantity` of `None` disposes the whole
    /// rejected remainder.
    Dispose { quantity: Option<i32> },
    /// Mark rejected units as returned to the source warehouse. `quantity`
    /// of `None` returns the whole rejected remainder.
    Return { quantity: Option<i32> },
}

/// Failure of an item action. The caller decides which error kind this maps
/// to at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemActionError {
    #[error("{0}")]
    Transition(String),

    #[error(transparent)]
    Conservation(#[from] ConservationBreach),

    #[error("{0}")]
    Input(String),
}

/// Applies `action` to an item snapshot, returning the post-action
/// quantities and status.
///
/// Pure with respect to its inputs: on any failure the caller's snapshot is
/// untouched and no partial change is observable.
pub fn apply(
    status: TransferItemStatus,
    quantities: ItemQuantities,
    action: &ItemAction,
) -> Result<(ItemQuantities, TransferItemStatus), ItemActionError> {
    match *action {
        ItemAction::Receive {
            received_delta,
            rejected_delta,
        } => apply_receipt(status, quantities, received_delta, rejected_delta),
        ItemAction::Dispose { quantity } => apply_disposal(status, quantities, quantity),
        ItemAction::Return { quantity } => apply_return(status, quantities, quantity),
    }
}

fn apply_receipt(
    status: TransferItemStatus,
    quantities: ItemQuantities,
    received_delta: i32,
    rejected_delta: i32,
) -> Result<(ItemQuantities, TransferItemStatus), ItemActionError> {
    if received_delta < 0 || rejected_delta < 0 {
        return Err(ItemActionError::Input(
            "receipt deltas must not be negative".into(),
        ));
    }
    if received_delta == 0 && rejected_delta == 0 {
        return Err(ItemActionError::Input(
            "receipt action must account for at least one unit".into(),
        ));
    }
    match status {
        TransferItemStatus::Pending | TransferItemStatus::PartialAccepted => {}
        other => {
            return Err(ItemActionError::Transition(format!(
                "cannot receive against an item in status {}",
                other
            )));
        }
    }

    let next = ItemQuantities {
        received: quantities.received + received_delta,
        rejected: quantities.rejected + rejected_delta,
        ..quantities
    };
    next.check()?;

    Ok((next, receipt_status(&next)))
}

/// Item status implied by post-receipt totals. Conservation guarantees that
/// a fully received line has nothing rejected and vice versa.
fn receipt_status(quantities: &ItemQuantities) -> TransferItemStatus {
    if quantities.received == quantities.sent {
        TransferItemStatus::Accepted
    } else if quantities.rejected == quantities.sent {
        TransferItemStatus::Rejected
    } else {
        TransferItemStatus::PartialAccepted
    }
}

fn apply_disposal(
    status: TransferItemStatus,
    quantities: ItemQuantities,
    quantity: Option<i32>,
) -> Result<(ItemQuantities, TransferItemStatus), ItemActionError> {
    match status {
        TransferItemStatus::Rejected | TransferItemStatus::PartialAccepted => {}
        other => {
            return Err(ItemActionError::Transition(format!(
                "cannot dispose units of an item in status {}",
                other
            )));
        }
    }

    let delta = match quantity {
        Some(n) if n <= 0 => {
            return Err(ItemActionError::Input(
                "disposal quantity must be positive".into(),
            ));
        }
        Some(n) => n,
        None => {
            let remainder = quantities.rejected_remainder();
            if remainder <= 0 {
                return Err(ItemActionError::Transition(
                    "no rejected quantity remaining to dispose".into(),
                ));
            }
            remainder
        }
    };

    let next = ItemQuantities {
        disposed: quantities.disposed + delta,
        ..quantities
    };
    next.check()?;

    // A fully rejected line whose rejected units are all disposed is done.
    let next_status = if next.rejected == next.sent && next.disposed == next.rejected {
        TransferItemStatus::Disposed
    } else {
        status
    };

    Ok((next, next_status))
}

fn apply_return(
    status: TransferItemStatus,
    quantities: ItemQuantities,
    quantity: Option<i32>,
) -> Result<(ItemQuantities, TransferItemStatus), ItemActionError> {
    match status {
        TransferItemStatus::Rejected | TransferItemStatus::PartialAccepted => {}
        other => {
            return Err(ItemActionError::Transition(format!(
                "cannot return units of an item in status {}",
                other
            )));
        }
    }
    if quantities.rejected_remainder() <= 0 {
        return Err(ItemActionError::Transition(
            "no rejected quantity remaining to return".into(),
        ));
    }

    let delta = match quantity {
        Some(n) if n <= 0 => {
            return Err(ItemActionError::Input(
                "return quantity must be positive".into(),
            ));
        }
        Some(n) => n,
        None => quantities.rejected_remainder(),
    };

    let next = ItemQuantities {
        returned: quantities.returned + delta,
        ..quantities
    };
    next.check()?;

    let next_status = if next.rejected == next.sent && next.returned == next.rejected {
        TransferItemStatus::Returned
    } else {
        status
    };

    Ok((next, next_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn pending(sent: i32) -> ItemQuantities {
        ItemQuantities {
            sent,
            ..Default::default()
        }
    }

    #[test]
    fn full_receipt_accepts_the_item() {
        let (q, status) = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 10,
                rejected_delta: 0,
            },
        )
        .unwrap();
        assert_eq!(status, TransferItemStatus::Accepted);
        assert_eq!(q.received, 10);
        assert_eq!(q.outstanding(), 0);
    }

    #[test]
    fn full_rejection_rejects_the_item() {
        let (q, status) = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 0,
                rejected_delta: 10,
            },
        )
        .unwrap();
        assert_eq!(status, TransferItemStatus::Rejected);
        assert_eq!(q.rejected, 10);
    }

    #[test]
    fn split_receipt_is_partial() {
        let (q, status) = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 6,
                rejected_delta: 4,
            },
        )
        .unwrap();
        assert_eq!(status, TransferItemStatus::PartialAccepted);
        assert_eq!(q.outstanding(), 0);
    }

    #[test]
    fn short_receipt_is_partial_with_outstanding() {
        let (q, status) = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 6,
                rejected_delta: 0,
            },
        )
        .unwrap();
        assert_eq!(status, TransferItemStatus::PartialAccepted);
        assert_eq!(q.outstanding(), 4);
    }

    #[test]
    fn second_receipt_completes_a_partial_line() {
        let first = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 6,
                rejected_delta: 0,
            },
        )
        .unwrap();
        let (q, status) = apply(
            first.1,
            first.0,
            &ItemAction::Receive {
                received_delta: 4,
                rejected_delta: 0,
            },
        )
        .unwrap();
        assert_eq!(status, TransferItemStatus::Accepted);
        assert_eq!(q.received, 10);
    }

    #[test]
    fn over_receipt_fails_conservation_and_changes_nothing() {
        let err = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 11,
                rejected_delta: 0,
            },
        )
        .unwrap_err();
        assert_matches!(err, ItemActionError::Conservation(_));
    }

    #[test]
    fn zero_deltas_are_refused() {
        let err = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Receive {
                received_delta: 0,
                rejected_delta: 0,
            },
        )
        .unwrap_err();
        assert_matches!(err, ItemActionError::Input(_));
    }

    #[test]
    fn receipt_against_terminal_item_is_refused() {
        let q = ItemQuantities {
            sent: 10,
            received: 10,
            ..Default::default()
        };
        let err = apply(
            TransferItemStatus::Accepted,
            q,
            &ItemAction::Receive {
                received_delta: 1,
                rejected_delta: 0,
            },
        )
        .unwrap_err();
        assert_matches!(err, ItemActionError::Transition(_));
    }

    #[test]
    fn implicit_disposal_consumes_the_rejected_remainder() {
        let q = ItemQuantities {
            sent: 10,
            received: 6,
            rejected: 4,
            ..Default::default()
        };
        let (q, status) =
            apply(TransferItemStatus::PartialAccepted, q, &ItemAction::Dispose { quantity: None })
                .unwrap();
        assert_eq!(q.disposed, 4);
        // A partially accepted line stays partially accepted.
        assert_eq!(status, TransferItemStatus::PartialAccepted);
    }

    #[test]
    fn disposal_beyond_rejected_fails_conservation() {
        let q = ItemQuantities {
            sent: 10,
            received: 6,
            rejected: 4,
            disposed: 4,
            ..Default::default()
        };
        let err = apply(
            TransferItemStatus::PartialAccepted,
            q,
            &ItemAction::Dispose { quantity: Some(1) },
        )
        .unwrap_err();
        assert_matches!(
            err,
            ItemActionError::Conservation(ConservationBreach::DisposedOverRejected { .. })
        );
    }

    #[test]
    fn disposing_all_rejected_units_of_a_rejected_line_is_terminal() {
        let q = ItemQuantities {
            sent: 10,
            rejected: 10,
            ..Default::default()
        };
        let (q, status) =
            apply(TransferItemStatus::Rejected, q, &ItemAction::Dispose { quantity: None })
                .unwrap();
        assert_eq!(q.disposed, 10);
        assert_eq!(status, TransferItemStatus::Disposed);
    }

    #[test]
    fn returning_all_rejected_units_of_a_rejected_line_is_terminal() {
        let q = ItemQuantities {
            sent: 10,
            rejected: 10,
            ..Default::default()
        };
        let (q, status) =
            apply(TransferItemStatus::Rejected, q, &ItemAction::Return { quantity: None })
                .unwrap();
        assert_eq!(q.returned, 10);
        assert_eq!(status, TransferItemStatus::Returned);
    }

    #[test]
    fn mixed_disposal_and_return_split_the_rejected_quantity() {
        let q = ItemQuantities {
            sent: 10,
            rejected: 10,
            ..Default::default()
        };
        let (q, status) =
            apply(TransferItemStatus::Rejected, q, &ItemAction::Dispose { quantity: Some(4) })
                .unwrap();
        assert_eq!(status, TransferItemStatus::Rejected);
        let (q, status) = apply(status, q, &ItemAction::Return { quantity: None }).unwrap();
        assert_eq!(q.disposed, 4);
        assert_eq!(q.returned, 6);
        assert_eq!(q.rejected_remainder(), 0);
        // Mixed split: neither disposal nor return covers the full rejection.
        assert_eq!(status, TransferItemStatus::Rejected);
    }

    #[test]
    fn return_requires_a_rejected_remainder() {
        let q = ItemQuantities {
            sent: 10,
            rejected: 10,
            disposed: 10,
            ..Default::default()
        };
        let err = apply(TransferItemStatus::Rejected, q, &ItemAction::Return { quantity: None })
            .unwrap_err();
        assert_matches!(err, ItemActionError::Transition(_));
    }

    #[test]
    fn return_beyond_undisposed_remainder_fails_conservation() {
        let q = ItemQuantities {
            sent: 10,
            rejected: 10,
            disposed: 6,
            ..Default::default()
        };
        let err = apply(
            TransferItemStatus::Rejected,
            q,
            &ItemAction::Return { quantity: Some(5) },
        )
        .unwrap_err();
        assert_matches!(
            err,
            ItemActionError::Conservation(ConservationBreach::ReturnedOverRejectedRemainder { .. })
        );
    }

    #[test]
    fn disposal_of_a_pending_item_is_refused() {
        let err = apply(
            TransferItemStatus::Pending,
            pending(10),
            &ItemAction::Dispose { quantity: None },
        )
        .unwrap_err();
        assert_matches!(err, ItemActionError::Transition(_));
    }
}

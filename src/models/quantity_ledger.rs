use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot of the quantity fields of a single transfer line.
///
/// All fields are unit counts; `sent` is fixed when the line is created and
/// the remaining fields only ever grow through receipt-time actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantities {
    pub sent: i32,
    pub received: i32,
    pub rejected: i32,
    pub disposed: i32,
    pub returned: i32,
}

/// A conservation inequality that a candidate snapshot failed.
///
/// Each variant names the specific inequality and carries the values that
/// broke it, so callers can report exactly what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConservationBreach {
    #[error(
        "quantity_received ({received}) + quantity_rejected ({rejected}) exceeds quantity_sent ({sent})"
    )]
    ReceivedPlusRejectedOverSent {
        sent: i32,
        received: i32,
        rejected: i32,
    },

    #[error("quantity_disposed ({disposed}) exceeds quantity_rejected ({rejected})")]
    DisposedOverRejected { rejected: i32, disposed: i32 },

    #[error(
        "quantity_returned ({returned}) exceeds quantity_rejected ({rejected}) minus quantity_disposed ({disposed})"
    )]
    ReturnedOverRejectedRemainder {
        rejected: i32,
        disposed: i32,
        returned: i32,
    },

    #[error("{field} must not be negative")]
    NegativeQuantity { field: &'static str },
}

impl ItemQuantities {
    /// Units not yet accounted for: still in transit or unresolved.
    pub fn outstanding(&self) -> i32 {
        self.sent - self.received - self.rejected
    }

    /// Rejected units that have not yet been disposed or returned.
    pub fn rejected_remainder(&self) -> i32 {
        self.rejected - self.disposed - self.returned
    }

    /// Verifies the conservation inequalities against this snapshot.
    ///
    /// Intended to be called on the candidate *post-mutation* snapshot before
    /// any change is committed; a breach means the mutation must be refused
    /// with no change applied.
    pub fn check(&self) -> Result<(), ConservationBreach> {
        for (field, value) in [
            ("quantity_sent", self.sent),
            ("quantity_received", self.received),
            ("quantity_rejected", self.rejected),
            ("quantity_disposed", self.disposed),
            ("quantity_returned", self.returned),
        ] {
            if value < 0 {
                return Err(ConservationBreach::NegativeQuantity { field });
            }
        }

        if self.received + self.rejected > self.sent {
            return Err(ConservationBreach::ReceivedPlusRejectedOverSent {
                sent: self.sent,
                received: self.received,
                rejected: self.rejected,
            });
        }

        if self.disposed > self.rejected {
            return Err(ConservationBreach::DisposedOverRejected {
                rejected: self.rejected,
                disposed: self.disposed,
            });
        }

        if self.returned > self.rejected - self.disposed {
            return Err(ConservationBreach::ReturnedOverRejectedRemainder {
                rejected: self.rejected,
                disposed: self.disposed,
                returned: self.returned,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn quantities(sent: i32, received: i32, rejected: i32, disposed: i32, returned: i32) -> ItemQuantities {
        ItemQuantities {
            sent,
            received,
            rejected,
            disposed,
            returned,
        }
    }

    #[test]
    fn fresh_line_passes() {
        assert!(quantities(10, 0, 0, 0, 0).check().is_ok());
    }

    #[test]
    fn fully_accounted_line_passes() {
        assert!(quantities(10, 6, 4, 2, 2).check().is_ok());
    }

    #[test]
    fn over_receipt_names_first_inequality() {
        assert_matches!(
            quantities(10, 8, 4, 0, 0).check(),
            Err(ConservationBreach::ReceivedPlusRejectedOverSent {
                sent: 10,
                received: 8,
                rejected: 4
            })
        );
    }

    #[test]
    fn over_disposal_names_second_inequality() {
        assert_matches!(
            quantities(10, 6, 4, 5, 0).check(),
            Err(ConservationBreach::DisposedOverRejected {
                rejected: 4,
                disposed: 5
            })
        );
    }

    #[test]
    fn over_return_names_third_inequality() {
        // 4 rejected, 2 disposed: at most 2 may be returned.
        assert_matches!(
            quantities(10, 6, 4, 2, 3).check(),
            Err(ConservationBreach::ReturnedOverRejectedRemainder {
                rejected: 4,
                disposed: 2,
                returned: 3
            })
        );
    }

    #[test]
    fn negative_quantity_is_refused() {
        assert_matches!(
            quantities(10, -1, 0, 0, 0).check(),
            Err(ConservationBreach::NegativeQuantity {
                field: "quantity_received"
            })
        );
    }

    #[test]
    fn outstanding_is_the_unaccounted_remainder() {
        assert_eq!(quantities(10, 6, 3, 0, 0).outstanding(), 1);
        assert_eq!(quantities(10, 10, 0, 0, 0).outstanding(), 0);
    }

    #[test]
    fn rejected_remainder_nets_out_disposal_and_return() {
        assert_eq!(quantities(10, 0, 10, 3, 2).rejected_remainder(), 5);
    }
}

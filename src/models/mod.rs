//! Pure domain logic for the transfer workflow.
//!
//! Everything in this module is side-effect free: functions take snapshots
//! and actions and return new snapshots or typed failures. Persistence and
//! transactional concerns live in the command layer.

pub mod quantity_ledger;
pub mod transfer_item_state;
pub mod transfer_state;

pub use quantity_ledger::{ConservationBreach, ItemQuantities};
pub use transfer_item_state::{ItemAction, ItemActionError};

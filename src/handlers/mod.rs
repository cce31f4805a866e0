pub mod health;
pub mod transfers;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transfers: Arc<crate::services::transfers::TransferService>,
}

impl AppServices {
    /// Build the services container from shared infrastructure handles.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            transfers: Arc::new(crate::services::transfers::TransferService::new(
                db_pool,
                event_sender,
            )),
        }
    }
}

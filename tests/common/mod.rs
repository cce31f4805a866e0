use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use warehouse_transfer_api::{
    commands::transfers::initiate_transfer_command::NewTransferItem,
    db::{self, DbConfig, DbPool},
    events::{process_events, EventSender},
    services::transfers::TransferService,
};

/// Spins up an isolated in-memory database with migrations applied and a
/// transfer service wired to a drained event channel.
///
/// The pool is capped at one connection: each SQLite `:memory:` connection
/// is its own database, so a larger pool would scatter state.
pub async fn setup_service() -> (TransferService, Arc<DbPool>) {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&config)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");
    let pool = Arc::new(pool);

    let (tx, rx) = mpsc::channel(64);
    let sender = Arc::new(EventSender::new(tx));
    tokio::spawn(process_events(rx));

    (TransferService::new(pool.clone(), sender), pool)
}

pub fn line(product_id: Uuid, quantity_sent: i32) -> NewTransferItem {
    NewTransferItem {
        product_id,
        quantity_sent,
        batch_number: None,
        expiry_date: None,
        unit_price: None,
        currency_code: None,
    }
}

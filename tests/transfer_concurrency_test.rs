//! Optimistic-concurrency behavior: a writer holding a stale snapshot must
//! be refused instead of silently overwriting a committed change.

mod common;

use assert_matches::assert_matches;
use common::{line, setup_service};
use uuid::Uuid;

use warehouse_transfer_api::{
    commands::transfers::{
        receive_transfer_items_command::ItemReceipt, DispatchTransferCommand,
        DisposeRejectedItemCommand, InitiateTransferCommand, ReceiveTransferItemsCommand,
    },
    entities::warehouse_transfer::TransferStatus,
    errors::ServiceError,
};

fn receipt(item_id: Uuid, received: i32, rejected: i32) -> ItemReceipt {
    ItemReceipt {
        item_id,
        quantity_received: received,
        quantity_rejected: rejected,
        rejection_reason: None,
        condition_notes: None,
    }
}

#[tokio::test]
async fn stale_receipt_batch_is_refused() {
    let (service, _pool) = setup_service().await;
    let actor = Uuid::new_v4();

    let created = service
        .initiate_transfer(InitiateTransferCommand {
            source_warehouse_id: Uuid::new_v4(),
            target_warehouse_id: Uuid::new_v4(),
            items: vec![line(Uuid::new_v4(), 10), line(Uuid::new_v4(), 5)],
            actor_id: actor,
            origin_ip: None,
        })
        .await
        .expect("initiate");
    let dispatched = service
        .dispatch_transfer(DispatchTransferCommand {
            transfer_id: created.transfer.id,
            courier_name: "ACME Freight".to_string(),
            tracking_number: None,
            expected_delivery_date: None,
            actor_id: actor,
            version: created.transfer.version,
            origin_ip: None,
        })
        .await
        .expect("dispatch");
    let snapshot_version = dispatched.transfer.version;

    // First writer lands on the snapshot it read.
    let first = service
        .receive_items(ReceiveTransferItemsCommand {
            transfer_id: created.transfer.id,
            actions: vec![receipt(created.items[0].id, 10, 0)],
            actor_id: actor,
            notes: None,
            version: snapshot_version,
            origin_ip: None,
        })
        .await
        .expect("first receipt");
    assert_eq!(first.transfer.status, TransferStatus::InTransit);

    // Second writer still holds the pre-receipt snapshot and must lose.
    let err = service
        .receive_items(ReceiveTransferItemsCommand {
            transfer_id: created.transfer.id,
            actions: vec![receipt(created.items[1].id, 5, 0)],
            actor_id: actor,
            notes: None,
            version: snapshot_version,
            origin_ip: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConcurrentModification(_));

    // Re-reading the current version lets the caller resubmit.
    let resubmitted = service
        .receive_items(ReceiveTransferItemsCommand {
            transfer_id: created.transfer.id,
            actions: vec![receipt(created.items[1].id, 5, 0)],
            actor_id: actor,
            notes: None,
            version: first.transfer.version,
            origin_ip: None,
        })
        .await
        .expect("resubmitted receipt");
    assert_eq!(resubmitted.transfer.status, TransferStatus::Received);
}

#[tokio::test]
async fn stale_item_disposal_is_refused() {
    let (service, _pool) = setup_service().await;
    let actor = Uuid::new_v4();

    let created = service
        .initiate_transfer(InitiateTransferCommand {
            source_warehouse_id: Uuid::new_v4(),
            target_warehouse_id: Uuid::new_v4(),
            items: vec![line(Uuid::new_v4(), 10)],
            actor_id: actor,
            origin_ip: None,
        })
        .await
        .expect("initiate");
    let dispatched = service
        .dispatch_transfer(DispatchTransferCommand {
            transfer_id: created.transfer.id,
            courier_name: "ACME Freight".to_string(),
            tracking_number: None,
            expected_delivery_date: None,
            actor_id: actor,
            version: created.transfer.version,
            origin_ip: None,
        })
        .await
        .expect("dispatch");
    let received = service
        .receive_items(ReceiveTransferItemsCommand {
            transfer_id: created.transfer.id,
            actions: vec![receipt(created.items[0].id, 6, 4)],
            actor_id: actor,
            notes: None,
            version: dispatched.transfer.version,
            origin_ip: None,
        })
        .await
        .expect("receive");
    let item = &received.items[0];

    // Dispose 2 units at the current item version.
    let disposed = service
        .dispose_rejected_item(DisposeRejectedItemCommand {
            item_id: item.id,
            quantity: Some(2),
            reason: "water damage".to_string(),
            actor_id: actor,
            version: item.version,
            origin_ip: None,
        })
        .await
        .expect("dispose");

    // A second disposal using the pre-disposal version must be refused,
    // even though 2 more units would still fit the rejected quantity.
    let err = service
        .dispose_rejected_item(DisposeRejectedItemCommand {
            item_id: item.id,
            quantity: Some(2),
            reason: "water damage".to_string(),
            actor_id: actor,
            version: item.version,
            origin_ip: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConcurrentModification(_));

    assert_eq!(disposed.item.quantity_disposed, 2);
}

// This test is ignored by default because it needs a multi-connection
// database; SQLite in-memory pools cannot race two real writers.
// Run with: DATABASE_URL=postgres://... cargo test -- --ignored concurrent_writers
#[tokio::test]
#[ignore = "requires a PostgreSQL integration environment"]
async fn concurrent_writers_produce_exactly_one_success() {
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use warehouse_transfer_api::{
        db,
        events::{process_events, EventSender},
        services::transfers::TransferService,
    };

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at PostgreSQL");
    let pool = db::establish_connection(&url).await.expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");
    let pool = Arc::new(pool);

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(process_events(rx));
    let service = TransferService::new(pool.clone(), Arc::new(EventSender::new(tx)));

    let actor = Uuid::new_v4();
    let created = service
        .initiate_transfer(InitiateTransferCommand {
            source_warehouse_id: Uuid::new_v4(),
            target_warehouse_id: Uuid::new_v4(),
            items: vec![line(Uuid::new_v4(), 10)],
            actor_id: actor,
            origin_ip: None,
        })
        .await
        .expect("initiate");
    let dispatched = service
        .dispatch_transfer(DispatchTransferCommand {
            transfer_id: created.transfer.id,
            courier_name: "ACME Freight".to_string(),
            tracking_number: None,
            expected_delivery_date: None,
            actor_id: actor,
            version: created.transfer.version,
            origin_ip: None,
        })
        .await
        .expect("dispatch");

    // Both writers read the same snapshot and race.
    let mut tasks = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let transfer_id = created.transfer.id;
        let item_id = created.items[0].id;
        let version = dispatched.transfer.version;
        tasks.push(tokio::spawn(async move {
            service
                .receive_items(ReceiveTransferItemsCommand {
                    transfer_id,
                    actions: vec![receipt(item_id, 10, 0)],
                    actor_id: Uuid::new_v4(),
                    notes: None,
                    version,
                    origin_ip: None,
                })
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }
    assert_eq!(
        successes, 1,
        "exactly one concurrent receipt should succeed; got {}",
        successes
    );
}

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Transfer-lifecycle events emitted after each committed status change.
///
/// Delivery is fire-and-forget: a subscriber that fails to keep up never
/// rolls back the transaction the event describes. The audit log, not this
/// stream, is the durable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransferInitiated {
        transfer_id: Uuid,
        transfer_number: String,
        actor_id: Uuid,
    },
    TransferDispatched(Uuid),
    TransferCancelled(Uuid),
    TransferReturnDispatched(Uuid),
    TransferStatusChanged {
        transfer_id: Uuid,
        previous_status: String,
        new_status: String,
        actor_id: Uuid,
    },
    TransferItemStatusChanged {
        transfer_id: Uuid,
        item_id: Uuid,
        previous_status: String,
        new_status: String,
        actor_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Default event consumer: drains the channel and logs each event.
///
/// External notifiers (email, dashboards) plug in by replacing this task
/// with their own receiver loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "transfer lifecycle event");
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::TransferDispatched(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::TransferDispatched(_)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::TransferCancelled(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}

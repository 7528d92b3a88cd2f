use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain events emitted by the order pipeline. Consumed by a logging task
/// today; reporting/notification collaborators can subscribe later without
/// touching the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: String,
    },
    OrderUpdated {
        order_id: String,
    },
    OrderStatusChanged {
        order_id: String,
        old_status: String,
        new_status: String,
    },
    OrderDeleted {
        order_id: String,
    },
    OrderRated {
        order_id: String,
        rating: i32,
    },
    PaymentPushSent {
        order_id: String,
    },
    PaymentFailed {
        order_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Sends an event, logging instead of failing the caller. Event
    /// delivery is best-effort; the order write has already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Failed to publish event");
        }
    }
}

/// Drains the event channel, logging each event with structured fields.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = ?event, "domain event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_does_not_fail_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sender = EventSender::new(tx);
        sender
            .send_or_log(Event::OrderCreated {
                order_id: "ORD-1".into(),
            })
            .await;
    }

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::PaymentPushSent {
                order_id: "ORD-2".into(),
            })
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::PaymentPushSent { order_id }) => assert_eq!(order_id, "ORD-2"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

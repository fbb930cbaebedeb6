//! Domain event publishing.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

/// Publishes aggregate events to NATS when a client is configured.
/// Publishing is best-effort and never fails the operation that raised the events.
#[derive(Clone, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client: Some(client) }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.client else {
            debug!(count = events.len(), "event publishing disabled, dropping events");
            return;
        };
        for event in events {
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    warn!(subject = event.subject(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                warn!(subject = event.subject(), error = %e, "failed to publish event");
            }
        }
    }
}

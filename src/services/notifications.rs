//! Order confirmation messages.
//!
//! Dispatch is best-effort: every outcome is reported back as a
//! [`NotificationState`] and nothing here can fail the order it describes.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::aggregates::{FulfillmentDetails, NotificationState, Order};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Delivers rendered messages to their recipient.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl MessageTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        info!(to = %message.to, subject = %message.subject, "outbound email (log transport)\n{}", message.body);
        Ok(())
    }
}

/// Hands messages to a mailer service listening on a NATS subject.
pub struct NatsMailTransport {
    client: async_nats::Client,
    subject: String,
}

impl NatsMailTransport {
    pub const DEFAULT_SUBJECT: &'static str = "mail.outbound";

    pub fn new(client: async_nats::Client) -> Self {
        Self { client, subject: Self::DEFAULT_SUBJECT.to_string() }
    }
}

#[async_trait]
impl MessageTransport for NatsMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(message).map_err(|e| TransportError::Rejected(e.to_string()))?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        self.client.flush().await.map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

/// Renders the confirmation message for a placed order.
#[derive(Debug, Clone)]
pub struct ConfirmationTemplate {
    pub shop_name: String,
    pub collection_location: String,
    pub site_url: String,
}

impl ConfirmationTemplate {
    pub fn detail_url(&self, order: &Order) -> String {
        format!("{}/api/v1/orders/{}", self.site_url.trim_end_matches('/'), order.order_number())
    }

    pub fn render(&self, order: &Order) -> EmailMessage {
        let mut body = String::new();
        let _ = writeln!(body, "Dear {},", order.contact().display_name());
        let _ = writeln!(body);
        let _ = writeln!(body, "Thank you for your order with {}!", self.shop_name);
        let _ = writeln!(body);
        let _ = writeln!(body, "Order number: {}", order.order_number());
        for item in order.items() {
            let _ = writeln!(body, "  {} x {} @ {} = {}", item.quantity(), item.name(), item.unit_price(), item.line_total());
        }
        let _ = writeln!(body, "Subtotal: {}", order.subtotal());
        let _ = writeln!(body, "Delivery: {}", order.delivery_fee());
        let _ = writeln!(body, "Total: {}", order.total());
        let _ = writeln!(body);
        match order.fulfillment() {
            FulfillmentDetails::Collection { date, time } => {
                let _ = write!(body, "Collection from {} on {}", self.collection_location, date.format("%A %-d %B %Y"));
                if let Some(time) = time { let _ = write!(body, " at {time}"); }
                let _ = writeln!(body);
            }
            FulfillmentDetails::Delivery { address, city, postcode, date, time } => {
                let _ = writeln!(body, "Delivery to {address}, {city}, {postcode} on {} ({time})", date.format("%A %-d %B %Y"));
            }
        }
        if !order.special_instructions().is_empty() {
            let _ = writeln!(body, "Special instructions: {}", order.special_instructions());
        }
        let _ = writeln!(body);
        let _ = writeln!(body, "View your order: {}", self.detail_url(order));
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", self.shop_name);

        EmailMessage {
            to: order.contact().email.clone(),
            subject: format!("Order Confirmation - {}", order.order_number()),
            body,
        }
    }
}

pub struct NotificationDispatcher {
    transport: Arc<dyn MessageTransport>,
    template: ConfirmationTemplate,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MessageTransport>, template: ConfirmationTemplate) -> Self {
        Self { transport, template }
    }

    pub fn template(&self) -> &ConfirmationTemplate {
        &self.template
    }

    #[tracing::instrument(skip_all, fields(order_number = %order.order_number()))]
    pub async fn dispatch(&self, order: &Order) -> NotificationState {
        let message = self.template.render(order);
        let outcome = match tokio::time::timeout(SEND_TIMEOUT, self.transport.send(&message)).await {
            Ok(Ok(())) => return NotificationState::delivered(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no response from transport within {}s", SEND_TIMEOUT.as_secs()),
        };
        warn!(recipient = %message.to, error = %outcome, "confirmation email not sent; resend manually");
        NotificationState::failed(outcome)
    }
}

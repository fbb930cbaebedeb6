//! Domain events
use crate::domain::aggregates::order::{FulfillmentType, OrderStatus};
use crate::domain::value_objects::{Money, OrderNumber};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_number: OrderNumber, fulfillment: FulfillmentType, total: Money, item_count: u32 },
    StatusChanged { order_number: OrderNumber, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Order(OrderEvent::Placed { .. }) => "orders.placed",
            DomainEvent::Order(OrderEvent::StatusChanged { to: OrderStatus::Cancelled, .. }) => "orders.cancelled",
            DomainEvent::Order(OrderEvent::StatusChanged { .. }) => "orders.status_changed",
        }
    }
}

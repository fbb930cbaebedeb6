//! Order Aggregate
//!
//! An order is assembled once, with its line items, from price snapshots taken
//! at checkout. After that it only moves through the status machine or has its
//! totals recomputed from the same snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::AccountId;
use crate::domain::value_objects::{Money, OrderNumber, Quantity};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    account_id: Option<AccountId>,
    contact: Contact,
    fulfillment: FulfillmentDetails,
    status: OrderStatus,
    kind: OrderKind,
    items: Vec<OrderItem>,
    subtotal: Money,
    delivery_fee: Money,
    total: Money,
    special_instructions: String,
    #[serde(flatten)]
    notification: NotificationState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact { pub name: String, pub email: String, pub phone: String }

impl Contact {
    /// Name used to greet the customer.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { "Valued Customer" } else { name }
    }
}

/// Scheduling details; exactly one variant's fields exist for an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FulfillmentDetails {
    Collection { date: NaiveDate, time: Option<String> },
    Delivery { address: String, city: String, postcode: String, date: NaiveDate, time: String },
}

impl FulfillmentDetails {
    pub fn kind(&self) -> FulfillmentType {
        match self { Self::Collection { .. } => FulfillmentType::Collection, Self::Delivery { .. } => FulfillmentType::Delivery }
    }
    pub fn date(&self) -> NaiveDate {
        match self { Self::Collection { date, .. } | Self::Delivery { date, .. } => *date }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType { Collection, Delivery }

impl FulfillmentType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Collection => "collection", Self::Delivery => "delivery" }
    }
}

impl FromStr for FulfillmentType {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collection" => Ok(Self::Collection),
            "delivery" => Ok(Self::Delivery),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Preparing, Ready, Completed, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Preparing => "preparing",
            Self::Ready => "ready", Self::Completed => "completed", Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }

    /// The one forward step out of this state.
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match next {
            Self::Cancelled => !self.is_terminal(),
            _ => self.successor() == Some(next),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind { SingleItem, MultipleItems }

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::SingleItem => "single_item", Self::MultipleItems => "multiple_items" }
    }
    fn of(items: &[OrderItem]) -> Self {
        match items {
            [only] if only.quantity.value() == 1 => Self::SingleItem,
            _ => Self::MultipleItems,
        }
    }
}

impl FromStr for OrderKind {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_item" => Ok(Self::SingleItem),
            "multiple_items" => Ok(Self::MultipleItems),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

/// Outcome of the confirmation message, kept on the order so failures can be found and resent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    pub notified: bool,
    pub notification_error: Option<String>,
}

impl NotificationState {
    pub fn delivered() -> Self { Self { notified: true, notification_error: None } }
    pub fn failed(reason: impl Into<String>) -> Self { Self { notified: false, notification_error: Some(reason.into()) } }
}

/// A line item. Name and unit price are snapshots taken when the order was placed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderItem {
    id: Uuid,
    product_id: Option<Uuid>,
    name: String,
    unit_price: Money,
    quantity: Quantity,
    line_total: Money,
}

impl OrderItem {
    pub fn snapshot(product_id: Option<Uuid>, name: impl Into<String>, unit_price: Money, quantity: Quantity) -> Result<Self, OrderError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(OrderError::MissingItemName); }
        if unit_price.is_negative() { return Err(OrderError::NegativePrice); }
        if unit_price > Money::max_unit_price() { return Err(OrderError::AmountOutOfRange); }
        let line_total = unit_price.checked_multiply(quantity).ok_or(OrderError::AmountOutOfRange)?;
        Ok(Self { id: Uuid::now_v7(), product_id, name, unit_price, quantity, line_total })
    }

    pub fn restore(id: Uuid, product_id: Option<Uuid>, name: String, unit_price: Money, quantity: Quantity, line_total: Money) -> Result<Self, OrderError> {
        if unit_price.checked_multiply(quantity) != Some(line_total) { return Err(OrderError::TotalsMismatch); }
        Ok(Self { id, product_id, name, unit_price, quantity, line_total })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn product_id(&self) -> Option<Uuid> { self.product_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn unit_price(&self) -> Money { self.unit_price }
    pub fn quantity(&self) -> Quantity { self.quantity }
    pub fn line_total(&self) -> Money { self.line_total }
}

/// Everything an order is assembled from except its number.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub account_id: Option<AccountId>,
    pub contact: Contact,
    pub fulfillment: FulfillmentDetails,
    pub items: Vec<OrderItem>,
    pub delivery_fee: Money,
    pub special_instructions: String,
}

/// Stored columns of an order, used to rebuild it.
#[derive(Clone, Debug)]
pub struct StoredOrder {
    pub id: Uuid,
    pub order_number: OrderNumber,
    pub account_id: Option<AccountId>,
    pub contact: Contact,
    pub fulfillment: FulfillmentDetails,
    pub status: OrderStatus,
    pub kind: OrderKind,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub special_instructions: String,
    pub notification: NotificationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(order_number: OrderNumber, draft: &OrderDraft) -> Result<Self, OrderError> {
        if draft.items.is_empty() { return Err(OrderError::NoItems); }
        if draft.delivery_fee.is_negative() { return Err(OrderError::NegativePrice); }
        if draft.fulfillment.kind() == FulfillmentType::Collection && draft.delivery_fee != Money::zero() {
            return Err(OrderError::FeeOnCollection);
        }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), order_number, account_id: draft.account_id, contact: draft.contact.clone(),
            fulfillment: draft.fulfillment.clone(), status: OrderStatus::Pending, kind: OrderKind::of(&draft.items),
            items: draft.items.clone(), subtotal: Money::zero(), delivery_fee: draft.delivery_fee, total: Money::zero(),
            special_instructions: draft.special_instructions.trim().to_string(), notification: NotificationState::default(),
            created_at: now, updated_at: now, events: vec![],
        };
        order.recalculate_totals()?;
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_number: order.order_number.clone(), fulfillment: order.fulfillment.kind(),
            total: order.total, item_count: order.item_count(),
        }));
        Ok(order)
    }

    pub fn restore(stored: StoredOrder) -> Result<Self, OrderError> {
        let order = Self {
            id: stored.id, order_number: stored.order_number, account_id: stored.account_id, contact: stored.contact,
            fulfillment: stored.fulfillment, status: stored.status, kind: stored.kind, items: stored.items,
            subtotal: stored.subtotal, delivery_fee: stored.delivery_fee, total: stored.total,
            special_instructions: stored.special_instructions, notification: stored.notification,
            created_at: stored.created_at, updated_at: stored.updated_at, events: vec![],
        };
        if !order.totals_reconcile() { return Err(OrderError::TotalsMismatch); }
        Ok(order)
    }

    /// Stored columns of this order, with its items.
    pub fn stored(&self) -> StoredOrder {
        StoredOrder {
            id: self.id, order_number: self.order_number.clone(), account_id: self.account_id, contact: self.contact.clone(),
            fulfillment: self.fulfillment.clone(), status: self.status, kind: self.kind, items: self.items.clone(),
            subtotal: self.subtotal, delivery_fee: self.delivery_fee, total: self.total,
            special_instructions: self.special_instructions.clone(), notification: self.notification.clone(),
            created_at: self.created_at, updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn account_id(&self) -> Option<AccountId> { self.account_id }
    pub fn contact(&self) -> &Contact { &self.contact }
    pub fn fulfillment(&self) -> &FulfillmentDetails { &self.fulfillment }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn kind(&self) -> OrderKind { self.kind }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn delivery_fee(&self) -> Money { self.delivery_fee }
    pub fn total(&self) -> Money { self.total }
    pub fn special_instructions(&self) -> &str { &self.special_instructions }
    pub fn notification(&self) -> &NotificationState { &self.notification }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn item_count(&self) -> u32 { self.items.iter().fold(0, |n, i| n.saturating_add(i.quantity.value())) }

    /// `total == subtotal + delivery_fee` and the subtotal matches the item snapshots.
    pub fn totals_reconcile(&self) -> bool {
        Money::checked_sum(self.items.iter().map(|i| i.line_total)) == Some(self.subtotal)
            && self.subtotal.checked_add(self.delivery_fee) == Some(self.total)
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(next) { return Err(OrderError::InvalidTransition { from, to: next }); }
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_number: self.order_number.clone(), from, to: next }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> { self.transition(OrderStatus::Cancelled) }

    pub fn record_notification(&mut self, outcome: NotificationState) { self.notification = outcome; self.touch(); }

    /// Recomputes totals from the item snapshots, never from the live catalog.
    pub fn recalculate_totals(&mut self) -> Result<(), OrderError> {
        let subtotal = Money::checked_sum(self.items.iter().map(|i| i.line_total)).ok_or(OrderError::AmountOutOfRange)?;
        self.total = subtotal.checked_add(self.delivery_fee).ok_or(OrderError::AmountOutOfRange)?;
        self.subtotal = subtotal;
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoItems,
    MissingItemName,
    NegativePrice,
    FeeOnCollection,
    TotalsMismatch,
    AmountOutOfRange,
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    UnknownValue(String),
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::MissingItemName => write!(f, "Item name missing"),
            Self::NegativePrice => write!(f, "Negative price"),
            Self::FeeOnCollection => write!(f, "Collection orders carry no delivery fee"),
            Self::TotalsMismatch => write!(f, "Totals do not reconcile with line items"),
            Self::AmountOutOfRange => write!(f, "Amount out of range"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
            Self::UnknownValue(v) => write!(f, "Unknown value '{v}'"),
        }
    }
}

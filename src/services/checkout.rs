//! Checkout: turns a submitted payload into a persisted order.
//!
//! Validation, price snapshots and totals happen before any write. The order
//! and its items are then written as one unit under a fresh order number,
//! regenerated on collision. Profile refresh, the confirmation message and
//! event publishing follow the commit and can only produce warnings.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{
    Contact, CustomerProfile, FulfillmentDetails, FulfillmentType, NotificationState, Order, OrderDraft, OrderItem,
    ProfileUpdate,
};
use crate::domain::value_objects::{Money, OrderNumber, Quantity};
use crate::services::events::EventPublisher;
use crate::services::notifications::{ConfirmationTemplate, NotificationDispatcher};
use crate::services::order_number::OrderNumberGenerator;
use crate::services::pricing::{fee_for, DeliveryFeePolicy};
use crate::services::Dependencies;
use crate::store::{CatalogStore, CustomerStore, OrderStore, StoreError};
use crate::{AccountId, Result, StorefrontError, ValidationFailure};

pub const DEFAULT_DELIVERY_TIME: &str = "Any time";
pub const DEFAULT_NUMBER_ATTEMPTS: u32 = 5;
pub const MAX_LINES: usize = 50;

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutRequest {
    pub fulfillment_type: String,
    pub contact: ContactDetails,
    pub items: Vec<LineRequest>,
    pub collection_date: Option<String>,
    pub collection_time: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_postcode: Option<String>,
    pub delivery_date: Option<String>,
    pub delivery_time: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactDetails {
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub name: String,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub phone: String,
}

/// One requested line: either a catalog reference or a name and price snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRequest {
    #[serde(default, alias = "product_ref")]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 { 1 }

impl LineRequest {
    pub fn catalog(product_id: Uuid, quantity: u32) -> Self {
        Self { product_id: Some(product_id), name: None, price: None, quantity: i64::from(quantity) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidLine {
    Catalog { product_id: Uuid, quantity: Quantity },
    Snapshot { name: String, unit_price: Money, quantity: Quantity },
}

/// A request that passed every field check.
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub contact: Contact,
    pub fulfillment: FulfillmentDetails,
    pub lines: Vec<ValidLine>,
    pub special_instructions: String,
}

impl ValidatedCheckout {
    fn profile_update(&self) -> ProfileUpdate {
        let mut update = ProfileUpdate { phone_number: Some(self.contact.phone.clone()), ..Default::default() };
        if let FulfillmentDetails::Delivery { address, city, postcode, .. } = &self.fulfillment {
            update.address = Some(address.clone());
            update.city = Some(city.clone());
            update.postcode = Some(postcode.clone());
        }
        update
    }
}

fn text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn required(value: &Option<String>, field: &str, failure: &mut ValidationFailure) -> Option<String> {
    let value = text(value);
    if value.is_none() {
        failure.push(field, "is required");
    }
    value
}

fn date(value: &Option<String>, field: &str, failure: &mut ValidationFailure) -> Option<NaiveDate> {
    let raw = required(value, field, failure)?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            failure.push(field, "is not a valid date (expected YYYY-MM-DD)");
            None
        }
    }
}

impl ContactDetails {
    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
        }
    }

    fn check(&self, failure: &mut ValidationFailure) {
        if self.email.is_empty() {
            failure.push("contact.email", "is required");
        }
        let Err(errors) = self.validate() else { return };
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        for (field, errs) in fields {
            if field == "email" && self.email.is_empty() {
                continue;
            }
            for e in errs {
                let message = e.message.as_ref().map_or_else(|| e.code.to_string(), |m| m.to_string());
                failure.push(format!("contact.{field}"), message);
            }
        }
    }
}

impl CheckoutRequest {
    /// Checks every field and reports all problems together.
    pub fn validated(&self) -> std::result::Result<ValidatedCheckout, ValidationFailure> {
        let mut failure = ValidationFailure::default();

        let contact = self.contact.normalized();
        contact.check(&mut failure);
        let fulfillment = self.fulfillment(&mut failure);
        let lines = self.lines(&mut failure);

        match fulfillment {
            Some(fulfillment) if failure.is_empty() => Ok(ValidatedCheckout {
                contact: Contact { name: contact.name, email: contact.email, phone: contact.phone },
                fulfillment,
                lines,
                special_instructions: text(&self.special_instructions).unwrap_or_default(),
            }),
            _ => Err(failure),
        }
    }

    fn fulfillment(&self, failure: &mut ValidationFailure) -> Option<FulfillmentDetails> {
        let kind = match self.fulfillment_type.trim() {
            "" => {
                failure.push("fulfillment_type", "is required");
                return None;
            }
            raw => match raw.parse::<FulfillmentType>() {
                Ok(kind) => kind,
                Err(_) => {
                    failure.push("fulfillment_type", "must be collection or delivery");
                    return None;
                }
            },
        };

        match kind {
            FulfillmentType::Collection => {
                let date = date(&self.collection_date, "collection_date", failure)?;
                Some(FulfillmentDetails::Collection { date, time: text(&self.collection_time) })
            }
            FulfillmentType::Delivery => {
                let address = required(&self.delivery_address, "delivery_address", failure);
                let city = required(&self.delivery_city, "delivery_city", failure);
                let postcode = required(&self.delivery_postcode, "delivery_postcode", failure);
                let date = date(&self.delivery_date, "delivery_date", failure);
                Some(FulfillmentDetails::Delivery {
                    address: address?,
                    city: city?,
                    postcode: postcode?.to_uppercase(),
                    date: date?,
                    time: text(&self.delivery_time).unwrap_or_else(|| DEFAULT_DELIVERY_TIME.to_string()),
                })
            }
        }
    }

    fn lines(&self, failure: &mut ValidationFailure) -> Vec<ValidLine> {
        if self.items.is_empty() {
            failure.push("items", "at least one item is required");
            return vec![];
        }
        if self.items.len() > MAX_LINES {
            failure.push("items", format!("at most {MAX_LINES} items are allowed per order"));
            return vec![];
        }

        let mut lines = Vec::with_capacity(self.items.len());
        for (i, line) in self.items.iter().enumerate() {
            let quantity = match line.quantity {
                q if q < 1 => {
                    failure.push(format!("items[{i}].quantity"), "must be a positive whole number");
                    None
                }
                q => {
                    let quantity = u32::try_from(q).ok().and_then(|q| Quantity::new(q).ok());
                    if quantity.is_none() {
                        failure.push(format!("items[{i}].quantity"), format!("must be at most {}", Quantity::MAX));
                    }
                    quantity
                }
            };

            if let Some(product_id) = line.product_id {
                if let Some(quantity) = quantity {
                    lines.push(ValidLine::Catalog { product_id, quantity });
                }
                continue;
            }

            let name = text(&line.name);
            if name.is_none() {
                failure.push(format!("items[{i}].name"), "is required when no product is referenced");
            }
            let price = match line.price {
                Some(p) if p > Money::max_unit_price().amount() => {
                    failure.push(format!("items[{i}].price"), format!("must be at most {}", Money::max_unit_price().amount()));
                    None
                }
                Some(p) if Money::new(p).is_positive() => Some(Money::new(p)),
                Some(_) => {
                    failure.push(format!("items[{i}].price"), "must be at least 0.01");
                    None
                }
                None => {
                    failure.push(format!("items[{i}].price"), "is required when no product is referenced");
                    None
                }
            };
            if let (Some(name), Some(unit_price), Some(quantity)) = (name, price, quantity) {
                lines.push(ValidLine::Snapshot { name, unit_price, quantity });
            }
        }
        lines
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub allow_guest_checkout: bool,
    pub max_number_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self { allow_guest_checkout: false, max_number_attempts: DEFAULT_NUMBER_ATTEMPTS }
    }
}

/// Result handed back to the caller once the order is durable.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_number: OrderNumber,
    pub total: Money,
    pub detail_url: String,
    pub notification: NotificationState,
}

pub struct CheckoutService {
    catalog: Arc<dyn CatalogStore>,
    customers: Arc<dyn CustomerStore>,
    orders: Arc<dyn OrderStore>,
    numbers: Arc<dyn OrderNumberGenerator>,
    fees: Arc<dyn DeliveryFeePolicy>,
    notifier: NotificationDispatcher,
    events: EventPublisher,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(deps: &Dependencies, template: ConfirmationTemplate, settings: CheckoutSettings) -> Self {
        Self {
            catalog: deps.stores.catalog.clone(),
            customers: deps.stores.customers.clone(),
            orders: deps.stores.orders.clone(),
            numbers: deps.numbers.clone(),
            fees: deps.fees.clone(),
            notifier: NotificationDispatcher::new(deps.transport.clone(), template),
            events: deps.events.clone(),
            settings,
        }
    }

    #[instrument(skip(self, request), fields(fulfillment = %request.fulfillment_type, items = request.items.len()))]
    pub async fn place_order(&self, account: Option<AccountId>, request: &CheckoutRequest) -> Result<PlacedOrder> {
        if account.is_none() && !self.settings.allow_guest_checkout {
            return Err(StorefrontError::Unauthenticated);
        }

        let checkout = request.validated().map_err(StorefrontError::Validation)?;
        let items = self.snapshot_items(&checkout.lines).await?;
        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let delivery_fee = fee_for(self.fees.as_ref(), &checkout.fulfillment, subtotal);

        let draft = OrderDraft {
            account_id: account,
            contact: checkout.contact.clone(),
            fulfillment: checkout.fulfillment.clone(),
            items,
            delivery_fee,
            special_instructions: checkout.special_instructions.clone(),
        };
        let mut order = self.persist(&draft).await?;
        info!(order_number = %order.order_number(), total = %order.total(), "order placed");

        if let Some(account) = account {
            self.refresh_profile(account, &checkout.profile_update()).await;
        }

        let notification = self.notifier.dispatch(&order).await;
        if let Err(e) = self.orders.record_notification(order.order_number(), &notification).await {
            warn!(order_number = %order.order_number(), error = %e, "failed to record notification outcome");
        }
        order.record_notification(notification.clone());
        self.events.publish(order.take_events()).await;

        Ok(PlacedOrder {
            order_number: order.order_number().clone(),
            total: order.total(),
            detail_url: self.notifier.template().detail_url(&order),
            notification,
        })
    }

    async fn snapshot_items(&self, lines: &[ValidLine]) -> Result<Vec<OrderItem>> {
        let mut items = Vec::with_capacity(lines.len());
        let mut unavailable = ValidationFailure::default();
        for (i, line) in lines.iter().enumerate() {
            let item = match line {
                ValidLine::Catalog { product_id, quantity } => {
                    let product = self
                        .catalog
                        .get_product(*product_id)
                        .await?
                        .ok_or(StorefrontError::ProductNotFound(*product_id))?;
                    if !product.is_available() {
                        unavailable.push(format!("items[{i}].product_id"), "product is not available");
                        continue;
                    }
                    OrderItem::snapshot(Some(product.id()), product.name(), product.price(), *quantity)?
                }
                ValidLine::Snapshot { name, unit_price, quantity } => {
                    OrderItem::snapshot(None, name.as_str(), *unit_price, *quantity)?
                }
            };
            items.push(item);
        }
        unavailable.into_result()?;
        Ok(items)
    }

    async fn persist(&self, draft: &OrderDraft) -> Result<Order> {
        let attempts = self.settings.max_number_attempts.max(1);
        for attempt in 1..=attempts {
            let order = Order::place(self.numbers.next(), draft)?;
            match self.orders.create_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::Conflict(number)) => {
                    warn!(attempt, order_number = %number, "order number already taken, regenerating");
                }
                Err(e) => {
                    error!(order_number = %order.order_number(), error = %e, "failed to persist order");
                    return Err(e.into());
                }
            }
        }
        error!(attempts, "no unique order number available");
        Err(StorefrontError::OrderNumberExhausted { attempts })
    }

    async fn refresh_profile(&self, account: AccountId, update: &ProfileUpdate) {
        let existing = match self.customers.find_profile(account).await {
            Ok(p) => p,
            Err(e) => {
                warn!(%account, error = %e, "failed to load customer profile");
                return;
            }
        };
        let is_new = existing.is_none();
        let mut profile = existing.unwrap_or_else(|| CustomerProfile::new(account));
        if !profile.refresh(update) && !is_new {
            return;
        }
        if let Err(e) = self.customers.save_profile(&profile).await {
            warn!(%account, error = %e, "failed to save customer profile");
        }
    }
}

//! Order queries and status changes.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::aggregates::{CustomerProfile, Order, OrderStatus};
use crate::domain::value_objects::OrderNumber;
use crate::services::events::EventPublisher;
use crate::store::{CustomerStore, OrderStore};
use crate::{AccountId, Result, StorefrontError};

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerStore>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>, customers: Arc<dyn CustomerStore>, events: EventPublisher) -> Self {
        Self { orders, customers, events }
    }

    /// The account's orders, newest first.
    pub async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>> {
        Ok(self.orders.list_for_account(account).await?)
    }

    /// Orders owned by another account are reported exactly like missing ones.
    pub async fn get_for_account(&self, account: AccountId, order_number: &str) -> Result<Order> {
        let number: OrderNumber = order_number.parse().map_err(|_| StorefrontError::OrderNotFound)?;
        self.orders
            .find_for_account(&number, account)
            .await?
            .ok_or(StorefrontError::OrderNotFound)
    }

    pub async fn profile(&self, account: AccountId) -> Result<CustomerProfile> {
        self.customers.find_profile(account).await?.ok_or(StorefrontError::ProfileNotFound)
    }

    #[instrument(skip(self))]
    pub async fn transition_status(&self, order_number: &str, next: OrderStatus) -> Result<Order> {
        let number: OrderNumber = order_number.parse().map_err(|_| StorefrontError::OrderNotFound)?;
        let mut order = self.orders.find_by_number(&number).await?.ok_or(StorefrontError::OrderNotFound)?;
        let from = order.status();
        order.transition(next)?;
        self.orders.update_status(&order).await?;
        info!(order_number = %number, %from, to = %next, "order status changed");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }
}

//! Persistence interfaces.
//!
//! Implementations:
//! - `memory`: process-local maps, used for local runs and tests
//! - `postgres`: sqlx over PostgreSQL

use async_trait::async_trait;
use uuid::Uuid;

use crate::AccountId;
use crate::domain::aggregates::{Category, CustomerProfile, NotificationState, Order, Product};
use crate::domain::value_objects::OrderNumber;

pub mod memory;
pub mod postgres;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Order number already taken: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Stored record is inconsistent: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// Available products, ordered by category then name.
    async fn list_available(&self, category: Option<Category>) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_profile(&self, account: AccountId) -> StoreResult<Option<CustomerProfile>>;

    /// Insert or replace the account's single profile.
    async fn save_profile(&self, profile: &CustomerProfile) -> StoreResult<()>;
}

/// Order persistence.
///
/// `create_order` must leave either the order with all of its items or nothing.
/// The default composes the three primitive writes and deletes the header again
/// when the item write fails; stores with transactions override it.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order row. A taken order number yields `StoreError::Conflict`.
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn insert_items(&self, order: &Order) -> StoreResult<()>;

    /// Removes an order and, by cascade, its items.
    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()>;

    async fn create_order(&self, order: &Order) -> StoreResult<()> {
        self.insert_order(order).await?;
        if let Err(e) = self.insert_items(order).await {
            tracing::warn!(order_number = %order.order_number(), error = %e, "item write failed, removing order header");
            if let Err(cleanup) = self.delete_order(order.id()).await {
                tracing::error!(order_number = %order.order_number(), error = %cleanup, "compensating delete failed");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn find_by_number(&self, order_number: &OrderNumber) -> StoreResult<Option<Order>>;

    /// Only returns the order when `account` owns it.
    async fn find_for_account(&self, order_number: &OrderNumber, account: AccountId) -> StoreResult<Option<Order>>;

    /// Newest first.
    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Order>>;

    async fn update_status(&self, order: &Order) -> StoreResult<()>;

    async fn record_notification(&self, order_number: &OrderNumber, outcome: &NotificationState) -> StoreResult<()>;
}

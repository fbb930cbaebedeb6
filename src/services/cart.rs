//! Session carts.
//!
//! Carts live in process memory keyed by session id and are never persisted.
//! Checkout re-resolves every line against the catalog, so a cart only ever
//! carries display snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, CartItem, CartSummary};
use crate::domain::value_objects::Quantity;
use crate::services::checkout::{CheckoutRequest, CheckoutService, LineRequest, PlacedOrder};
use crate::store::CatalogStore;
use crate::{AccountId, Result, StorefrontError, ValidationFailure};

impl From<CartError> for StorefrontError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => StorefrontError::CartItemNotFound,
            CartError::QuantityLimit => StorefrontError::Validation(ValidationFailure::single("quantity", e.to_string())),
        }
    }
}

pub struct CartService {
    catalog: Arc<dyn CatalogStore>,
    sessions: RwLock<HashMap<String, Cart>>,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog, sessions: RwLock::new(HashMap::new()) }
    }

    pub async fn view(&self, session: &str) -> CartSummary {
        self.sessions.read().await.get(session).map(Cart::summary).unwrap_or_else(|| Cart::new().summary())
    }

    #[instrument(skip(self))]
    pub async fn add(&self, session: &str, product_id: Uuid, quantity: Option<u32>) -> Result<CartSummary> {
        let quantity = Quantity::new(quantity.unwrap_or(1))
            .map_err(|e| StorefrontError::Validation(ValidationFailure::single("quantity", e.to_string())))?;
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(StorefrontError::ProductNotFound(product_id))?;
        if !product.is_available() {
            return Err(StorefrontError::Validation(ValidationFailure::single("product_id", "product is not available")));
        }
        let mut sessions = self.sessions.write().await;
        Ok(sessions.entry(session.to_string()).or_default().add_item(CartItem::from_product(&product, quantity))?)
    }

    /// Sets a line's quantity; zero removes the line.
    pub async fn update(&self, session: &str, product_id: Uuid, quantity: u32) -> Result<CartSummary> {
        let mut sessions = self.sessions.write().await;
        let cart = sessions.get_mut(session).ok_or(StorefrontError::CartItemNotFound)?;
        Ok(cart.update_quantity(product_id, quantity)?)
    }

    pub async fn remove(&self, session: &str, product_id: Uuid) -> Result<CartSummary> {
        let mut sessions = self.sessions.write().await;
        let cart = sessions.get_mut(session).ok_or(StorefrontError::CartItemNotFound)?;
        Ok(cart.remove_item(product_id)?)
    }

    pub async fn clear(&self, session: &str) -> CartSummary {
        self.sessions.write().await.remove(session);
        Cart::new().summary()
    }

    /// Places an order for the cart's contents and takes the ordered lines out
    /// of the cart on success. Any `items` in the request are replaced by the cart lines.
    #[instrument(skip(self, request, checkout))]
    pub async fn checkout(
        &self,
        session: &str,
        account: Option<AccountId>,
        mut request: CheckoutRequest,
        checkout: &CheckoutService,
    ) -> Result<PlacedOrder> {
        let items: Vec<CartItem> = self
            .sessions
            .read()
            .await
            .get(session)
            .map(|c| c.items().to_vec())
            .unwrap_or_default();
        request.items = items.iter().map(|i| LineRequest::catalog(i.product_id, i.quantity.value())).collect();

        let placed = checkout.place_order(account, &request).await?;
        let mut sessions = self.sessions.write().await;
        if let Some(cart) = sessions.get_mut(session) {
            if cart.remove_ordered(&items).items.is_empty() {
                sessions.remove(session);
            }
        }
        debug!(order_number = %placed.order_number, "ordered lines removed from cart");
        Ok(placed)
    }
}

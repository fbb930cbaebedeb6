//! HTTP surface.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::services::cart::CartService;
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderService;
use crate::services::Dependencies;
use crate::store::CatalogStore;
use crate::{AccountId, FieldError, StorefrontError};

pub mod handlers;

/// Header carrying the authenticated account, set by the auth layer in front of the service.
pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub const CHECKOUT_FAILED: &str = "Failed to place order, please try again";
pub const REQUEST_FAILED: &str = "Something went wrong, please try again";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(deps: Dependencies, config: &Config) -> Self {
        let stores = deps.stores.clone();
        Self {
            catalog: stores.catalog.clone(),
            checkout: Arc::new(CheckoutService::new(&deps, config.confirmation_template(), config.checkout_settings())),
            orders: Arc::new(OrderService::new(stores.orders, stores.customers, deps.events.clone())),
            carts: Arc::new(CartService::new(stores.catalog)),
            admin_token: config.admin_token.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bakery-storefront"})) }))
        .route("/api/v1/products", get(handlers::list_products))
        .route("/api/v1/products/:id", get(handlers::get_product))
        .route("/api/v1/categories", get(handlers::list_categories))
        .route("/api/v1/cart/:session", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/api/v1/cart/:session/items", post(handlers::add_to_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(handlers::update_cart_item).delete(handlers::remove_cart_item))
        .route("/api/v1/cart/:session/checkout", post(handlers::checkout_cart))
        .route("/api/v1/checkout", post(handlers::checkout))
        .route("/api/v1/orders", get(handlers::list_orders))
        .route("/api/v1/orders/:order_number", get(handlers::get_order))
        .route("/api/v1/profile", get(handlers::get_profile))
        .route("/api/v1/admin/orders/:order_number/status", post(handlers::update_order_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Account extraction
// =============================================================================

/// The requesting account, if the auth layer identified one.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAccount(pub Option<AccountId>);

impl MaybeAccount {
    pub fn require(self) -> Result<AccountId, StorefrontError> {
        self.0.ok_or(StorefrontError::Unauthenticated)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeAccount {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(AccountId);
        Ok(Self(account))
    }
}

// =============================================================================
// Error responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

/// Renders an error. Server-side failures are logged in full and answered
/// with `internal_message` only.
pub fn error_response(err: StorefrontError, internal_message: &str) -> Response {
    let (status, error, fields) = match err {
        StorefrontError::Validation(failure) => (StatusCode::BAD_REQUEST, "Validation failed".to_string(), Some(failure.fields)),
        e @ (StorefrontError::ProductNotFound(_)
        | StorefrontError::OrderNotFound
        | StorefrontError::ProfileNotFound
        | StorefrontError::CartItemNotFound) => (StatusCode::NOT_FOUND, e.to_string(), None),
        e @ StorefrontError::Unauthenticated => (StatusCode::UNAUTHORIZED, e.to_string(), None),
        e @ StorefrontError::InvalidTransition { .. } => (StatusCode::CONFLICT, e.to_string(), None),
        e @ (StorefrontError::OrderNumberExhausted { .. } | StorefrontError::Storage(_) | StorefrontError::Internal(_)) => {
            tracing::error!(error = %e, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, internal_message.to_string(), None)
        }
    };
    (status, Json(ErrorBody { success: false, error, fields })).into_response()
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        error_response(self, REQUEST_FAILED)
    }
}

//! Request handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error_response, AppState, MaybeAccount, ADMIN_TOKEN_HEADER, CHECKOUT_FAILED};
use crate::domain::aggregates::{CartSummary, Category, CustomerProfile, Order, OrderStatus, Product};
use crate::domain::value_objects::{Money, OrderNumber};
use crate::services::checkout::{CheckoutRequest, PlacedOrder};
use crate::{Result, StorefrontError, ValidationFailure};

const NOTIFICATION_WARNING: &str = "Your order was placed but the confirmation email could not be sent";

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { total: data.len(), data }
    }
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| StorefrontError::Validation(ValidationFailure::single("body", rejection.body_text())))
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ProductQuery>) -> Result<Json<ListResponse<Product>>> {
    let category = match p.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<Category>().map_err(|e| StorefrontError::Validation(ValidationFailure::single("category", e.to_string())))?),
        None => None,
    };
    let mut products = s.catalog.list_available(category).await?;
    if let Some(q) = p.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        products.retain(|product| product.matches(q));
    }
    Ok(Json(products.into()))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    s.catalog.get_product(id).await?.map(Json).ok_or(StorefrontError::ProductNotFound(id))
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub slug: &'static str,
    pub label: &'static str,
}

pub async fn list_categories() -> Json<Vec<CategoryView>> {
    Json(Category::ALL.iter().map(|c| CategoryView { slug: c.as_str(), label: c.label() }).collect())
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

pub async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartSummary> {
    Json(s.carts.view(&session).await)
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    payload: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartSummary>)> {
    let r = body(payload)?;
    Ok((StatusCode::CREATED, Json(s.carts.add(&session, r.product_id, r.quantity).await?)))
}

pub async fn update_cart_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    payload: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartSummary>> {
    let r = body(payload)?;
    Ok(Json(s.carts.update(&session, product_id, r.quantity).await?))
}

pub async fn remove_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>) -> Result<Json<CartSummary>> {
    Ok(Json(s.carts.remove(&session, product_id).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartSummary> {
    Json(s.carts.clear(&session).await)
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_number: OrderNumber,
    pub total: Money,
    pub detail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_warning: Option<&'static str>,
}

impl From<PlacedOrder> for CheckoutResponse {
    fn from(placed: PlacedOrder) -> Self {
        Self {
            success: true,
            notification_warning: (!placed.notification.notified).then_some(NOTIFICATION_WARNING),
            order_number: placed.order_number,
            total: placed.total,
            detail_url: placed.detail_url,
        }
    }
}

fn checkout_result(placed: Result<PlacedOrder>) -> Response {
    match placed {
        Ok(placed) => (StatusCode::CREATED, Json(CheckoutResponse::from(placed))).into_response(),
        Err(e) => error_response(e, CHECKOUT_FAILED),
    }
}

pub async fn checkout(
    State(s): State<AppState>,
    account: MaybeAccount,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let request = match body(payload) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    checkout_result(s.checkout.place_order(account.0, &request).await)
}

/// Checks out the session cart. The body carries contact and fulfillment
/// details; its `items` are ignored.
pub async fn checkout_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    account: MaybeAccount,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let request = match body(payload) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    checkout_result(s.carts.checkout(&session, account.0, request, &s.checkout).await)
}

// =============================================================================
// Orders and profile
// =============================================================================

pub async fn list_orders(State(s): State<AppState>, account: MaybeAccount) -> Result<Json<ListResponse<Order>>> {
    let account = account.require()?;
    Ok(Json(s.orders.list_for_account(account).await?.into()))
}

pub async fn get_order(State(s): State<AppState>, account: MaybeAccount, Path(order_number): Path<String>) -> Result<Json<Order>> {
    let account = account.require()?;
    Ok(Json(s.orders.get_for_account(account, &order_number).await?))
}

pub async fn get_profile(State(s): State<AppState>, account: MaybeAccount) -> Result<Json<CustomerProfile>> {
    let account = account.require()?;
    Ok(Json(s.orders.profile(account).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
}

/// Admin status change. Answers 404 unless an admin token is configured.
pub async fn update_order_status(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(order_number): Path<String>,
    payload: std::result::Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Response {
    let Some(expected) = s.admin_token.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let presented = headers.get(ADMIN_TOKEN_HEADER).map(|v| v.as_bytes()).unwrap_or_default();
    if !tokens_match(presented, expected.as_bytes()) {
        return StorefrontError::Unauthenticated.into_response();
    }
    match change_status(&s, &order_number, payload).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    let diff = presented
        .iter()
        .zip(expected)
        .fold(presented.len() ^ expected.len(), |acc, (a, b)| acc | usize::from(a ^ b));
    diff == 0
}

async fn change_status(
    s: &AppState,
    order_number: &str,
    payload: std::result::Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Order> {
    let next: OrderStatus = body(payload)?
        .status
        .parse()
        .map_err(|_| StorefrontError::Validation(ValidationFailure::single("status", "unknown order status")))?;
    s.orders.transition_status(order_number, next).await
}

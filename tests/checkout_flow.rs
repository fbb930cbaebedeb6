//! End-to-end checkout behaviour over the HTTP router with in-memory stores.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use bakery_storefront::api::{self, AppState, CHECKOUT_FAILED};
use bakery_storefront::config::Config;
use bakery_storefront::domain::aggregates::{Category, Product};
use bakery_storefront::domain::value_objects::{Money, OrderNumber};
use bakery_storefront::services::notifications::{EmailMessage, MessageTransport, TransportError};
use bakery_storefront::services::order_number::OrderNumberGenerator;
use bakery_storefront::services::pricing::FlatDeliveryFee;
use bakery_storefront::services::{Dependencies, Stores};
use bakery_storefront::store::memory::{MemoryCatalog, MemoryCustomers, MemoryOrders};
use bakery_storefront::AccountId;

struct Harness {
    app: Router,
    catalog: Arc<MemoryCatalog>,
    orders: Arc<MemoryOrders>,
    customers: Arc<MemoryCustomers>,
}

fn money(pence: i64) -> Money {
    Money::new(Decimal::new(pence, 2))
}

fn harness(products: Vec<Product>, config: Config, configure: impl FnOnce(Dependencies) -> Dependencies) -> Harness {
    let catalog = Arc::new(MemoryCatalog::with_products(products));
    let orders = Arc::new(MemoryOrders::new());
    let customers = Arc::new(MemoryCustomers::new());
    let stores = Stores {
        catalog: catalog.clone(),
        customers: customers.clone(),
        orders: orders.clone(),
    };
    let deps = configure(Dependencies::new(stores).with_fees(Arc::new(FlatDeliveryFee(money(500)))));
    Harness { app: api::router(AppState::new(deps, &config)), catalog, orders, customers }
}

fn default_harness() -> Harness {
    harness(vec![], Config::default(), |d| d)
}

async fn call(app: &Router, method: Method, uri: &str, account: Option<AccountId>, body: Option<Value>) -> (StatusCode, Value) {
    call_with(app, method, uri, account, body, &[]).await
}

async fn call_with(
    app: &Router,
    method: Method,
    uri: &str,
    account: Option<AccountId>,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(account) = account {
        builder = builder.header(api::ACCOUNT_HEADER, account.to_string());
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn account() -> AccountId {
    AccountId(Uuid::new_v4())
}

fn collection_payload() -> Value {
    json!({
        "fulfillment_type": "collection",
        "contact": {"email": "a@b.com"},
        "items": [{"name": "Choc Cake", "price": 25.00, "quantity": 2}],
        "collection_date": "2025-06-01",
        "collection_time": "10:00"
    })
}

fn delivery_payload() -> Value {
    let mut payload = collection_payload();
    payload["fulfillment_type"] = json!("delivery");
    payload["delivery_address"] = json!("1 High Street");
    payload["delivery_city"] = json!("Leeds");
    payload["delivery_postcode"] = json!("LS1 1AA");
    payload["delivery_date"] = json!("2025-06-02");
    payload
}

struct FailingTransport;

#[async_trait]
impl MessageTransport for FailingTransport {
    async fn send(&self, _message: &EmailMessage) -> Result<(), TransportError> {
        Err(TransportError::Unavailable("connection refused".into()))
    }
}

/// Hands out the scripted numbers in order, then repeats the last one.
struct ScriptedNumbers(Mutex<Vec<&'static str>>);

impl ScriptedNumbers {
    fn new(numbers: &[&'static str]) -> Self {
        Self(Mutex::new(numbers.iter().rev().copied().collect()))
    }
}

impl OrderNumberGenerator for ScriptedNumbers {
    fn next(&self) -> OrderNumber {
        let mut numbers = self.0.lock().unwrap();
        let next = if numbers.len() > 1 { numbers.pop().unwrap() } else { numbers[0] };
        next.parse().unwrap()
    }
}

#[tokio::test]
async fn collection_checkout_persists_consistent_totals() {
    let h = default_harness();
    let owner = account();
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(collection_payload())).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["total"], json!("50.00"));
    assert!(body.get("notification_warning").is_none());
    let number = body["order_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("ORD-"));
    assert!(body["detail_url"].as_str().unwrap().ends_with(&format!("/api/v1/orders/{number}")));

    let orders = h.orders.all_orders().await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.subtotal(), money(5000));
    assert_eq!(order.delivery_fee(), Money::zero());
    assert_eq!(order.total(), money(5000));
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].line_total(), money(5000));
    assert!(order.totals_reconcile());
    assert!(order.notification().notified);
    assert_eq!(h.orders.item_count(order.id()).await, 1);

    let (status, detail) = call(&h.app, Method::GET, &format!("/api/v1/orders/{number}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["fulfillment"]["type"], json!("collection"));
    assert_eq!(detail["status"], json!("pending"));
    assert_eq!(detail["kind"], json!("multiple_items"));
    assert_eq!(detail["notified"], json!(true));
}

#[tokio::test]
async fn delivery_checkout_adds_the_delivery_fee() {
    let h = default_harness();
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(delivery_payload())).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], json!("55.00"));
    let order = &h.orders.all_orders().await[0];
    assert_eq!(order.delivery_fee(), money(500));
    assert_eq!(order.total(), order.subtotal() + order.delivery_fee());
}

#[tokio::test]
async fn catalog_lines_snapshot_the_current_price() {
    let cake = Product::create("Lemon Drizzle", Category::Birthday, money(3000)).unwrap();
    let h = harness(vec![cake.clone()], Config::default(), |d| d);
    let mut payload = collection_payload();
    payload["items"] = json!([{"product_ref": cake.id(), "quantity": 1}]);

    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], json!("30.00"));
    let order = &h.orders.all_orders().await[0];
    assert_eq!(order.items()[0].product_id(), Some(cake.id()));
    assert_eq!(order.items()[0].name(), "Lemon Drizzle");
    assert_eq!(order.kind().as_str(), "single_item");
}

#[tokio::test]
async fn catalog_price_changes_leave_placed_orders_alone() {
    let cake = Product::create("Lemon Drizzle", Category::Birthday, money(3000)).unwrap();
    let h = harness(vec![cake.clone()], Config::default(), |d| d);
    let owner = account();
    let mut payload = collection_payload();
    payload["items"] = json!([{"product_id": cake.id(), "quantity": 2}]);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let number = body["order_number"].as_str().unwrap().to_string();

    let repriced = Product::restore(
        cake.id(), cake.name().to_string(), cake.description().to_string(), cake.category(), money(4500),
        None, String::new(), String::new(), true, cake.created_at(),
    );
    h.catalog.insert(repriced).await;
    let (_, product) = call(&h.app, Method::GET, &format!("/api/v1/products/{}", cake.id()), None, None).await;
    assert_eq!(product["price"], json!("45.00"));

    let (status, detail) = call(&h.app, Method::GET, &format!("/api/v1/orders/{number}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"][0]["unit_price"], json!("30.00"));
    assert_eq!(detail["items"][0]["line_total"], json!("60.00"));
    assert_eq!(detail["subtotal"], json!("60.00"));
    assert_eq!(detail["total"], json!("60.00"));
}

#[tokio::test]
async fn out_of_range_lines_are_field_errors() {
    let h = default_harness();
    let owner = Some(account());

    let mut huge = collection_payload();
    huge["items"] = json!([{"name": "Big", "price": "79228162514264337593543950", "quantity": 5000}]);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(huge)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let fields: Vec<&str> = body["fields"].as_array().unwrap().iter().filter_map(|f| f["field"].as_str()).collect();
    assert!(fields.contains(&"items[0].price"));
    assert!(fields.contains(&"items[0].quantity"));

    let mut tiny = collection_payload();
    tiny["items"] = json!([{"name": "Tiny", "price": 0.004, "quantity": 1}]);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(tiny)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("items[0].price"));

    let mut largest = collection_payload();
    largest["items"] = json!([{"name": "Tower", "price": "999999.99", "quantity": 999}]);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(largest)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], json!("998999990.01"));
    assert_eq!(h.orders.order_count().await, 1);
}

#[tokio::test]
async fn cart_quantities_stop_at_the_limit() {
    let brownie = Product::create("Brownie", Category::Treats, money(350)).unwrap();
    let scone = Product::create("Scone", Category::Treats, money(200)).unwrap();
    let h = harness(vec![brownie.clone(), scone.clone()], Config::default(), |d| d);
    let uri = "/api/v1/cart/sess-limit/items";

    let (status, _) = call(&h.app, Method::POST, uri, None, Some(json!({"product_id": brownie.id(), "quantity": u32::MAX}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&h.app, Method::POST, uri, None, Some(json!({"product_id": brownie.id(), "quantity": 999}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&h.app, Method::POST, uri, None, Some(json!({"product_id": scone.id(), "quantity": 999}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["count"], json!(1998));
    let (status, body) = call(&h.app, Method::POST, uri, None, Some(json!({"product_id": brownie.id(), "quantity": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("quantity"));
}

#[tokio::test]
async fn invalid_payloads_leave_no_order() {
    let h = default_harness();
    let owner = Some(account());

    let mut empty = collection_payload();
    empty["items"] = json!([]);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["fields"][0]["field"], json!("items"));

    let mut no_address = delivery_payload();
    no_address.as_object_mut().unwrap().remove("delivery_address");
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(no_address)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("delivery_address"));

    let mut no_date = collection_payload();
    no_date.as_object_mut().unwrap().remove("collection_date");
    let (status, _) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(no_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_date = collection_payload();
    bad_date["collection_date"] = json!("next tuesday");
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(bad_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("collection_date"));

    let mut zero = collection_payload();
    zero["items"][0]["quantity"] = json!(0);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(zero)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("items[0].quantity"));

    let mut missing = collection_payload();
    missing["items"] = json!([{"product_id": Uuid::new_v4(), "quantity": 1}]);
    let (status, _) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn unavailable_products_are_rejected() {
    let old = Product::create("Old Stock", Category::Treats, money(100)).unwrap().unavailable();
    let h = harness(vec![old.clone()], Config::default(), |d| d);
    let mut payload = collection_payload();
    payload["items"] = json!([{"product_id": old.id(), "quantity": 1}]);

    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], json!("items[0].product_id"));
    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_order() {
    let h = harness(vec![], Config::default(), |d| d.with_transport(Arc::new(FailingTransport)));
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(collection_payload())).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], json!(true));
    assert!(body["notification_warning"].is_string());
    let order = &h.orders.all_orders().await[0];
    assert!(!order.notification().notified);
    assert_eq!(order.notification().notification_error.as_deref(), Some("transport unavailable: connection refused"));
}

#[tokio::test]
async fn foreign_orders_look_like_missing_ones() {
    let h = default_harness();
    let (owner, other) = (account(), account());
    let (_, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(collection_payload())).await;
    let number = body["order_number"].as_str().unwrap();

    let foreign = call(&h.app, Method::GET, &format!("/api/v1/orders/{number}"), Some(other), None).await;
    let missing = call(&h.app, Method::GET, "/api/v1/orders/ORD-20250101-000000-DEADBEEF", Some(other), None).await;
    assert_eq!(foreign.0, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    let (status, _) = call(&h.app, Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, listed) = call(&h.app, Method::GET, "/api/v1/orders", Some(other), None).await;
    assert_eq!(listed["total"], json!(0));
    let (_, listed) = call(&h.app, Method::GET, "/api/v1/orders", Some(owner), None).await;
    assert_eq!(listed["data"][0]["order_number"], json!(number));
}

#[tokio::test]
async fn order_number_collisions_are_retried_then_fail_cleanly() {
    let numbers = Arc::new(ScriptedNumbers::new(&["ORD-TEST-1", "ORD-TEST-1", "ORD-TEST-2"]));
    let h = harness(vec![], Config::default(), |d| d.with_numbers(numbers));
    let owner = Some(account());

    let (_, first) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(collection_payload())).await;
    assert_eq!(first["order_number"], json!("ORD-TEST-1"));
    let (status, second) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(collection_payload())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["order_number"], json!("ORD-TEST-2"));

    // Only ORD-TEST-2 remains, which is now taken.
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", owner, Some(collection_payload())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"success": false, "error": CHECKOUT_FAILED}));
    assert_eq!(h.orders.order_count().await, 2);
}

#[tokio::test]
async fn failed_item_write_leaves_no_partial_order() {
    let h = default_harness();
    h.orders.fail_item_writes(true);
    let (status, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(collection_payload())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!(CHECKOUT_FAILED));
    assert!(!body.to_string().contains("item table"));
    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn concurrent_checkouts_get_distinct_numbers() {
    let h = default_harness();
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = h.app.clone();
            tokio::spawn(async move { call(&app, Method::POST, "/api/v1/checkout", Some(account()), Some(collection_payload())).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        numbers.push(body["order_number"].as_str().unwrap().to_string());
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 20);
    assert_eq!(h.orders.order_count().await, 20);
}

#[tokio::test]
async fn guest_checkout_follows_configuration() {
    let h = default_harness();
    let (status, _) = call(&h.app, Method::POST, "/api/v1/checkout", None, Some(collection_payload())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.orders.order_count().await, 0);

    let config = Config { allow_guest_checkout: true, ..Config::default() };
    let h = harness(vec![], config, |d| d);
    let (status, _) = call(&h.app, Method::POST, "/api/v1/checkout", None, Some(collection_payload())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(h.orders.all_orders().await[0].account_id(), None);
    assert_eq!(h.customers.profile_count().await, 0);
}

#[tokio::test]
async fn profile_is_created_then_refreshed_without_blanks() {
    let h = default_harness();
    let owner = account();

    let (status, _) = call(&h.app, Method::GET, "/api/v1/profile", Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut delivery = delivery_payload();
    delivery["contact"]["phone"] = json!("07700 900123");
    call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(delivery)).await;
    let (_, profile) = call(&h.app, Method::GET, "/api/v1/profile", Some(owner), None).await;
    assert_eq!(profile["phone_number"], json!("07700 900123"));
    assert_eq!(profile["city"], json!("Leeds"));

    let mut moved = delivery_payload();
    moved["delivery_city"] = json!("York");
    moved["delivery_postcode"] = json!("YO1 7HH");
    call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(moved)).await;
    call(&h.app, Method::POST, "/api/v1/checkout", Some(owner), Some(collection_payload())).await;

    let (_, profile) = call(&h.app, Method::GET, "/api/v1/profile", Some(owner), None).await;
    assert_eq!(profile["phone_number"], json!("07700 900123"));
    assert_eq!(profile["address"], json!("1 High Street"));
    assert_eq!(profile["city"], json!("York"));
    assert_eq!(profile["postcode"], json!("YO1 7HH"));
    assert_eq!(h.customers.profile_count().await, 1);
}

#[tokio::test]
async fn cart_checkout_clears_the_cart_only_on_success() {
    let scone = Product::create("Cheese Scone", Category::Treats, money(250)).unwrap();
    let h = harness(vec![scone.clone()], Config::default(), |d| d);
    let owner = Some(account());

    let (status, cart) = call(&h.app, Method::POST, "/api/v1/cart/s1/items", None, Some(json!({"product_id": scone.id(), "quantity": 2}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["count"], json!(2));
    let (_, cart) = call(&h.app, Method::POST, "/api/v1/cart/s1/items", None, Some(json!({"product_id": scone.id()}))).await;
    assert_eq!(cart["count"], json!(3));
    assert_eq!(cart["total"], json!("7.50"));

    let mut no_date = collection_payload();
    no_date.as_object_mut().unwrap().remove("collection_date");
    let (status, _) = call(&h.app, Method::POST, "/api/v1/cart/s1/checkout", owner, Some(no_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, cart) = call(&h.app, Method::GET, "/api/v1/cart/s1", None, None).await;
    assert_eq!(cart["count"], json!(3));

    let (status, body) = call(&h.app, Method::POST, "/api/v1/cart/s1/checkout", owner, Some(collection_payload())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], json!("7.50"));
    let (_, cart) = call(&h.app, Method::GET, "/api/v1/cart/s1", None, None).await;
    assert_eq!(cart["count"], json!(0));
    assert_eq!(h.orders.all_orders().await[0].items()[0].name(), "Cheese Scone");
}

#[tokio::test]
async fn cart_updates_and_removals() {
    let scone = Product::create("Cheese Scone", Category::Treats, money(250)).unwrap();
    let h = harness(vec![scone.clone()], Config::default(), |d| d);
    let item_uri = format!("/api/v1/cart/s2/items/{}", scone.id());

    call(&h.app, Method::POST, "/api/v1/cart/s2/items", None, Some(json!({"product_id": scone.id()}))).await;
    let (_, cart) = call(&h.app, Method::PUT, &item_uri, None, Some(json!({"quantity": 4}))).await;
    assert_eq!(cart["total"], json!("10.00"));
    let (_, cart) = call(&h.app, Method::PUT, &item_uri, None, Some(json!({"quantity": 0}))).await;
    assert_eq!(cart["items"], json!([]));
    let (status, _) = call(&h.app, Method::DELETE, &item_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(&h.app, Method::POST, "/api/v1/cart/s2/items", None, Some(json!({"product_id": scone.id()}))).await;
    let (_, cart) = call(&h.app, Method::DELETE, "/api/v1/cart/s2", None, None).await;
    assert_eq!(cart["count"], json!(0));
}

#[tokio::test]
async fn admin_status_changes_follow_the_lifecycle() {
    let config = Config { admin_token: Some("secret".into()), ..Config::default() };
    let h = harness(vec![], config, |d| d);
    let (_, body) = call(&h.app, Method::POST, "/api/v1/checkout", Some(account()), Some(collection_payload())).await;
    let uri = format!("/api/v1/admin/orders/{}/status", body["order_number"].as_str().unwrap());
    let admin = [("x-admin-token", "secret")];

    let (status, _) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "confirmed"})), &[("x-admin-token", "nope")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, order) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "confirmed"})), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], json!("confirmed"));

    let (status, _) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "ready"})), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "cancelled"})), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "preparing"})), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call_with(&h.app, Method::POST, &uri, None, Some(json!({"status": "baking"})), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_are_hidden_without_a_token() {
    let h = default_harness();
    let (status, _) = call_with(
        &h.app,
        Method::POST,
        "/api/v1/admin/orders/ORD-1/status",
        None,
        Some(json!({"status": "confirmed"})),
        &[("x-admin-token", "anything")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_listing_filters_and_searches() {
    let products = vec![
        Product::create("Victoria Sponge", Category::Birthday, money(2200)).unwrap(),
        Product::create("Vegan Chocolate Cake", Category::Vegan, money(2800)).unwrap(),
        Product::create("Three Tier Classic", Category::Wedding, money(25000)).unwrap(),
        Product::create("Hidden", Category::Vegan, money(100)).unwrap().unavailable(),
    ];
    let h = harness(products, Config::default(), |d| d);

    let (_, all) = call(&h.app, Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(all["total"], json!(3));
    assert_eq!(all["data"][0]["name"], json!("Victoria Sponge"));

    let (_, vegan) = call(&h.app, Method::GET, "/api/v1/products?category=vegan", None, None).await;
    assert_eq!(vegan["total"], json!(1));
    let (_, search) = call(&h.app, Method::GET, "/api/v1/products?q=chocolate", None, None).await;
    assert_eq!(search["data"][0]["name"], json!("Vegan Chocolate Cake"));
    let (status, _) = call(&h.app, Method::GET, "/api/v1/products?category=pies", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, categories) = call(&h.app, Method::GET, "/api/v1/categories", None, None).await;
    assert_eq!(categories[1], json!({"slug": "wedding", "label": "Wedding Cakes"}));
    let (_, health) = call(&h.app, Method::GET, "/health", None, None).await;
    assert_eq!(health["status"], json!("healthy"));
}

//! PostgreSQL stores.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::AccountId;
use crate::domain::aggregates::{
    Category, Contact, CustomerProfile, FulfillmentDetails, NotificationState, Order, OrderItem, OrderKind,
    OrderStatus, Product, StoredOrder,
};
use crate::domain::value_objects::{Money, OrderNumber, Quantity};
use crate::store::{CatalogStore, CustomerStore, OrderStore, StoreError, StoreResult};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid, name: String, description: String, category: String, price: Decimal, image_url: Option<String>,
    ingredients: String, allergens: String, is_available: bool, created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    account_id: Uuid, phone_number: String, address: String, city: String, postcode: String,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, account_id: Option<Uuid>,
    contact_name: String, contact_email: String, contact_phone: String,
    fulfillment_type: String, status: String, order_kind: String,
    collection_date: Option<NaiveDate>, collection_time: Option<String>,
    delivery_address: Option<String>, delivery_city: Option<String>, delivery_postcode: Option<String>,
    delivery_date: Option<NaiveDate>, delivery_time: Option<String>,
    subtotal: Decimal, delivery_fee: Decimal, total: Decimal, special_instructions: String,
    notified: bool, notification_error: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid, order_id: Uuid, product_id: Option<Uuid>, name: String, unit_price: Decimal, quantity: i32, line_total: Decimal,
}

fn corrupt(what: impl std::fmt::Display) -> StoreError { StoreError::Corrupt(what.to_string()) }

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> StoreResult<Self> {
        let category: Category = r.category.parse().map_err(corrupt)?;
        Ok(Product::restore(
            r.id, r.name, r.description, category, Money::new(r.price), r.image_url, r.ingredients, r.allergens,
            r.is_available, r.created_at,
        ))
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;
    fn try_from(r: OrderItemRow) -> StoreResult<Self> {
        let quantity = u32::try_from(r.quantity).ok().and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| corrupt(format!("order item {} has quantity {}", r.id, r.quantity)))?;
        OrderItem::restore(r.id, r.product_id, r.name, Money::new(r.unit_price), quantity, Money::new(r.line_total)).map_err(corrupt)
    }
}

fn into_order(r: OrderRow, items: Vec<OrderItemRow>) -> StoreResult<Order> {
    let fulfillment = match r.fulfillment_type.as_str() {
        "collection" => FulfillmentDetails::Collection {
            date: r.collection_date.ok_or_else(|| corrupt(format!("order {} lacks collection_date", r.order_number)))?,
            time: r.collection_time.filter(|t| !t.is_empty()),
        },
        "delivery" => match (r.delivery_address, r.delivery_city, r.delivery_postcode, r.delivery_date) {
            (Some(address), Some(city), Some(postcode), Some(date)) => FulfillmentDetails::Delivery {
                address, city, postcode, date, time: r.delivery_time.unwrap_or_default(),
            },
            _ => return Err(corrupt(format!("order {} lacks delivery fields", r.order_number))),
        },
        other => return Err(corrupt(format!("order {} has fulfillment type '{other}'", r.order_number))),
    };
    let items = items.into_iter().map(OrderItem::try_from).collect::<StoreResult<Vec<_>>>()?;
    Order::restore(StoredOrder {
        id: r.id,
        order_number: r.order_number.parse().map_err(corrupt)?,
        account_id: r.account_id.map(AccountId),
        contact: Contact { name: r.contact_name, email: r.contact_email, phone: r.contact_phone },
        fulfillment,
        status: r.status.parse::<OrderStatus>().map_err(corrupt)?,
        kind: r.order_kind.parse::<OrderKind>().map_err(corrupt)?,
        items,
        subtotal: Money::new(r.subtotal),
        delivery_fee: Money::new(r.delivery_fee),
        total: Money::new(r.total),
        special_instructions: r.special_instructions,
        notification: NotificationState { notified: r.notified, notification_error: r.notification_error },
        created_at: r.created_at,
        updated_at: r.updated_at,
    })
    .map_err(|e| corrupt(format!("order {}: {e}", r.id)))
}

pub struct PostgresCatalog { pool: PgPool }

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn list_available(&self, category: Option<Category>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE is_available AND ($1::TEXT IS NULL OR category = $1)")
            .bind(category.map(|c| c.as_str())).fetch_all(&self.pool).await?;
        let mut products = rows.into_iter().map(Product::try_from).collect::<StoreResult<Vec<_>>>()?;
        products.sort_by(|a, b| (a.category(), a.name()).cmp(&(b.category(), b.name())));
        Ok(products)
    }
}

pub struct PostgresCustomers { pool: PgPool }

impl PostgresCustomers {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CustomerStore for PostgresCustomers {
    async fn find_profile(&self, account: AccountId) -> StoreResult<Option<CustomerProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM customer_profiles WHERE account_id = $1")
            .bind(account.0).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| CustomerProfile::restore(
            AccountId(r.account_id), r.phone_number, r.address, r.city, r.postcode, r.created_at, r.updated_at,
        )))
    }

    async fn save_profile(&self, p: &CustomerProfile) -> StoreResult<()> {
        sqlx::query("INSERT INTO customer_profiles (account_id, phone_number, address, city, postcode, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (account_id) DO UPDATE SET phone_number = EXCLUDED.phone_number, address = EXCLUDED.address, city = EXCLUDED.city, postcode = EXCLUDED.postcode, updated_at = EXCLUDED.updated_at")
            .bind(p.account_id().0).bind(p.phone_number()).bind(p.address()).bind(p.city()).bind(p.postcode())
            .bind(p.created_at()).bind(p.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PostgresOrders { pool: PgPool }

impl PostgresOrders {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn load(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>("SELECT id, order_id, product_id, name, unit_price, quantity, line_total FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position")
            .bind(&ids).fetch_all(&self.pool).await?;
        let mut items: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
        for item in item_rows {
            items.entry(item.order_id).or_default().push(item);
        }
        rows.into_iter()
            .map(|row| {
                let mine = items.remove(&row.id).unwrap_or_default();
                into_order(row, mine)
            })
            .collect()
    }
}

fn map_insert_error(e: sqlx::Error, order: &Order) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(order.order_number().to_string()),
        _ => StoreError::Database(e),
    }
}

async fn insert_order_row(conn: &mut PgConnection, o: &Order) -> StoreResult<()> {
    let (collection_date, collection_time, address, city, postcode, delivery_date, delivery_time) = match o.fulfillment() {
        FulfillmentDetails::Collection { date, time } => (Some(*date), time.clone(), None, None, None, None, None),
        FulfillmentDetails::Delivery { address, city, postcode, date, time } => {
            (None, None, Some(address.clone()), Some(city.clone()), Some(postcode.clone()), Some(*date), Some(time.clone()))
        }
    };
    sqlx::query("INSERT INTO orders (id, order_number, account_id, contact_name, contact_email, contact_phone, fulfillment_type, status, order_kind, collection_date, collection_time, delivery_address, delivery_city, delivery_postcode, delivery_date, delivery_time, subtotal, delivery_fee, total, special_instructions, notified, notification_error, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)")
        .bind(o.id()).bind(o.order_number().as_str()).bind(o.account_id().map(|a| a.0))
        .bind(&o.contact().name).bind(&o.contact().email).bind(&o.contact().phone)
        .bind(o.fulfillment().kind().as_str()).bind(o.status().as_str()).bind(o.kind().as_str())
        .bind(collection_date).bind(collection_time)
        .bind(address).bind(city).bind(postcode).bind(delivery_date).bind(delivery_time)
        .bind(o.subtotal().amount()).bind(o.delivery_fee().amount()).bind(o.total().amount())
        .bind(o.special_instructions()).bind(o.notification().notified).bind(o.notification().notification_error.as_deref())
        .bind(o.created_at()).bind(o.updated_at())
        .execute(&mut *conn).await
        .map_err(|e| map_insert_error(e, o))?;
    Ok(())
}

async fn insert_item_rows(conn: &mut PgConnection, o: &Order) -> StoreResult<()> {
    for (position, item) in o.items().iter().enumerate() {
        let position = i32::try_from(position).map_err(corrupt)?;
        let quantity = i32::try_from(item.quantity().value()).map_err(corrupt)?;
        sqlx::query("INSERT INTO order_items (id, order_id, product_id, position, name, unit_price, quantity, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(item.id()).bind(o.id()).bind(item.product_id()).bind(position).bind(item.name())
            .bind(item.unit_price().amount()).bind(quantity).bind(item.line_total().amount())
            .execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl OrderStore for PostgresOrders {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_order_row(&mut conn, order).await
    }

    async fn insert_items(&self, order: &Order) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_item_rows(&mut conn, order).await
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(&self.pool).await?;
        Ok(())
    }

    /// Header and items in one transaction; dropping the transaction on error rolls both back.
    async fn create_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_order_row(&mut tx, order).await?;
        insert_item_rows(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_number(&self, order_number: &OrderNumber) -> StoreResult<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_number = $1")
            .bind(order_number.as_str()).fetch_all(&self.pool).await?;
        Ok(self.load(rows).await?.pop())
    }

    async fn find_for_account(&self, order_number: &OrderNumber, account: AccountId) -> StoreResult<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_number = $1 AND account_id = $2")
            .bind(order_number.as_str()).bind(account.0).fetch_all(&self.pool).await?;
        Ok(self.load(rows).await?.pop())
    }

    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE account_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(account.0).fetch_all(&self.pool).await?;
        self.load(rows).await
    }

    async fn update_status(&self, order: &Order) -> StoreResult<()> {
        let done = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id()).bind(order.status().as_str()).bind(order.updated_at())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::NotFound(order.order_number().to_string())); }
        Ok(())
    }

    async fn record_notification(&self, order_number: &OrderNumber, outcome: &NotificationState) -> StoreResult<()> {
        let done = sqlx::query("UPDATE orders SET notified = $2, notification_error = $3, updated_at = NOW() WHERE order_number = $1")
            .bind(order_number.as_str()).bind(outcome.notified).bind(outcome.notification_error.as_deref())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::NotFound(order_number.to_string())); }
        Ok(())
    }
}

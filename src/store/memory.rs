//! In-memory stores for local runs and tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::AccountId;
use crate::domain::aggregates::{Category, CustomerProfile, NotificationState, Order, OrderItem, Product, StoredOrder};
use crate::domain::value_objects::OrderNumber;
use crate::store::{CatalogStore, CustomerStore, OrderStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self { products: RwLock::new(products.into_iter().map(|p| (p.id(), p)).collect()) }
    }

    /// Loads a JSON array of products.
    pub fn from_json_file(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        let products: Vec<Product> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        Ok(Self::with_products(products))
    }

    pub async fn insert(&self, product: Product) {
        self.products.write().await.insert(product.id(), product);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_available(&self, category: Option<Category>) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.is_available() && category.map_or(true, |c| p.category() == c))
            .cloned()
            .collect();
        products.sort_by(|a, b| (a.category(), a.name()).cmp(&(b.category(), b.name())));
        Ok(products)
    }
}

#[derive(Default)]
pub struct MemoryCustomers {
    profiles: RwLock<HashMap<AccountId, CustomerProfile>>,
}

impl MemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomers {
    async fn find_profile(&self, account: AccountId) -> StoreResult<Option<CustomerProfile>> {
        Ok(self.profiles.read().await.get(&account).cloned())
    }

    async fn save_profile(&self, profile: &CustomerProfile) -> StoreResult<()> {
        self.profiles.write().await.insert(profile.account_id(), profile.clone());
        Ok(())
    }
}

#[derive(Default)]
struct OrderTables {
    headers: HashMap<Uuid, StoredOrder>,
    numbers: HashMap<OrderNumber, Uuid>,
    items: HashMap<Uuid, Vec<OrderItem>>,
}

impl OrderTables {
    /// Joins a header with its item rows. A header without items is not a
    /// committed order and stays invisible.
    fn assemble(&self, id: &Uuid) -> StoreResult<Option<Order>> {
        let (Some(header), Some(items)) = (self.headers.get(id), self.items.get(id)) else { return Ok(None) };
        let stored = StoredOrder { items: items.clone(), ..header.clone() };
        Order::restore(stored).map(Some).map_err(|e| StoreError::Corrupt(format!("order {id}: {e}")))
    }

    fn header_mut(&mut self, order_number: &OrderNumber) -> StoreResult<&mut StoredOrder> {
        let not_found = || StoreError::NotFound(order_number.to_string());
        let id = *self.numbers.get(order_number).ok_or_else(not_found)?;
        self.headers.get_mut(&id).ok_or_else(not_found)
    }
}

/// Order store with separate header and item tables, relying on the
/// compensating `create_order` path from [`OrderStore`].
#[derive(Default)]
pub struct MemoryOrders {
    tables: RwLock<OrderTables>,
    fail_item_writes: AtomicBool,
}

impl MemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent item writes fail, as a lost connection would.
    pub fn fail_item_writes(&self, fail: bool) {
        self.fail_item_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.headers.len()
    }

    pub async fn item_count(&self, order_id: Uuid) -> usize {
        self.tables.read().await.items.get(&order_id).map_or(0, Vec::len)
    }

    /// Every committed order, in no particular order.
    pub async fn all_orders(&self) -> Vec<Order> {
        let tables = self.tables.read().await;
        tables.headers.keys().filter_map(|id| tables.assemble(id).ok().flatten()).collect()
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.numbers.contains_key(order.order_number()) {
            return Err(StoreError::Conflict(order.order_number().to_string()));
        }
        tables.numbers.insert(order.order_number().clone(), order.id());
        tables.headers.insert(order.id(), StoredOrder { items: vec![], ..order.stored() });
        Ok(())
    }

    async fn insert_items(&self, order: &Order) -> StoreResult<()> {
        if self.fail_item_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("item table write failed".to_string()));
        }
        let mut tables = self.tables.write().await;
        if !tables.headers.contains_key(&order.id()) {
            return Err(StoreError::NotFound(order.order_number().to_string()));
        }
        tables.items.insert(order.id(), order.items().to_vec());
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(header) = tables.headers.remove(&order_id) {
            tables.numbers.remove(&header.order_number);
        }
        tables.items.remove(&order_id);
        Ok(())
    }

    async fn find_by_number(&self, order_number: &OrderNumber) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        match tables.numbers.get(order_number) {
            Some(id) => tables.assemble(id),
            None => Ok(None),
        }
    }

    async fn find_for_account(&self, order_number: &OrderNumber, account: AccountId) -> StoreResult<Option<Order>> {
        Ok(self
            .find_by_number(order_number)
            .await?
            .filter(|o| o.account_id() == Some(account)))
    }

    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders = Vec::new();
        for (id, header) in &tables.headers {
            if header.account_id == Some(account) {
                orders.extend(tables.assemble(id)?);
            }
        }
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(orders)
    }

    async fn update_status(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let header = tables.header_mut(order.order_number())?;
        header.status = order.status();
        header.updated_at = order.updated_at();
        Ok(())
    }

    async fn record_notification(&self, order_number: &OrderNumber, outcome: &NotificationState) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let header = tables.header_mut(order_number)?;
        header.notification = outcome.clone();
        header.updated_at = chrono::Utc::now();
        Ok(())
    }
}

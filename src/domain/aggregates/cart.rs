//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, Quantity, QuantityError};

/// Session-scoped cart. Lines keep insertion order and one entry per product.
#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id(), name: product.name().to_string(), unit_price: product.price(),
            quantity, image_url: product.image_url().map(str::to_string),
        }
    }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// What every cart mutation hands back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total: Money,
    pub count: u64,
}

impl Default for Cart {
    fn default() -> Self { Self::new() }
}

impl Cart {
    pub fn new() -> Self { Self { items: vec![], updated_at: Utc::now() } }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn total(&self) -> Money { self.items.iter().map(CartItem::line_total).sum() }
    pub fn count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }

    pub fn summary(&self) -> CartSummary {
        CartSummary { items: self.items.clone(), total: self.total(), count: self.count() }
    }

    /// Adds to an existing line for the same product, keeping its original price snapshot.
    pub fn add_item(&mut self, item: CartItem) -> Result<CartSummary, CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.checked_add(item.quantity).ok_or(CartError::QuantityLimit)?;
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(self.summary())
    }

    /// Quantity zero removes the line.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<CartSummary, CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        match Quantity::new(quantity) {
            Ok(q) => item.quantity = q,
            Err(QuantityError::Zero) => self.items.retain(|i| i.product_id != product_id),
            Err(QuantityError::TooLarge) => return Err(CartError::QuantityLimit),
        }
        self.touch();
        Ok(self.summary())
    }

    /// Takes ordered lines out of the cart. Quantity added to a line after the
    /// snapshot was taken stays behind.
    pub fn remove_ordered(&mut self, ordered: &[CartItem]) -> CartSummary {
        for line in ordered {
            let Some(pos) = self.items.iter().position(|i| i.product_id == line.product_id) else { continue };
            let remaining = self.items[pos].quantity.value().saturating_sub(line.quantity.value());
            match Quantity::new(remaining) {
                Ok(q) => self.items[pos].quantity = q,
                Err(_) => { self.items.remove(pos); }
            }
        }
        self.touch();
        self.summary()
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<CartSummary, CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(self.summary())
    }

    pub fn clear(&mut self) -> CartSummary { self.items.clear(); self.touch(); self.summary() }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, QuantityLimit }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::QuantityLimit => write!(f, "quantity must be at most {}", Quantity::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: Uuid, pence: i64, qty: u32) -> CartItem {
        CartItem { product_id: id, name: "Cupcake".into(), unit_price: Money::new(Decimal::new(pence, 2)), quantity: Quantity::new(qty).unwrap(), image_url: None }
    }

    #[test]
    fn test_cart_operations() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new();
        let summary = cart.add_item(item(a, 1000, 2)).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total.amount(), Decimal::new(2000, 2));
        cart.add_item(item(a, 1000, 1)).unwrap();
        assert_eq!(cart.items()[0].quantity.value(), 3); // Merged
        let summary = cart.add_item(item(b, 250, 4)).unwrap();
        assert_eq!(summary.count, 7);
        assert_eq!(summary.total.amount(), Decimal::new(4000, 2));
        assert_eq!(cart.items()[1].product_id, b);
    }

    #[test]
    fn test_update_to_zero_removes() {
        let a = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_item(item(a, 1000, 2)).unwrap();
        assert_eq!(cart.update_quantity(a, 5).unwrap().count, 5);
        assert_eq!(cart.update_quantity(a, Quantity::MAX + 1).unwrap_err(), CartError::QuantityLimit);
        assert_eq!(cart.items()[0].quantity.value(), 5);
        let summary = cart.update_quantity(a, 0).unwrap();
        assert!(summary.items.is_empty());
        assert_eq!(cart.update_quantity(a, 1).unwrap_err(), CartError::ItemNotFound);
    }

    #[test]
    fn test_remove_and_clear() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new();
        cart.add_item(item(a, 1000, 1)).unwrap();
        cart.add_item(item(b, 500, 1)).unwrap();
        assert_eq!(cart.remove_item(a).unwrap().count, 1);
        assert_eq!(cart.remove_item(a).unwrap_err(), CartError::ItemNotFound);
        let summary = cart.clear();
        assert_eq!(summary.total, Money::zero());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_stops_at_quantity_limit() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new();
        cart.add_item(item(a, 100, Quantity::MAX)).unwrap();
        assert_eq!(cart.add_item(item(a, 100, 1)).unwrap_err(), CartError::QuantityLimit);
        let summary = cart.add_item(item(b, 100, Quantity::MAX)).unwrap();
        assert_eq!(summary.count, 2 * u64::from(Quantity::MAX));
    }

    #[test]
    fn test_remove_ordered_keeps_later_additions() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new();
        cart.add_item(item(a, 1000, 2)).unwrap();
        cart.add_item(item(b, 500, 1)).unwrap();
        let ordered = cart.items().to_vec();
        cart.add_item(item(a, 1000, 1)).unwrap();
        cart.add_item(item(c, 250, 3)).unwrap();

        let summary = cart.remove_ordered(&ordered);
        assert_eq!(summary.items.len(), 2);
        assert_eq!((summary.items[0].product_id, summary.items[0].quantity.value()), (a, 1));
        assert_eq!((summary.items[1].product_id, summary.items[1].quantity.value()), (c, 3));
    }
}

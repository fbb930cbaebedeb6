//! Aggregates module
pub mod product;
pub mod customer;
pub mod order;
pub mod cart;

pub use product::{Category, Product, ProductError};
pub use customer::{CustomerProfile, ProfileUpdate};
pub use order::{
    Contact, FulfillmentDetails, FulfillmentType, NotificationState, Order, OrderDraft, OrderError,
    OrderItem, OrderKind, OrderStatus, StoredOrder,
};
pub use cart::{Cart, CartError, CartItem, CartSummary};

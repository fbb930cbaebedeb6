//! Bakery Storefront
//!
//! Online shop for a cake bakery.
//!
//! ## Features
//! - Product catalog by category (birthday, wedding, vegan, treats)
//! - Session carts
//! - Checkout for collection or delivery, with price snapshots
//! - Order history scoped to the owning account
//! - Confirmation messages that never undo a placed order

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod config;
pub mod domain;
pub mod services;
pub mod store;

// =============================================================================
// Core Types
// =============================================================================

/// Identifier of an authenticated account, issued by the external auth layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// One rejected input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field problems found in one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub fields: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failure = Self::default();
        failure.push(field, message);
        failure
    }
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.push(FieldError { field: field.into(), message: message.into() });
    }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
    pub fn has_field(&self, field: &str) -> bool { self.fields.iter().any(|f| f.field == field) }
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() { Ok(()) } else { Err(StorefrontError::Validation(self)) }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Item not found in cart")]
    CartItemNotFound,

    #[error("Sign in required")]
    Unauthenticated,

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: domain::aggregates::OrderStatus, to: domain::aggregates::OrderStatus },

    #[error("No free order number after {attempts} attempts")]
    OrderNumberExhausted { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] store::StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<domain::aggregates::OrderError> for StorefrontError {
    fn from(e: domain::aggregates::OrderError) -> Self {
        match e {
            domain::aggregates::OrderError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

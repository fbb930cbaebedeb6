//! Order number generation.

use chrono::Utc;

use crate::domain::value_objects::OrderNumber;

/// Source of candidate order numbers. Uniqueness is finally enforced by the
/// order store; callers regenerate on conflict.
pub trait OrderNumberGenerator: Send + Sync {
    fn next(&self) -> OrderNumber;
}

/// Prefix, creation second and a random 32-bit hex suffix.
#[derive(Debug, Clone)]
pub struct TimestampedGenerator {
    prefix: String,
}

impl TimestampedGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for TimestampedGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}

impl OrderNumberGenerator for TimestampedGenerator {
    fn next(&self) -> OrderNumber {
        OrderNumber::compose(&self.prefix, Utc::now(), rand::random::<u32>())
    }
}

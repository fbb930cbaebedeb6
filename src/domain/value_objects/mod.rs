//! Value Objects for the storefront

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Money value object. Amounts are pounds sterling held at two decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp(2);
        amount.rescale(2);
        Self(amount)
    }
    pub fn zero() -> Self { Self::new(Decimal::ZERO) }
    /// Largest unit price a line may carry (999,999.99).
    pub fn max_unit_price() -> Self { Self::new(Decimal::new(99_999_999, 2)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn is_positive(&self) -> bool { self.0 > Decimal::ZERO }
    pub fn checked_multiply(&self, qty: Quantity) -> Option<Money> {
        self.0.checked_mul(Decimal::from(qty.value())).map(Money::new)
    }
    pub fn checked_add(&self, other: Money) -> Option<Money> { self.0.checked_add(other.0).map(Money::new) }
    /// Sums amounts, `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts.into_iter().try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
    /// Saturates instead of overflowing. Use `checked_multiply` where overflow must be reported.
    pub fn multiply(&self, qty: Quantity) -> Money { Money::new(self.0.saturating_mul(Decimal::from(qty.value()))) }
}

impl Default for Money { fn default() -> Self { Self::zero() } }

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money::new(self.0.saturating_add(other.0)) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), Add::add) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Money::new(amount) }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Decimal { m.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "£{:.2}", self.0) }
}

/// Quantity value object. Always between one and [`Quantity::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const MAX: u32 = 999;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
    pub fn one() -> Self { Self(1) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn checked_add(&self, other: Quantity) -> Option<Self> { Self::new(self.0 + other.0).ok() }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Quantity::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "quantity must be at least 1"),
            Self::TooLarge => write!(f, "quantity must be at most {}", Quantity::MAX),
        }
    }
}

/// Externally visible order identifier, distinct from the row id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// `{PREFIX}-{YYYYMMDD}-{HHMMSS}-{8 hex}`: sorts by creation second, suffix separates same-second orders.
    pub fn compose(prefix: &str, at: DateTime<Utc>, suffix: u32) -> Self {
        Self(format!("{}-{}-{:08X}", prefix.trim().to_uppercase(), at.format("%Y%m%d-%H%M%S"), suffix))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() { return Err(OrderNumberError::Empty); }
        if value.len() > 50 { return Err(OrderNumberError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(OrderNumberError::InvalidCharacter);
        }
        Ok(Self(value.to_uppercase()))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderNumberError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for OrderNumberError {}
impl fmt::Display for OrderNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "order number empty"),
            Self::TooLong => write!(f, "order number too long"),
            Self::InvalidCharacter => write!(f, "order number has invalid characters"),
        }
    }
}

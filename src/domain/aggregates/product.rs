//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::Money;

/// Catalog item. Read-only to the order workflow; edited through the admin side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    category: Category,
    price: Money,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    ingredients: String,
    #[serde(default)]
    allergens: String,
    #[serde(default = "available_by_default")]
    is_available: bool,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

fn available_by_default() -> bool { true }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category { Birthday, Wedding, Vegan, Treats }

impl Category {
    pub const ALL: [Category; 4] = [Category::Birthday, Category::Wedding, Category::Vegan, Category::Treats];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Birthday => "birthday", Self::Wedding => "wedding", Self::Vegan => "vegan", Self::Treats => "treats" }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Birthday => "Birthday Cakes",
            Self::Wedding => "Wedding Cakes",
            Self::Vegan => "Vegan Cakes",
            Self::Treats => "Treats",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Category {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birthday" => Ok(Self::Birthday),
            "wedding" => Ok(Self::Wedding),
            "vegan" => Ok(Self::Vegan),
            "treats" | "treat" => Ok(Self::Treats),
            other => Err(ProductError::UnknownCategory(other.to_string())),
        }
    }
}

impl Product {
    pub fn create(name: impl Into<String>, category: Category, price: Money) -> Result<Self, ProductError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if price.is_negative() { return Err(ProductError::NegativePrice); }
        Ok(Self {
            id: Uuid::now_v7(), name, description: String::new(), category, price,
            image_url: None, ingredients: String::new(), allergens: String::new(),
            is_available: true, created_at: Utc::now(),
        })
    }

    /// Rebuilds a product from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid, name: String, description: String, category: Category, price: Money,
        image_url: Option<String>, ingredients: String, allergens: String, is_available: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id, name, description, category, price, image_url, ingredients, allergens, is_available, created_at }
    }

    pub fn unavailable(mut self) -> Self { self.is_available = false; self }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn category(&self) -> Category { self.category }
    pub fn price(&self) -> Money { self.price }
    pub fn image_url(&self) -> Option<&str> { self.image_url.as_deref() }
    pub fn ingredients(&self) -> &str { &self.ingredients }
    pub fn allergens(&self) -> &str { &self.allergens }
    pub fn is_available(&self) -> bool { self.is_available }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Case-insensitive name match used by catalog search.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.name.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NegativePrice, UnknownCategory(String) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::NegativePrice => write!(f, "Negative price"),
            Self::UnknownCategory(c) => write!(f, "Unknown category '{c}'"),
        }
    }
}

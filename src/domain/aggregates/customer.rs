//! Customer Profile Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::AccountId;

/// Contact and address defaults for an account. One per account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    account_id: AccountId,
    phone_number: String,
    address: String,
    city: String,
    postcode: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Values submitted at checkout. Blank entries never overwrite stored ones.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

impl CustomerProfile {
    pub fn new(account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            account_id, phone_number: String::new(), address: String::new(), city: String::new(),
            postcode: String::new(), created_at: now, updated_at: now,
        }
    }

    pub fn restore(
        account_id: AccountId, phone_number: String, address: String, city: String, postcode: String,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { account_id, phone_number, address, city, postcode, created_at, updated_at }
    }

    pub fn account_id(&self) -> AccountId { self.account_id }
    pub fn phone_number(&self) -> &str { &self.phone_number }
    pub fn address(&self) -> &str { &self.address }
    pub fn city(&self) -> &str { &self.city }
    pub fn postcode(&self) -> &str { &self.postcode }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Applies the non-blank submitted values. Returns whether anything changed.
    pub fn refresh(&mut self, update: &ProfileUpdate) -> bool {
        let mut changed = false;
        changed |= replace_if_present(&mut self.phone_number, update.phone_number.as_deref());
        changed |= replace_if_present(&mut self.address, update.address.as_deref());
        changed |= replace_if_present(&mut self.city, update.city.as_deref());
        changed |= replace_if_present(&mut self.postcode, update.postcode.as_deref());
        if changed { self.updated_at = Utc::now(); }
        changed
    }
}

fn replace_if_present(field: &mut String, value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && v != field.as_str() => { *field = v.to_string(); true }
        _ => false,
    }
}

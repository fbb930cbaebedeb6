//! Delivery fee policies.

use crate::domain::aggregates::FulfillmentDetails;
use crate::domain::value_objects::Money;

/// Prices delivery for an order. Only consulted for delivery orders.
pub trait DeliveryFeePolicy: Send + Sync {
    fn delivery_fee(&self, postcode: &str, subtotal: Money) -> Money;
}

/// Same fee for every delivery.
#[derive(Debug, Clone, Copy)]
pub struct FlatDeliveryFee(pub Money);

impl DeliveryFeePolicy for FlatDeliveryFee {
    fn delivery_fee(&self, _postcode: &str, _subtotal: Money) -> Money {
        self.0
    }
}

/// Fee looked up by postcode area (the leading letters, `LS` in `LS1 1AA`).
#[derive(Debug, Clone)]
pub struct PostcodeAreaFee {
    areas: Vec<(String, Money)>,
    fallback: Money,
}

impl PostcodeAreaFee {
    pub fn new(areas: impl IntoIterator<Item = (String, Money)>, fallback: Money) -> Self {
        let areas = areas.into_iter().map(|(a, fee)| (a.trim().to_uppercase(), fee)).collect();
        Self { areas, fallback }
    }
}

pub fn postcode_area(postcode: &str) -> String {
    postcode
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

impl DeliveryFeePolicy for PostcodeAreaFee {
    fn delivery_fee(&self, postcode: &str, _subtotal: Money) -> Money {
        let area = postcode_area(postcode);
        self.areas
            .iter()
            .find(|(a, _)| *a == area)
            .map_or(self.fallback, |(_, fee)| *fee)
    }
}

/// Zero for collection; the policy's fee for delivery.
pub fn fee_for(policy: &dyn DeliveryFeePolicy, fulfillment: &FulfillmentDetails, subtotal: Money) -> Money {
    match fulfillment {
        FulfillmentDetails::Collection { .. } => Money::zero(),
        FulfillmentDetails::Delivery { postcode, .. } => policy.delivery_fee(postcode, subtotal),
    }
}

//! Application services and their wiring.

use std::sync::Arc;

use crate::services::events::EventPublisher;
use crate::services::notifications::{LogTransport, MessageTransport};
use crate::services::order_number::{OrderNumberGenerator, TimestampedGenerator};
use crate::services::pricing::{DeliveryFeePolicy, FlatDeliveryFee};
use crate::store::memory::{MemoryCatalog, MemoryCustomers, MemoryOrders};
use crate::store::{CatalogStore, CustomerStore, OrderStore};

pub mod cart;
pub mod checkout;
pub mod events;
pub mod notifications;
pub mod order_number;
pub mod orders;
pub mod pricing;

#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn memory(catalog: MemoryCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            customers: Arc::new(MemoryCustomers::new()),
            orders: Arc::new(MemoryOrders::new()),
        }
    }
}

/// Collaborators shared by the services.
#[derive(Clone)]
pub struct Dependencies {
    pub stores: Stores,
    pub numbers: Arc<dyn OrderNumberGenerator>,
    pub fees: Arc<dyn DeliveryFeePolicy>,
    pub transport: Arc<dyn MessageTransport>,
    pub events: EventPublisher,
}

impl Dependencies {
    /// Default generator, flat fee, log transport and no event publishing.
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            numbers: Arc::new(TimestampedGenerator::default()),
            fees: Arc::new(FlatDeliveryFee(crate::config::default_delivery_fee())),
            transport: Arc::new(LogTransport),
            events: EventPublisher::disabled(),
        }
    }

    pub fn with_numbers(mut self, numbers: Arc<dyn OrderNumberGenerator>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_fees(mut self, fees: Arc<dyn DeliveryFeePolicy>) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }
}

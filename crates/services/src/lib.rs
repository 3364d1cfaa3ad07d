//! External collaborator interfaces for the fulfillment core.
//!
//! The checkout and payment orchestrators never own stock quantities,
//! catalog data, or cart contents; they reach those systems only through
//! the narrow traits defined here. Each trait ships an in-memory double
//! with failure switches and call counters for tests.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod publisher;
pub mod stock;

pub use cart::{Cart, CartGateway, CartItem, InMemoryCartGateway};
pub use catalog::{CatalogOracle, CatalogProduct, InMemoryCatalog};
pub use error::ServiceError;
pub use publisher::{EventPublisher, InMemoryEventPublisher};
pub use stock::{InMemoryStockLedger, StockDelta, StockLedger};

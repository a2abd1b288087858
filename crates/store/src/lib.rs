//! Transactional storage for the shop backend.
//!
//! Every read and write goes through a [`StoreTransaction`]. Two
//! implementations are provided: [`InMemoryStore`] for tests and local runs,
//! and [`PostgresStore`] backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FaultPoint, InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use records::{
    CartContentRecord, CartLineRecord, CartRecord, OrderLineRecord, OrderRecord, ProductRecord,
    ProductUpdate, StockReservation,
};
pub use store::{Store, StoreTransaction};

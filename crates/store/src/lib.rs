//! Durable store adapter for the order saga.
//!
//! Exposes CRUD primitives over the three record kinds (`Order`, `Piece`,
//! `SagaHistoryEntry`) behind the [`OrderStore`] trait, with a PostgreSQL
//! implementation for production and an in-memory implementation for tests.
//! Status updates are compare-and-set: the store's row-level atomicity, not
//! an application lock, decides the winner of racing transitions.

mod error;
mod memory;
mod postgres;
mod records;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{NewOrder, Order, Piece, SagaHistoryEntry};
pub use store::OrderStore;

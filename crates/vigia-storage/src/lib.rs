//! Persistence layer for reports, preventive actions and their follow-ups.
//!
//! [`Store`] wraps a SeaORM connection to a single SQLite database in WAL
//! mode. Users, catalogs, folio counters, reports, actions and follow-ups
//! each get their own module under [`store`]; multi-row writes run in one
//! transaction.

pub mod auth;
pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{Result, StorageError};
pub use store::{CatalogSync, Store};

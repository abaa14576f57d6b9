//! Database layer for the waste collection tracker.
//!
//! Provides SQLite storage with embedded migrations and one query module per
//! table.

pub mod collections;
pub mod customers;
pub mod drivers;
pub mod models;
pub mod pool;
pub mod routes;

pub use pool::DbPool;

//! In-memory data store.
//!
//! Keeps every collection in process memory. Useful for tests and for
//! applications that do not need durability.

mod store;

pub use store::*;

//! Document database adapter.
//!
//! [DocumentDataStore] implements the storage port on top of a
//! [DocumentDriver], translating records, queries and options into BSON.
//! The driver owns the connection; the adapter owns the translation.

mod driver;
mod store;
pub mod translate;

pub use driver::*;
pub use store::*;

//! The storage port and its backends.
//!
//! Every backend implements [DataStoreProvider] and is shared as a
//! [DataStore]. Records cross the port as plain [Document](crate::collection::Document)s
//! in envelope form; queries cross it serialized.
//!
//! # Backends
//!
//! - [MemoryDataStore]: process-local collections, evaluates queries with
//!   [matches](crate::query::matches)
//! - [DocumentDataStore](document::DocumentDataStore): adapter over a
//!   document database driver
//! - [NoOpDataStore]: the initial default, refuses every operation
//!
//! # Binding
//!
//! A storage-root class may carry its own store. Classes whose root has none
//! fall back to the process-wide default, see [set_default_data_store].

mod data_store;
mod default_store;
pub mod document;
mod find_options;
pub mod memory;
mod noop;
mod search_result;

pub use data_store::*;
pub use default_store::*;
pub use find_options::*;
pub use memory::MemoryDataStore;
pub use noop::*;
pub use search_result::*;

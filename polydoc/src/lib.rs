//! # polydoc - Polymorphic Object-Document Mapper
//!
//! polydoc maps typed entities onto document collections behind pluggable
//! storage backends. Class identity and inheritance survive every
//! serialization boundary: a record read back from storage, or an envelope
//! received over the wire, is rebuilt as the concrete class it was saved as.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polydoc::model::ModelClass;
//! use polydoc::store::{set_default_data_store, DataStore, MemoryDataStore};
//! use polydoc::doc;
//!
//! set_default_data_store(DataStore::new(MemoryDataStore::new()));
//!
//! let user = ModelClass::builder("User")
//!     .fields(["email", "firstName", "lastName"])
//!     .register()?;
//!
//! let saved = user
//!     .new_model()
//!     .with("email", "ann@example.com")?
//!     .with("lastName", "Smith")?
//!     .save()?;
//!
//! let smiths = user.search(doc! { "lastName": "Smith" })?.all()?;
//! let again = user.find(&saved.id())?;
//! ```
//!
//! ## Inheritance
//!
//! A class may extend another. Every class below the topmost ancestor (the
//! storage root) shares the root's collection and store, and each record
//! carries its class chain. Searching a class returns records of that class
//! and of its descendants; finding a sibling's record by id is "not found".
//!
//! ## Module Organization
//!
//! - [`collection`] - [Document](collection::Document) and [ModelId](collection::ModelId)
//! - [`common`] - the value model, typed conversion, reserved names
//! - [`errors`] - error types and result alias
//! - [`model`] - classes, the class registry, models and the envelope codec
//! - [`query`] - backend-agnostic queries and the in-memory matcher
//! - [`store`] - the storage port, memory, no-op and document-store backends
//! - [`cursor`] - lazily drained, cached search results
//! - [`event`] - the persistence event feed
//! - [`audit`] - an audit trail observer
//! - [`odm`] / [`odm_builder`] - one-step wiring and teardown

use crate::common::{atomic, Atomic};
use crate::event::PersistObserver;
use crate::model::ModelClass;
use crate::store::{DataStore, NoOpDataStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, LazyLock};

pub mod audit;
pub mod collection;
pub mod common;
pub mod cursor;
pub mod errors;
pub mod event;
pub mod model;
pub mod odm;
pub mod odm_builder;
pub mod query;
pub mod store;

pub(crate) static CLASS_REGISTRY: LazyLock<RwLock<HashMap<String, ModelClass>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub(crate) static DEFAULT_DATA_STORE: LazyLock<Atomic<Option<DataStore>>> =
    LazyLock::new(|| atomic(Some(DataStore::new(NoOpDataStore))));

pub(crate) static OBSERVERS: LazyLock<Atomic<Vec<(u64, Arc<dyn PersistObserver>)>>> =
    LazyLock::new(|| atomic(Vec::new()));

pub(crate) static OBSERVER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}

use crate::collection::{Document, ModelId};
use crate::errors::OdmResult;
use crate::store::{FindOptions, SearchResult};
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// What a delete removes: a single record by id, or every record matching a
/// serialized query.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Id(ModelId),
    Query(Document),
}

/// The storage port every backend implements.
///
/// Records are envelopes without the persisted flag: declared fields, `id`
/// and the class chain. Queries arrive in serialized form (see
/// [Query::serialize](crate::query::Query::serialize)); a backend evaluates
/// them itself or translates them into its native dialect.
///
/// Backends are shared across threads, so every method takes `&self` and
/// implementations synchronize internally.
pub trait DataStoreProvider: Send + Sync {
    /// Stores a new record and returns its id. A record that already carries
    /// a non-empty id is stored under that id.
    fn create(&self, collection: &str, record: Document) -> OdmResult<ModelId>;

    /// Replaces the record with the same id. Fails when the record has no id.
    fn update(&self, collection: &str, record: Document) -> OdmResult<ModelId>;

    /// Deletes by id or by query, returning whether anything was removed.
    fn delete(&self, collection: &str, target: &DeleteTarget) -> OdmResult<bool>;

    fn find(
        &self,
        collection: &str,
        id: &ModelId,
        options: &FindOptions,
    ) -> OdmResult<Option<Document>>;

    /// Starts a search. The count of the result is independent of how much
    /// of the stream is consumed.
    fn search(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> OdmResult<SearchResult>;

    /// Removes a whole collection, returning whether it existed.
    fn drop_collection(&self, collection: &str) -> OdmResult<bool>;

    fn create_index(&self, collection: &str, spec: &Document, options: &Document) -> OdmResult<()>;

    fn close(&self) -> OdmResult<()>;
}

/// A shareable handle to a [DataStoreProvider].
///
/// Clones point at the same backend.
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<dyn DataStoreProvider>,
}

impl DataStore {
    pub fn new<T: DataStoreProvider + 'static>(inner: T) -> Self {
        DataStore {
            inner: Arc::new(inner),
        }
    }

    /// Whether both handles point at the same backend.
    pub fn same_store(&self, other: &DataStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for DataStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataStore({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}

impl Deref for DataStore {
    type Target = Arc<dyn DataStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

use crate::collection::{Document, ModelId};
use crate::common::NOT_PERMITTED_MESSAGE;
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::store::{DataStoreProvider, DeleteTarget, FindOptions, SearchResult};

/// A guard backend that rejects every operation.
///
/// It is the initial process-wide default store, so a class that was never
/// bound to a real backend fails loudly instead of silently dropping writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDataStore;

fn not_permitted<T>(operation: &str, collection: &str) -> OdmResult<T> {
    log::error!("{} on {}: {}", operation, collection, NOT_PERMITTED_MESSAGE);
    Err(OdmError::new(
        NOT_PERMITTED_MESSAGE,
        ErrorKind::OperationNotPermitted,
    ))
}

impl DataStoreProvider for NoOpDataStore {
    fn create(&self, collection: &str, _record: Document) -> OdmResult<ModelId> {
        not_permitted("CREATE", collection)
    }

    fn update(&self, collection: &str, _record: Document) -> OdmResult<ModelId> {
        not_permitted("UPDATE", collection)
    }

    fn delete(&self, collection: &str, _target: &DeleteTarget) -> OdmResult<bool> {
        not_permitted("DELETE", collection)
    }

    fn find(&self, collection: &str, _id: &ModelId, _options: &FindOptions) -> OdmResult<Option<Document>> {
        not_permitted("FIND", collection)
    }

    fn search(&self, collection: &str, _query: &Document, _options: &FindOptions) -> OdmResult<SearchResult> {
        not_permitted("SEARCH", collection)
    }

    fn drop_collection(&self, collection: &str) -> OdmResult<bool> {
        not_permitted("DROP", collection)
    }

    fn create_index(&self, collection: &str, _spec: &Document, _options: &Document) -> OdmResult<()> {
        not_permitted("CREATE INDEX", collection)
    }

    fn close(&self) -> OdmResult<()> {
        not_permitted("CLOSE", "store")
    }
}

use crate::errors::OdmResult;
use bson::{Bson, Document as NativeDocument};

/// Native find options in the document store's own terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeFindOptions {
    pub projection: Option<NativeDocument>,
    pub sort: Option<NativeDocument>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

/// A server-side cursor opened by [DocumentDriver::find].
///
/// The adapter closes the cursor when the record stream built on it is
/// dropped, drained or not.
pub trait DocumentCursor: Send {
    fn next_document(&mut self) -> OdmResult<Option<NativeDocument>>;

    fn close(&mut self) -> OdmResult<()>;
}

/// The subset of a document database driver the adapter needs.
///
/// Implementations wrap a real client; transport, pooling and retries are
/// theirs. Failures are reported as [ErrorKind::BackendError](crate::errors::ErrorKind)
/// with the driver's error as cause.
pub trait DocumentDriver: Send + Sync {
    /// Inserts a document and returns its `_id`, generating one when the
    /// document has none.
    fn insert_one(&self, collection: &str, document: NativeDocument) -> OdmResult<Bson>;

    /// Applies `update` (`$set` and `$unset` operators) to the first document
    /// matching `filter` and returns the number of matched documents.
    fn update_one(
        &self,
        collection: &str,
        filter: NativeDocument,
        update: NativeDocument,
    ) -> OdmResult<u64>;

    fn find_one(
        &self,
        collection: &str,
        filter: NativeDocument,
        options: &NativeFindOptions,
    ) -> OdmResult<Option<NativeDocument>>;

    fn find(
        &self,
        collection: &str,
        filter: NativeDocument,
        options: &NativeFindOptions,
    ) -> OdmResult<Box<dyn DocumentCursor>>;

    /// Counts documents matching `filter`, ignoring skip and limit.
    fn count(&self, collection: &str, filter: NativeDocument) -> OdmResult<u64>;

    fn delete_many(&self, collection: &str, filter: NativeDocument) -> OdmResult<u64>;

    /// Drops a collection, returning whether it existed.
    fn drop_collection(&self, collection: &str) -> OdmResult<bool>;

    fn create_index(
        &self,
        collection: &str,
        keys: NativeDocument,
        options: NativeDocument,
    ) -> OdmResult<()>;

    fn close(&self) -> OdmResult<()>;
}

use crate::collection::{Document, ModelId};
use crate::common::NATIVE_ID;
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::store::document::translate::{
    from_native_record, id_from_native, native_id, to_native_document, to_native_filter,
    to_native_options, to_native_record,
};
use crate::store::document::{DocumentCursor, DocumentDriver, NativeFindOptions};
use crate::store::{DataStoreProvider, DeleteTarget, FindOptions, LazyCount, SearchResult};
use bson::{doc as native_doc, Bson, Document as NativeDocument};
use std::sync::Arc;

/// A data store backed by a document database.
///
/// The adapter translates records, queries and options into the driver's
/// native dialect (see [translate](crate::store::document::translate)) and
/// leaves transport to the [DocumentDriver]. Driver errors are passed through
/// as they are.
///
/// ```rust,ignore
/// let store = DataStore::new(DocumentDataStore::new(MongoDriver::connect(url)?));
/// let user = ModelClass::builder("User").fields(["email"]).data_store(store).register()?;
/// ```
#[derive(Clone)]
pub struct DocumentDataStore {
    driver: Arc<dyn DocumentDriver>,
}

impl DocumentDataStore {
    pub fn new<D: DocumentDriver + 'static>(driver: D) -> DocumentDataStore {
        DocumentDataStore {
            driver: Arc::new(driver),
        }
    }

    pub fn from_shared(driver: Arc<dyn DocumentDriver>) -> DocumentDataStore {
        DocumentDataStore { driver }
    }
}

impl DataStoreProvider for DocumentDataStore {
    fn create(&self, collection: &str, record: Document) -> OdmResult<ModelId> {
        let native = to_native_record(&record);
        let inserted = self.driver.insert_one(collection, native)?;
        let id = id_from_native(&inserted);
        log::debug!("CREATE - {}({})", collection, id);
        Ok(id)
    }

    fn update(&self, collection: &str, record: Document) -> OdmResult<ModelId> {
        let id = record.id();
        if id.is_empty() {
            log::error!("Cannot update a record without an id in {}", collection);
            return Err(OdmError::new(
                &format!("Cannot update a record without an id in {}", collection),
                ErrorKind::NotIdentifiable,
            ));
        }

        let filter = id_filter(&id);
        let mut values = to_native_record(&record);
        values.remove(NATIVE_ID);

        // fields unset since the record was stored
        let removed: NativeDocument = match self.driver.find_one(
            collection,
            filter.clone(),
            &NativeFindOptions::default(),
        )? {
            Some(stored) => stored
                .keys()
                .filter(|key| key.as_str() != NATIVE_ID && !values.contains_key(key.as_str()))
                .map(|key| (key.clone(), Bson::String(String::new())))
                .collect(),
            None => NativeDocument::new(),
        };

        let mut update = native_doc! { "$set": values };
        if !removed.is_empty() {
            update.insert("$unset", removed);
        }
        let matched = self.driver.update_one(collection, filter, update)?;
        log::debug!("UPDATE - {}({}) matched {}", collection, id, matched);
        Ok(id)
    }

    fn delete(&self, collection: &str, target: &DeleteTarget) -> OdmResult<bool> {
        let filter = match target {
            DeleteTarget::Id(id) if id.is_empty() => return Ok(false),
            DeleteTarget::Id(id) => id_filter(id),
            DeleteTarget::Query(query) => to_native_filter(query),
        };
        let deleted = self.driver.delete_many(collection, filter)?;
        log::debug!("DELETE - {}({:?}) {} records", collection, target, deleted);
        Ok(deleted > 0)
    }

    fn find(&self, collection: &str, id: &ModelId, options: &FindOptions) -> OdmResult<Option<Document>> {
        if id.is_empty() {
            return Ok(None);
        }
        let found = self.driver.find_one(
            collection,
            id_filter(id),
            &to_native_options(options),
        )?;
        log::debug!("FIND - {}({}) found: {}", collection, id, found.is_some());
        Ok(found.as_ref().map(from_native_record))
    }

    fn search(&self, collection: &str, query: &Document, options: &FindOptions) -> OdmResult<SearchResult> {
        let filter = to_native_filter(query);
        log::debug!("SEARCH - {}({})", collection, filter);

        let cursor = self
            .driver
            .find(collection, filter.clone(), &to_native_options(options))?;

        let driver = self.driver.clone();
        let collection = collection.to_string();
        let count = LazyCount::deferred(move || driver.count(&collection, filter.clone()));
        Ok(SearchResult::new(count, Box::new(NativeRecordStream::new(cursor))))
    }

    fn drop_collection(&self, collection: &str) -> OdmResult<bool> {
        log::debug!("DROP - {}", collection);
        self.driver.drop_collection(collection)
    }

    fn create_index(&self, collection: &str, spec: &Document, options: &Document) -> OdmResult<()> {
        log::debug!("CREATE INDEX - {}({})", collection, spec);
        self.driver
            .create_index(collection, to_native_document(spec), to_native_document(options))
    }

    fn close(&self) -> OdmResult<()> {
        self.driver.close()
    }
}

// closes the native cursor once it is exhausted, failed or dropped
struct NativeRecordStream {
    cursor: Box<dyn DocumentCursor>,
    closed: bool,
}

impl NativeRecordStream {
    fn new(cursor: Box<dyn DocumentCursor>) -> Self {
        NativeRecordStream {
            cursor,
            closed: false,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(err) = self.cursor.close() {
                log::warn!("Failed to close native cursor: {}", err);
            }
        }
    }
}

impl Iterator for NativeRecordStream {
    type Item = OdmResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        match self.cursor.next_document() {
            Ok(Some(native)) => Some(Ok(from_native_record(&native))),
            Ok(None) => {
                self.close();
                None
            }
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}

impl Drop for NativeRecordStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn id_filter(id: &ModelId) -> NativeDocument {
    let mut filter = NativeDocument::new();
    filter.insert(NATIVE_ID, native_id(id));
    filter
}

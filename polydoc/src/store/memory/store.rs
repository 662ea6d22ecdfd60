use crate::collection::{Document, ModelId};
use crate::common::{SortOrder, Value, ID_FIELD};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::query::matches;
use crate::store::{DataStoreProvider, DeleteTarget, FindOptions, LazyCount, SearchResult};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// The reference backend: collections are lists of records held in memory.
///
/// Ids are issued from a per-store sequence (`"1"`, `"2"`, ..). Updates
/// replace the record with the same id and move it to the end of its
/// collection. Every read-modify-write of a collection runs under that
/// collection's entry lock, so concurrent writers never lose records.
///
/// Searches evaluate the serialized query with [matches] over a snapshot of
/// the collection. The reported count is the number of matches before
/// offset and limit are applied.
#[derive(Clone, Default)]
pub struct MemoryDataStore {
    inner: Arc<MemoryDataStoreInner>,
}

impl MemoryDataStore {
    pub fn new() -> MemoryDataStore {
        MemoryDataStore {
            inner: Arc::new(MemoryDataStoreInner::default()),
        }
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of records held in `collection`.
    pub fn size(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(AtomicOrdering::Acquire)
    }
}

impl DataStoreProvider for MemoryDataStore {
    fn create(&self, collection: &str, record: Document) -> OdmResult<ModelId> {
        self.inner.create(collection, record)
    }

    fn update(&self, collection: &str, record: Document) -> OdmResult<ModelId> {
        self.inner.update(collection, record)
    }

    fn delete(&self, collection: &str, target: &DeleteTarget) -> OdmResult<bool> {
        self.inner.delete(collection, target)
    }

    fn find(&self, collection: &str, id: &ModelId, options: &FindOptions) -> OdmResult<Option<Document>> {
        self.inner.find(collection, id, options)
    }

    fn search(&self, collection: &str, query: &Document, options: &FindOptions) -> OdmResult<SearchResult> {
        self.inner.search(collection, query, options)
    }

    fn drop_collection(&self, collection: &str) -> OdmResult<bool> {
        self.inner.drop_collection(collection)
    }

    fn create_index(&self, collection: &str, spec: &Document, _options: &Document) -> OdmResult<()> {
        self.inner.check_opened()?;
        log::debug!("CREATE INDEX - {}({}) ignored by memory store", collection, spec);
        Ok(())
    }

    fn close(&self) -> OdmResult<()> {
        self.inner.closed.store(true, AtomicOrdering::Release);
        self.inner.collections.clear();
        Ok(())
    }
}

#[derive(Default)]
struct MemoryDataStoreInner {
    collections: DashMap<String, Vec<Document>>,
    id_sequence: AtomicU64,
    closed: AtomicBool,
}

impl MemoryDataStoreInner {
    fn check_opened(&self) -> OdmResult<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            log::error!("Memory store is closed");
            return Err(OdmError::new("Memory store is closed", ErrorKind::BackendError));
        }
        Ok(())
    }

    fn next_id(&self) -> ModelId {
        let next = self.id_sequence.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        ModelId::new(next.to_string())
    }

    fn create(&self, collection: &str, mut record: Document) -> OdmResult<ModelId> {
        self.check_opened()?;
        let mut id = record.id();
        if id.is_empty() {
            id = self.next_id();
        }
        record.put(ID_FIELD, Value::Id(id.clone()))?;

        log::debug!("CREATE - {}({})", collection, id);
        // a preset id replaces whatever record already holds it
        let mut records = self.collections.entry(collection.to_string()).or_default();
        records.retain(|existing| existing.id() != id);
        records.push(record);
        Ok(id)
    }

    fn update(&self, collection: &str, record: Document) -> OdmResult<ModelId> {
        self.check_opened()?;
        let id = record.id();
        if id.is_empty() {
            log::error!("Cannot update a record without an id in {}", collection);
            return Err(OdmError::new(
                &format!("Cannot update a record without an id in {}", collection),
                ErrorKind::NotIdentifiable,
            ));
        }

        log::debug!("UPDATE - {}({})", collection, id);
        let mut records = self.collections.entry(collection.to_string()).or_default();
        records.retain(|existing| existing.id() != id);
        records.push(record);
        Ok(id)
    }

    fn delete(&self, collection: &str, target: &DeleteTarget) -> OdmResult<bool> {
        self.check_opened()?;
        let Some(mut records) = self.collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = records.len();
        match target {
            DeleteTarget::Id(id) => records.retain(|record| &record.id() != id),
            DeleteTarget::Query(query) => records.retain(|record| !matches(query, record)),
        }
        let removed = before - records.len();
        log::debug!("DELETE - {}({:?}) {} records", collection, target, removed);
        Ok(removed > 0)
    }

    fn find(&self, collection: &str, id: &ModelId, options: &FindOptions) -> OdmResult<Option<Document>> {
        self.check_opened()?;
        let found = self
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|record| &record.id() == id).cloned());

        log::debug!("FIND - {}({}) found: {}", collection, id, found.is_some());
        match found {
            Some(record) if options.has_projection() => Ok(Some(options.project(&record)?)),
            other => Ok(other),
        }
    }

    fn search(&self, collection: &str, query: &Document, options: &FindOptions) -> OdmResult<SearchResult> {
        self.check_opened()?;
        let mut found: Vec<Document> = self
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches(query, record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let count = found.len() as u64;
        log::debug!("SEARCH - {}({}) {} records", collection, query, count);

        if !options.sort_fields().is_empty() {
            found.sort_by(|a, b| compare_records(a, b, options.sort_fields()));
        }

        let offset = options.offset_value().unwrap_or(0) as usize;
        let limit = options.limit_value().map(|l| l as usize).unwrap_or(usize::MAX);
        let page = found
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| {
                if options.has_projection() {
                    options.project(&record)
                } else {
                    Ok(record)
                }
            })
            .collect::<Vec<_>>();

        Ok(SearchResult::new(LazyCount::ready(count), Box::new(page.into_iter())))
    }

    fn drop_collection(&self, collection: &str) -> OdmResult<bool> {
        self.check_opened()?;
        log::debug!("DROP - {}", collection);
        Ok(self.collections.remove(collection).is_some())
    }
}

// stable, null first when ascending
fn compare_records(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in sort {
        let ordering = a.get(field).cmp(&b.get(field));
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

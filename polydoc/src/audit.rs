//! An audit trail built on the persistence event feed.

use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::event::{PersistEvent, PersistObserver, PersistOperation};
use crate::model::{codec, ModelClass};
use crate::query::Query;
use crate::store::DataStore;
use chrono::Utc;
use indexmap::IndexMap;

pub const AUDIT_EVENT_CLASS: &str = "AuditEvent";

pub const EVENT_OPERATION: &str = "eventOperation";
pub const COLLECTION_NAME: &str = "collectionName";
pub const EVENT_DATA: &str = "data";
pub const CREATED: &str = "created";

/// Records every persistence event as an `AuditEvent` entity.
///
/// Events from the audit collection itself are ignored. The recorded trail
/// can be replayed with [reconstruct](AuditLogger::reconstruct) to rebuild
/// the state of every audited collection.
///
/// ```rust,ignore
/// let logger = Arc::new(AuditLogger::new()?);
/// add_shared_persist_observer(logger.clone());
/// // ...
/// let state = logger.reconstruct()?;
/// ```
pub struct AuditLogger {
    event_class: ModelClass,
}

impl AuditLogger {
    /// A logger writing to the `AuditEvent` collection of the default store.
    pub fn new() -> OdmResult<AuditLogger> {
        AuditLogger::with_collection(AUDIT_EVENT_CLASS, None)
    }

    /// A logger writing to `collection`, on `store` when given.
    pub fn with_collection(collection: &str, store: Option<DataStore>) -> OdmResult<AuditLogger> {
        let mut builder = ModelClass::builder(AUDIT_EVENT_CLASS)
            .fields([EVENT_OPERATION, COLLECTION_NAME, EVENT_DATA, CREATED])
            .collection(collection);
        if let Some(store) = store {
            builder = builder.data_store(store);
        }
        Ok(AuditLogger {
            event_class: builder.register()?,
        })
    }

    pub fn event_class(&self) -> &ModelClass {
        &self.event_class
    }

    /// Replays the audit trail in recording order.
    ///
    /// Returns the records of every audited collection that was not dropped
    /// last, keyed by collection name in order of first appearance.
    pub fn reconstruct(&self) -> OdmResult<IndexMap<String, Vec<Document>>> {
        let mut state: IndexMap<String, Vec<Document>> = IndexMap::new();
        let mut cursor = self.event_class.search(Query::all())?;

        for event in cursor.iter() {
            let event = event?;
            let operation = event.get_as::<String>(EVENT_OPERATION)?;
            let collection = event.get_as::<String>(COLLECTION_NAME)?;
            let data = recorded_data(&event.get(EVENT_DATA));

            match operation.as_str() {
                "create" => state.entry(collection).or_default().push(data),
                "update" => {
                    let id = data.id();
                    match state
                        .get_mut(&collection)
                        .and_then(|records| records.iter_mut().find(|r| r.id() == id))
                    {
                        Some(record) => record.merge(&data),
                        None => log::warn!("Could not find record {} in {}", id, collection),
                    }
                }
                "delete" => {
                    let id = data.id();
                    if let Some(records) = state.get_mut(&collection) {
                        records.retain(|r| r.id() != id);
                    }
                }
                "drop" => {
                    state.shift_remove(&collection);
                }
                other => {
                    log::error!("Unknown audit operation {}", other);
                    return Err(OdmError::new(
                        &format!("Unknown audit operation {}", other),
                        ErrorKind::ObjectMappingError,
                    ));
                }
            }
        }
        Ok(state)
    }
}

impl PersistObserver for AuditLogger {
    fn on_persist(&self, event: &PersistEvent) -> OdmResult<()> {
        if event.collection_name() == self.event_class.collection_name() {
            return Ok(());
        }

        let audit_event = self
            .event_class
            .new_model()
            .with(EVENT_OPERATION, event.operation().as_str())?
            .with(COLLECTION_NAME, event.collection_name())?
            .with(EVENT_DATA, event.data().clone())?
            .with(CREATED, Utc::now())?;
        audit_event.save()?;
        Ok(())
    }
}

// audited records carry a class chain, so reading them back rehydrates
// them into models
fn recorded_data(value: &Value) -> Document {
    match value {
        Value::Model(model) => codec::storage_record(model),
        Value::Document(doc) => doc.clone(),
        _ => Document::new(),
    }
}

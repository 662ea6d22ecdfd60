use crate::collection::{Document, ModelId};
use crate::common::{Value, CLASS_CHAIN, ID_FIELD};
use crate::cursor::Cursor;
use crate::errors::OdmResult;
use crate::event::{notify_observers, PersistEvent, PersistOperation};
use crate::model::{codec, Model, ModelClass};
use crate::query::{field, Query};
use crate::store::{default_data_store, limit_to, DataStore, DeleteTarget, FindOptions};

// the storage root's binding wins over the process default
pub(crate) fn data_store_for(class: &ModelClass) -> OdmResult<DataStore> {
    match class.data_store() {
        Some(store) => Ok(store.clone()),
        None => default_data_store(class.collection_name()),
    }
}

pub(crate) fn create_record(class: &ModelClass, record: Document) -> OdmResult<ModelId> {
    let store = data_store_for(class)?;
    let collection = class.collection_name();
    let id = store.create(collection, record.clone())?;

    let mut data = record;
    data.put(ID_FIELD, Value::Id(id.clone()))?;
    notify_observers(PersistEvent::new(PersistOperation::Create, collection, data));
    Ok(id)
}

pub(crate) fn update_record(class: &ModelClass, record: Document) -> OdmResult<ModelId> {
    let store = data_store_for(class)?;
    let collection = class.collection_name();
    let id = store.update(collection, record.clone())?;
    notify_observers(PersistEvent::new(PersistOperation::Update, collection, record));
    Ok(id)
}

pub(crate) fn delete_record(class: &ModelClass, id: &ModelId) -> OdmResult<bool> {
    let store = data_store_for(class)?;
    let collection = class.collection_name();
    let deleted = store.delete(collection, &DeleteTarget::Id(id.clone()))?;
    if deleted {
        notify_observers(PersistEvent::new(
            PersistOperation::Delete,
            collection,
            id_payload(id),
        ));
    }
    Ok(deleted)
}

pub(crate) fn find_model(
    class: &ModelClass,
    id: &ModelId,
    options: &FindOptions,
) -> OdmResult<Option<Model>> {
    options.validate()?;
    let store = data_store_for(class)?;
    match store.find(class.collection_name(), id, options)? {
        // a record of a sibling class in the shared collection is not found
        Some(record) if codec::record_is_a(&record, class) => {
            Ok(Some(codec::restore_record(&record, class)?))
        }
        _ => Ok(None),
    }
}

pub(crate) fn search_models(
    class: &ModelClass,
    query: &Query,
    options: &FindOptions,
) -> OdmResult<Cursor> {
    options.validate()?;
    let store = data_store_for(class)?;
    let filter = scoped_filter(class, query);
    let result = store.search(class.collection_name(), &filter, options)?;
    Ok(Cursor::new(class, result))
}

pub(crate) fn find_first_model(
    class: &ModelClass,
    query: &Query,
    options: &FindOptions,
) -> OdmResult<Option<Model>> {
    let options = options.clone().merge(&limit_to(1));
    let mut cursor = search_models(class, query, &options)?;
    cursor.first()
}

pub(crate) fn delete_models(class: &ModelClass, query: &Query) -> OdmResult<usize> {
    let ids = search_models(class, query, &FindOptions::default())?
        .all()?
        .iter()
        .map(|model| Value::Id(model.id()))
        .collect::<Vec<_>>();
    if ids.is_empty() {
        return Ok(0);
    }

    let store = data_store_for(class)?;
    let collection = class.collection_name();
    let target = field(ID_FIELD).in_(ids.clone()).serialize();
    store.delete(collection, &DeleteTarget::Query(target))?;

    for id in &ids {
        let payload = Document::from_iter([(ID_FIELD.to_string(), id.clone())]);
        notify_observers(PersistEvent::new(PersistOperation::Delete, collection, payload));
    }
    Ok(ids.len())
}

pub(crate) fn drop_collection(class: &ModelClass) -> OdmResult<bool> {
    let store = data_store_for(class)?;
    let collection = class.collection_name();
    let dropped = store.drop_collection(collection)?;
    notify_observers(PersistEvent::new(
        PersistOperation::Drop,
        collection,
        Document::new(),
    ));
    Ok(dropped)
}

pub(crate) fn create_index(class: &ModelClass, spec: Document, options: Document) -> OdmResult<()> {
    let store = data_store_for(class)?;
    store.create_index(class.collection_name(), &spec, &options)
}

/// Serializes `query` and, for classes below the storage root, restricts it
/// to records whose class chain contains the class.
pub(crate) fn scoped_filter(class: &ModelClass, query: &Query) -> Document {
    let mut filter = query.serialize();
    if !class.is_storage_root() {
        filter.merge(&field(CLASS_CHAIN).eq(class.class_id()).serialize());
    }
    filter
}

fn id_payload(id: &ModelId) -> Document {
    Document::from_iter([(ID_FIELD.to_string(), Value::Id(id.clone()))])
}

//! Translation between polydoc values and BSON.
//!
//! `id` travels as `_id`. Ids that are valid ObjectId hex become ObjectIds,
//! any other id stays a string. Dates become BSON datetimes and lose
//! sub-millisecond precision.

use crate::collection::{Document, ModelId};
use crate::common::{Value, CLASS_CHAIN, ID_FIELD, NATIVE_ID, OP_AND, OP_OR};
use crate::model::codec;
use crate::store::document::NativeFindOptions;
use crate::store::FindOptions;
use bson::oid::ObjectId;
use bson::{Bson, Document as NativeDocument};
use chrono::DateTime;

pub fn native_id(id: &ModelId) -> Bson {
    match ObjectId::parse_str(id.as_str()) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(id.as_str().to_string()),
    }
}

pub fn id_from_native(value: &Bson) -> ModelId {
    match value {
        Bson::ObjectId(oid) => ModelId::new(oid.to_hex()),
        Bson::String(s) => ModelId::new(s.as_str()),
        Bson::Null => ModelId::EMPTY,
        other => ModelId::new(other.to_string()),
    }
}

pub fn to_native_value(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::I32(i) => Bson::Int32(*i),
        Value::I64(i) => Bson::Int64(*i),
        Value::F64(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Date(date) => Bson::DateTime(bson::DateTime::from_millis(date.timestamp_millis())),
        Value::Id(id) => native_id(id),
        Value::Array(items) => Bson::Array(items.iter().map(to_native_value).collect()),
        Value::Document(doc) => Bson::Document(to_native_document(doc)),
        Value::Model(model) => Bson::Document(to_native_document(&codec::to_js(model))),
    }
}

pub fn from_native_value(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::I32(*i),
        Bson::Int64(i) => Value::I64(*i),
        Bson::Double(f) => Value::F64(*f),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::Id(ModelId::new(oid.to_hex())),
        Bson::DateTime(date) => match DateTime::from_timestamp_millis(date.timestamp_millis()) {
            Some(date) => Value::Date(date),
            None => Value::Null,
        },
        Bson::Array(items) => Value::Array(items.iter().map(from_native_value).collect()),
        Bson::Document(doc) => Value::Document(from_native_document(doc)),
        other => {
            log::debug!("Reading unsupported BSON value {} as a string", other);
            Value::String(other.to_string())
        }
    }
}

pub fn to_native_document(doc: &Document) -> NativeDocument {
    doc.iter()
        .map(|(key, value)| (key.clone(), to_native_value(value)))
        .collect()
}

pub fn from_native_document(doc: &NativeDocument) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), from_native_value(value)))
        .collect()
}

/// A record as stored natively. An empty id is left out so the database
/// generates one.
pub fn to_native_record(record: &Document) -> NativeDocument {
    let mut native = NativeDocument::new();
    for (key, value) in record.iter() {
        if key == ID_FIELD {
            let id = record.id();
            if !id.is_empty() {
                native.insert(NATIVE_ID, native_id(&id));
            }
        } else {
            native.insert(key.clone(), to_native_value(value));
        }
    }
    native
}

pub fn from_native_record(native: &NativeDocument) -> Document {
    native
        .iter()
        .map(|(key, value)| {
            if key == NATIVE_ID {
                (ID_FIELD.to_string(), Value::Id(id_from_native(value)))
            } else {
                (key.clone(), from_native_value(value))
            }
        })
        .collect()
}

/// Translates a serialized query into a native filter.
///
/// `id` is renamed to `_id` at the top level and inside `$and`/`$or`
/// clauses, and the values compared against it become native ids.
pub fn to_native_filter(query: &Document) -> NativeDocument {
    let mut native = NativeDocument::new();
    for (key, value) in query.iter() {
        match key.as_str() {
            OP_AND | OP_OR => {
                let clauses = value
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| match item {
                                Value::Document(clause) => Bson::Document(to_native_filter(clause)),
                                other => to_native_value(other),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                native.insert(key.clone(), Bson::Array(clauses));
            }
            ID_FIELD => {
                native.insert(NATIVE_ID, id_filter_value(value));
            }
            _ => {
                native.insert(key.clone(), to_native_value(value));
            }
        }
    }
    native
}

// ids may arrive as strings, inside operator documents or in $in arrays
fn id_filter_value(value: &Value) -> Bson {
    match value {
        Value::Id(id) => native_id(id),
        Value::String(s) => native_id(&ModelId::new(s.as_str())),
        Value::Array(items) => Bson::Array(items.iter().map(id_filter_value).collect()),
        Value::Document(doc) => Bson::Document(
            doc.iter()
                .map(|(op, operand)| (op.clone(), id_filter_value(operand)))
                .collect(),
        ),
        other => to_native_value(other),
    }
}

fn native_field(field: &str) -> String {
    if field == ID_FIELD {
        NATIVE_ID.to_string()
    } else {
        field.to_string()
    }
}

/// Translates find options. Projections always keep the class chain; `_id`
/// is returned by the database unless excluded, and it never is.
pub fn to_native_options(options: &FindOptions) -> NativeFindOptions {
    let projection = if !options.includes().is_empty() {
        let mut projection = NativeDocument::new();
        for field in options.includes().iter().filter(|f| f.as_str() != ID_FIELD) {
            projection.insert(field.clone(), Bson::Int32(1));
        }
        projection.insert(CLASS_CHAIN, Bson::Int32(1));
        Some(projection)
    } else if !options.excludes().is_empty() {
        let projection: NativeDocument = options
            .excludes()
            .iter()
            .filter(|f| f.as_str() != ID_FIELD && f.as_str() != CLASS_CHAIN)
            .map(|f| (f.clone(), Bson::Int32(0)))
            .collect();
        if projection.is_empty() {
            None
        } else {
            Some(projection)
        }
    } else {
        None
    };

    let sort = if options.sort_fields().is_empty() {
        None
    } else {
        Some(
            options
                .sort_fields()
                .iter()
                .map(|(field, order)| (native_field(field), Bson::Int32(order.as_direction())))
                .collect(),
        )
    };

    NativeFindOptions {
        projection,
        sort,
        skip: options.offset_value(),
        limit: options.limit_value().map(|l| l as i64),
    }
}

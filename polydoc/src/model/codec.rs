//! Conversion between models and their plain envelope form.
//!
//! An *envelope* is a [Document] holding a model's declared fields plus two
//! reserved keys: `_classChain_`, the class identities from the storage root
//! down to the concrete class, and `_persisted_`, whether the model carried a
//! persisted snapshot. Records written to a data store are envelopes without
//! the persisted flag.
//!
//! Envelopes survive any JSON-like transport. [parse] walks an arbitrary
//! value and turns every nested envelope back into a [Model], so a model can
//! be embedded in another model's field and still come back typed.

use crate::collection::{Document, ModelId};
use crate::common::{Value, CLASS_CHAIN, ID_FIELD, PERSISTED_FLAG};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::{registry, Model, ModelClass};

/// Serializes a model into its envelope.
///
/// Fields are written in registry order. Unset fields are left out, the id
/// is always written, empty or not. Nested models become envelopes.
pub fn to_js(model: &Model) -> Document {
    let mut envelope = fields_of(model);
    let chain = model
        .model_class()
        .class_chain()
        .iter()
        .map(|id| Value::String(id.clone()))
        .collect();
    envelope.extend([
        (CLASS_CHAIN.to_string(), Value::Array(chain)),
        (PERSISTED_FLAG.to_string(), Value::Bool(model.is_persisted())),
    ]);
    envelope.into_iter().collect()
}

/// The record written to a data store: the envelope without the persisted
/// flag.
pub fn storage_record(model: &Model) -> Document {
    let mut record = to_js(model);
    record.remove(PERSISTED_FLAG);
    record
}

/// Rehydrates a model from an envelope, resolving the concrete class from
/// the last entry of its class chain.
pub fn from_js(envelope: &Document) -> OdmResult<Model> {
    deserialize(envelope, None, None)
}

/// Rehydrates a model as `class`.
///
/// The envelope's class chain, when present, must contain `class`. The
/// result is an instance of `class` itself and only its declared fields are
/// read; fields of a narrower stored class are dropped.
pub fn from_js_as(envelope: &Document, class: &ModelClass) -> OdmResult<Model> {
    deserialize(envelope, Some(class), None)
}

/// Rebuilds a model from a stored record. Stored records are persisted by
/// definition.
pub(crate) fn restore_record(record: &Document, class: &ModelClass) -> OdmResult<Model> {
    deserialize(record, Some(class), Some(true))
}

/// Walks `value` and rehydrates every embedded envelope into a model.
///
/// Envelopes whose class cannot be resolved are kept as plain documents and
/// their children are still parsed.
pub fn parse(value: &Value) -> Value {
    match value {
        Value::Document(doc) if doc.contains_key(CLASS_CHAIN) => match from_js(doc) {
            Ok(model) => Value::Model(Box::new(model)),
            Err(err) => {
                log::warn!("Keeping embedded envelope as plain data: {}", err);
                Value::Document(parse_document(doc))
            }
        },
        Value::Document(doc) => Value::Document(parse_document(doc)),
        Value::Array(items) => Value::Array(items.iter().map(parse).collect()),
        other => other.clone(),
    }
}

/// The class chain recorded in an envelope, if any.
pub fn recorded_chain(envelope: &Document) -> Option<Vec<String>> {
    match envelope.field(CLASS_CHAIN) {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

/// Whether a stored record belongs to `class`. A record written without a
/// class chain belongs to the storage root only.
pub fn record_is_a(record: &Document, class: &ModelClass) -> bool {
    match recorded_chain(record) {
        Some(chain) => chain.iter().any(|id| id == class.class_id()),
        None => class.is_storage_root(),
    }
}

pub fn to_json_string(model: &Model) -> OdmResult<String> {
    Ok(serde_json::to_string(&to_js(model))?)
}

/// Parses JSON text and rehydrates any envelopes it contains.
pub fn from_json_str(json: &str) -> OdmResult<Value> {
    let value: Value = serde_json::from_str(json)?;
    Ok(parse(&value))
}

/// Parses JSON text holding a single envelope.
pub fn model_from_json_str(json: &str) -> OdmResult<Model> {
    let envelope: Document = serde_json::from_str(json)?;
    from_js(&envelope)
}

fn fields_of(model: &Model) -> Vec<(String, Value)> {
    let data = model.data();
    model
        .model_class()
        .field_names()
        .iter()
        .filter_map(|name| {
            if name == ID_FIELD {
                return Some((name.clone(), Value::Id(data.id())));
            }
            match data.field(name) {
                Some(value) if !value.is_null() => Some((name.clone(), to_plain(value))),
                _ => None,
            }
        })
        .collect()
}

// embedded models become envelopes
pub(crate) fn to_plain(value: &Value) -> Value {
    match value {
        Value::Model(model) => Value::Document(to_js(model)),
        Value::Array(items) => Value::Array(items.iter().map(to_plain).collect()),
        Value::Document(doc) => Value::Document(
            doc.iter()
                .map(|(key, value)| (key.clone(), to_plain(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn parse_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), parse(value)))
        .collect()
}

fn deserialize(
    envelope: &Document,
    explicit: Option<&ModelClass>,
    persisted: Option<bool>,
) -> OdmResult<Model> {
    let chain = recorded_chain(envelope);
    let class = match explicit {
        Some(class) => {
            if let Some(chain) = &chain {
                if !chain.iter().any(|id| id == class.class_id()) {
                    log::error!(
                        "Envelope of class chain {:?} is not a {}",
                        chain,
                        class.class_id()
                    );
                    return Err(OdmError::new(
                        &format!(
                            "Envelope of class chain {:?} is not a {}",
                            chain,
                            class.class_id()
                        ),
                        ErrorKind::ClassMismatch,
                    ));
                }
            }
            class.clone()
        }
        None => match chain.as_ref().and_then(|chain| chain.last()) {
            Some(leaf) => registry::resolve_class(leaf)?,
            None => {
                log::error!("Envelope carries no class chain");
                return Err(OdmError::new(
                    "Envelope carries no class chain",
                    ErrorKind::ClassNotRegistered,
                ));
            }
        },
    };

    let data: Document = class
        .field_names()
        .iter()
        .filter_map(|name| {
            if name == ID_FIELD {
                return Some((name.clone(), Value::Id(id_of(envelope))));
            }
            match envelope.field(name) {
                Some(value) if !value.is_null() => Some((name.clone(), parse(value))),
                _ => None,
            }
        })
        .collect();

    let persisted = persisted
        .unwrap_or_else(|| matches!(envelope.field(PERSISTED_FLAG), Some(Value::Bool(true))));
    Ok(Model::restored(class, data, persisted))
}

fn id_of(envelope: &Document) -> ModelId {
    match envelope.field(ID_FIELD) {
        Some(Value::Id(id)) => id.clone(),
        Some(Value::String(id)) => ModelId::new(id.as_str()),
        Some(Value::I32(id)) => ModelId::new(id.to_string()),
        Some(Value::I64(id)) => ModelId::new(id.to_string()),
        _ => ModelId::EMPTY,
    }
}

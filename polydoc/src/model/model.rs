use crate::collection::{Document, ModelId};
use crate::common::{Convertible, Value, ID_FIELD};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::{codec, operations, ModelClass};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};

/// An instance of a [ModelClass].
///
/// A model holds its field values in a [Document] keyed by field name, with
/// the id under `id`. After a save or a read it also carries a *persisted
/// snapshot*: an independent copy of the data as it was last written to or
/// read from storage. The snapshot decides whether the next save creates or
/// updates.
///
/// Saving never mutates the model; it returns a new, unfrozen instance that
/// carries the stored id and a fresh snapshot.
///
/// ```rust,ignore
/// let fido = dog.new_model()
///     .with("name", "Fido")?
///     .with("isWild", false)?
///     .save()?;
/// assert!(fido.is_persisted());
/// assert!(!fido.id().is_empty());
/// ```
#[derive(Clone)]
pub struct Model {
    class: ModelClass,
    data: Document,
    persisted: Option<Document>,
    frozen: bool,
}

impl Model {
    /// Creates an empty model with [ModelId::EMPTY] as its id.
    pub fn new(class: &ModelClass) -> Model {
        Model {
            class: class.clone(),
            data: Document::from_iter([(ID_FIELD.to_string(), Value::Id(ModelId::EMPTY))]),
            persisted: None,
            frozen: false,
        }
    }

    // the snapshot is an independent copy of the restored data
    pub(crate) fn restored(class: ModelClass, data: Document, persisted: bool) -> Model {
        let persisted = if persisted { Some(data.clone()) } else { None };
        Model {
            class,
            data,
            persisted,
            frozen: false,
        }
    }

    pub fn model_class(&self) -> &ModelClass {
        &self.class
    }

    pub fn id(&self) -> ModelId {
        self.data.id()
    }

    pub fn set_id(&mut self, id: impl Into<ModelId>) -> OdmResult<()> {
        self.check_mutable()?;
        self.data.put(ID_FIELD, Value::Id(id.into()))
    }

    /// Returns the value of a field, [Value::Null] when unset.
    pub fn get(&self, field: &str) -> Value {
        self.data.get(field)
    }

    pub fn get_as<T: Convertible<Output = T>>(&self, field: &str) -> OdmResult<T> {
        T::from_value(&self.data.get(field))
    }

    /// Sets a declared field. Setting [Value::Null] unsets it.
    ///
    /// # Errors
    ///
    /// Fails when the model is frozen, when the field is not declared by the
    /// class or its ancestors, or when `id` is given something other than an
    /// id or a string.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> OdmResult<()> {
        self.check_mutable()?;
        if !self.class.declares(field) {
            log::error!(
                "Field {} is not declared for class {}",
                field,
                self.class.class_id()
            );
            return Err(OdmError::new(
                &format!(
                    "Field {} is not declared for class {}",
                    field,
                    self.class.class_id()
                ),
                ErrorKind::InvalidFieldName,
            ));
        }

        let value = value.into();
        if field == ID_FIELD {
            let id = match value {
                Value::Id(id) => id,
                Value::String(s) => ModelId::new(s),
                Value::Null => ModelId::EMPTY,
                other => {
                    log::error!("Value {} cannot be used as a model id", other);
                    return Err(OdmError::new(
                        &format!("Value {} cannot be used as a model id", other),
                        ErrorKind::InvalidId,
                    ));
                }
            };
            return self.data.put(ID_FIELD, Value::Id(id));
        }

        if value.is_null() {
            self.data.remove(field);
            Ok(())
        } else {
            self.data.put(field, value)
        }
    }

    /// Chaining form of [set](Self::set).
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> OdmResult<Model> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Makes the model read-only. Saving a frozen model still works and
    /// returns a mutable instance.
    pub fn freeze(mut self) -> Model {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.is_some()
    }

    /// The data as last written to or read from storage.
    pub fn persisted(&self) -> Option<&Document> {
        self.persisted.as_ref()
    }

    /// Whether the data differs from the persisted snapshot. An unsaved
    /// model always has changes.
    pub fn has_changes(&self) -> bool {
        match &self.persisted {
            Some(snapshot) => snapshot != &self.data,
            None => true,
        }
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn is_a(&self, class: &ModelClass) -> bool {
        self.class.is_a(class)
    }

    /// The envelope form of this model, see [codec::to_js].
    pub fn to_js(&self) -> Document {
        codec::to_js(self)
    }

    /// Writes the model to its class's data store.
    ///
    /// A model without a persisted snapshot is created; one with a snapshot
    /// is updated by id. Returns the saved instance.
    pub fn save(&self) -> OdmResult<Model> {
        let record = codec::storage_record(self);
        let id = if self.is_persisted() {
            if self.id().is_empty() {
                log::error!("Cannot update a {} without an id", self.class.class_id());
                return Err(OdmError::new(
                    &format!("Cannot update a {} without an id", self.class.class_id()),
                    ErrorKind::NotIdentifiable,
                ));
            }
            operations::update_record(&self.class, record)?;
            self.id()
        } else {
            operations::create_record(&self.class, record)?
        };

        let mut data = self.data.clone();
        data.put(ID_FIELD, Value::Id(id))?;
        Ok(Model::restored(self.class.clone(), data, true))
    }

    /// Removes the stored record with this model's id.
    pub fn delete(&self) -> OdmResult<bool> {
        if self.id().is_empty() {
            log::error!("Cannot delete a {} without an id", self.class.class_id());
            return Err(OdmError::new(
                &format!("Cannot delete a {} without an id", self.class.class_id()),
                ErrorKind::NotIdentifiable,
            ));
        }
        operations::delete_record(&self.class, &self.id())
    }

    fn check_mutable(&self) -> OdmResult<()> {
        if self.frozen {
            log::error!("Cannot modify a frozen {}", self.class.class_id());
            return Err(OdmError::new(
                &format!("Cannot modify a frozen {}", self.class.class_id()),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.class.class_id() == other.class.class_id()
            && self.data == other.data
            && self.is_persisted() == other.is_persisted()
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.class_id().hash(state);
        self.data.hash(state);
    }
}

impl Debug for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} {:?}",
            self.class.class_id(),
            if self.is_persisted() { "" } else { " (unsaved)" },
            self.data
        )
    }
}

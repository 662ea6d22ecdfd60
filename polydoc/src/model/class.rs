use crate::collection::{Document, ModelId};
use crate::common::{FIELD_SEPARATOR, ID_FIELD, RESERVED_FIELDS};
#[cfg(test)]
use crate::common::{CLASS_CHAIN, PERSISTED_FLAG};
use crate::cursor::Cursor;
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::{operations, registry, Model};
use crate::query::Query;
use crate::store::{DataStore, FindOptions};
use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Describes an entity type: its persisted fields, its place in an
/// inheritance chain and where its records are stored.
///
/// Classes are built once with [ModelClass::builder] and are cheap to clone;
/// all clones share the same descriptor. Subclasses are declared with
/// [ModelClassBuilder::extends] and inherit every ancestor field.
///
/// The topmost ancestor is the storage root. Every class below it shares the
/// root's collection and data store, and each stored record carries its class
/// chain so reads through a subclass can tell which records belong to it.
///
/// ```rust,ignore
/// let animal = ModelClass::builder("Animal")
///     .fields(["isAlive", "name"])
///     .data_store(store)
///     .register()?;
/// let dog = ModelClass::builder("Dog").extends(&animal).field("isWild").register()?;
/// let pug = ModelClass::builder("Pug").extends(&dog).field("sheds").register()?;
///
/// assert_eq!(pug.class_chain(), &["Animal", "Dog", "Pug"]);
/// assert_eq!(pug.collection_name(), "Animal");
/// ```
#[derive(Clone)]
pub struct ModelClass {
    inner: Arc<ModelClassInner>,
}

struct ModelClassInner {
    name: String,
    pinned_id: Option<String>,
    parent: Option<ModelClass>,
    own_fields: Vec<String>,
    collection_name: Option<String>,
    data_store: Option<DataStore>,
    field_names: OnceCell<Vec<String>>,
    class_chain: OnceCell<Vec<String>>,
}

impl ModelClass {
    pub fn builder(name: &str) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The identity recorded in class chains and used as the registry key:
    /// the pinned id when one was given, otherwise the class name.
    pub fn class_id(&self) -> &str {
        self.inner.pinned_id.as_deref().unwrap_or(&self.inner.name)
    }

    pub fn is_pinned(&self) -> bool {
        self.inner.pinned_id.is_some()
    }

    pub fn parent(&self) -> Option<&ModelClass> {
        self.inner.parent.as_ref()
    }

    /// The topmost ancestor, which owns the collection.
    pub fn base_class(&self) -> &ModelClass {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn is_storage_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Name of the physical collection shared by the whole hierarchy.
    pub fn collection_name(&self) -> &str {
        let base = self.base_class();
        base.inner
            .collection_name
            .as_deref()
            .unwrap_or(&base.inner.name)
    }

    /// The data store bound to the storage root, if any.
    pub fn data_store(&self) -> Option<&DataStore> {
        self.base_class().inner.data_store.as_ref()
    }

    /// Fields declared by this class itself, without inherited ones.
    pub fn own_fields(&self) -> &[String] {
        &self.inner.own_fields
    }

    /// Every persisted field: `id` first, then ancestor fields root first,
    /// without duplicates.
    pub fn field_names(&self) -> &[String] {
        self.inner.field_names.get_or_init(|| {
            let mut names = IndexSet::new();
            names.insert(ID_FIELD.to_string());
            for class in self.lineage() {
                for field in class.own_fields() {
                    names.insert(field.clone());
                }
            }
            names.into_iter().collect()
        })
    }

    pub fn declares(&self, field: &str) -> bool {
        self.field_names().iter().any(|f| f == field)
    }

    /// Class identities from the storage root down to this class.
    pub fn class_chain(&self) -> &[String] {
        self.inner.class_chain.get_or_init(|| {
            self.lineage()
                .iter()
                .map(|class| class.class_id().to_string())
                .collect()
        })
    }

    /// Whether this class is `other` or one of its descendants.
    pub fn is_a(&self, other: &ModelClass) -> bool {
        self.class_chain().iter().any(|id| id == other.class_id())
    }

    /// Creates an empty, unsaved instance of this class.
    pub fn new_model(&self) -> Model {
        Model::new(self)
    }

    /// Adds this class to the process-wide class registry so envelopes that
    /// name it can be rehydrated.
    pub fn register(&self) -> OdmResult<()> {
        registry::register_class(self)
    }

    /// Finds a record of this class (or a subclass) by id.
    ///
    /// A record stored under a sibling class in the same collection is
    /// reported as not found.
    pub fn find(&self, id: &ModelId) -> OdmResult<Option<Model>> {
        operations::find_model(self, id, &FindOptions::default())
    }

    pub fn find_with_options(&self, id: &ModelId, options: &FindOptions) -> OdmResult<Option<Model>> {
        operations::find_model(self, id, options)
    }

    /// Searches records of this class (or its subclasses) matching `query`.
    pub fn search(&self, query: impl Into<Query>) -> OdmResult<Cursor> {
        operations::search_models(self, &query.into(), &FindOptions::default())
    }

    pub fn search_with_options(&self, query: impl Into<Query>, options: &FindOptions) -> OdmResult<Cursor> {
        operations::search_models(self, &query.into(), options)
    }

    /// Reads only the first match, asking the backend for a single record.
    pub fn find_first(&self, query: impl Into<Query>) -> OdmResult<Option<Model>> {
        operations::find_first_model(self, &query.into(), &FindOptions::default())
    }

    /// Deletes every record of this class matching `query` and returns how
    /// many were removed.
    pub fn delete_where(&self, query: impl Into<Query>) -> OdmResult<usize> {
        operations::delete_models(self, &query.into())
    }

    /// Drops the whole collection of the storage root.
    pub fn drop(&self) -> OdmResult<bool> {
        operations::drop_collection(self)
    }

    pub fn create_index(&self, spec: Document, options: Document) -> OdmResult<()> {
        operations::create_index(self, spec, options)
    }

    // root first
    fn lineage(&self) -> Vec<ModelClass> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(parent) = current {
            chain.push(parent.clone());
            current = parent.parent();
        }
        chain.reverse();
        chain
    }

    pub(crate) fn same_definition(&self, other: &ModelClass) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.name() == other.name()
            && self.inner.pinned_id == other.inner.pinned_id
            && self.own_fields() == other.own_fields()
            && self.collection_name() == other.collection_name()
            && self.parent().map(|p| p.class_id()) == other.parent().map(|p| p.class_id())
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.class_id() == other.class_id()
    }
}

impl Eq for ModelClass {}

impl Hash for ModelClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_id().hash(state);
    }
}

impl Debug for ModelClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClass")
            .field("class_id", &self.class_id())
            .field("class_chain", &self.class_chain())
            .field("field_names", &self.field_names())
            .field("collection_name", &self.collection_name())
            .finish()
    }
}

/// Builder for [ModelClass].
///
/// Field declarations are idempotent; declaring `id` is a no-op because every
/// class carries it. Configuration mistakes are reported by [build](Self::build).
pub struct ModelClassBuilder {
    name: String,
    pinned_id: Option<String>,
    parent: Option<ModelClass>,
    fields: IndexSet<String>,
    collection_name: Option<String>,
    data_store: Option<DataStore>,
}

impl ModelClassBuilder {
    fn new(name: &str) -> Self {
        ModelClassBuilder {
            name: name.to_string(),
            pinned_id: None,
            parent: None,
            fields: IndexSet::new(),
            collection_name: None,
            data_store: None,
        }
    }

    pub fn extends(mut self, parent: &ModelClass) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn field(mut self, name: &str) -> Self {
        if name != ID_FIELD {
            self.fields.insert(name.to_string());
        }
        self
    }

    pub fn fields<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self = self.field(name);
        }
        self
    }

    /// Pins the class identity to a stable string instead of the class name.
    pub fn class_id(mut self, class_id: &str) -> Self {
        self.pinned_id = Some(class_id.to_string());
        self
    }

    /// Overrides the collection name. Only valid on a storage root.
    pub fn collection(mut self, collection_name: &str) -> Self {
        self.collection_name = Some(collection_name.to_string());
        self
    }

    /// Binds a data store. Only valid on a storage root.
    pub fn data_store(mut self, data_store: DataStore) -> Self {
        self.data_store = Some(data_store);
        self
    }

    pub fn build(self) -> OdmResult<ModelClass> {
        if self.name.is_empty() {
            log::error!("Model class name cannot be empty");
            return Err(OdmError::new(
                "Model class name cannot be empty",
                ErrorKind::InvalidConfiguration,
            ));
        }

        if let Some(pin) = &self.pinned_id {
            if pin.is_empty() {
                log::error!("Pinned class id of {} cannot be empty", self.name);
                return Err(OdmError::new(
                    &format!("Pinned class id of {} cannot be empty", self.name),
                    ErrorKind::InvalidConfiguration,
                ));
            }
        }

        if self.parent.is_some() && (self.data_store.is_some() || self.collection_name.is_some()) {
            log::error!(
                "Datastores may only be configured for storage-root classes, {} extends another class",
                self.name
            );
            return Err(OdmError::new(
                &format!(
                    "Datastores may only be configured for storage-root classes, {} extends another class",
                    self.name
                ),
                ErrorKind::InvalidConfiguration,
            ));
        }

        for field in &self.fields {
            validate_field_name(&self.name, field)?;
        }

        Ok(ModelClass {
            inner: Arc::new(ModelClassInner {
                name: self.name,
                pinned_id: self.pinned_id,
                parent: self.parent,
                own_fields: self.fields.into_iter().collect(),
                collection_name: self.collection_name,
                data_store: self.data_store,
                field_names: OnceCell::new(),
                class_chain: OnceCell::new(),
            }),
        })
    }

    /// Builds the class and adds it to the class registry.
    pub fn register(self) -> OdmResult<ModelClass> {
        let class = self.build()?;
        class.register()?;
        Ok(class)
    }
}

fn validate_field_name(class_name: &str, field: &str) -> OdmResult<()> {
    let reserved = RESERVED_FIELDS.contains(&field);
    if field.is_empty() || field.contains(FIELD_SEPARATOR) || reserved {
        log::error!("Invalid field name '{}' declared on {}", field, class_name);
        return Err(OdmError::new(
            &format!("Invalid field name '{}' declared on {}", field, class_name),
            ErrorKind::InvalidFieldName,
        ));
    }
    Ok(())
}

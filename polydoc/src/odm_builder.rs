use crate::errors::{OdmError, OdmResult};
use crate::event::PersistObserver;
use crate::model::{ModelClass, ModelClassBuilder};
use crate::odm::Odm;
use crate::store::DataStore;
use std::sync::Arc;

/// Collects the process-wide wiring of an application and applies it in one
/// step.
///
/// The first failing step is kept and reported by [open](OdmBuilder::open);
/// later steps are skipped.
///
/// ```rust,ignore
/// let odm = Odm::builder()
///     .default_data_store(DataStore::new(MemoryDataStore::new()))
///     .define(ModelClass::builder("User").fields(["email", "lastName"]))
///     .audit_log(true)
///     .open()?;
/// let user = odm.model_class("User")?;
/// ```
#[derive(Default)]
pub struct OdmBuilder {
    error: Option<OdmError>,
    default_store: Option<DataStore>,
    classes: Vec<ModelClass>,
    observers: Vec<Arc<dyn PersistObserver>>,
    audit_log: bool,
}

impl OdmBuilder {
    pub fn new() -> Self {
        OdmBuilder::default()
    }

    /// The store used by classes whose storage root has none bound.
    pub fn default_data_store(mut self, store: DataStore) -> Self {
        self.default_store = Some(store);
        self
    }

    /// Builds a class now and registers it on open.
    pub fn define(mut self, builder: ModelClassBuilder) -> Self {
        if self.error.is_none() {
            match builder.build() {
                Ok(class) => self.classes.push(class),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn model_class(mut self, class: ModelClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn observer<O: PersistObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn shared_observer(mut self, observer: Arc<dyn PersistObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Records every persistence event with an
    /// [AuditLogger](crate::audit::AuditLogger) in the default store.
    pub fn audit_log(mut self, enabled: bool) -> Self {
        self.audit_log = enabled;
        self
    }

    pub fn open(self) -> OdmResult<Odm> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Odm::open(self.default_store, self.classes, self.observers, self.audit_log)
    }
}

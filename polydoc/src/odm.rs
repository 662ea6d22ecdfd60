use crate::audit::{AuditLogger, AUDIT_EVENT_CLASS};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::event::{add_shared_persist_observer, remove_persist_observer, ObserverRef, PersistObserver};
use crate::model::{deregister_class, register_class, resolve_class, ModelClass};
use crate::odm_builder::OdmBuilder;
use crate::store::{current_default_data_store, reset_default_data_store, set_default_data_store, DataStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The wiring of an application: its default store, its registered classes
/// and its persistence observers.
///
/// Opening applies the wiring to the process-wide registries and
/// [close](Odm::close) undoes it. Clones share the same state.
#[derive(Clone)]
pub struct Odm {
    inner: Arc<OdmInner>,
}

struct OdmInner {
    default_store: Option<DataStore>,
    classes: Vec<ModelClass>,
    observers: Mutex<Vec<ObserverRef>>,
    audit_logger: Option<Arc<AuditLogger>>,
    closed: AtomicBool,
}

impl Odm {
    pub fn builder() -> OdmBuilder {
        OdmBuilder::new()
    }

    pub(crate) fn open(
        default_store: Option<DataStore>,
        classes: Vec<ModelClass>,
        observers: Vec<Arc<dyn PersistObserver>>,
        audit_log: bool,
    ) -> OdmResult<Odm> {
        if let Some(store) = &default_store {
            set_default_data_store(store.clone());
        }

        let mut registered = Vec::with_capacity(classes.len());
        for class in &classes {
            if let Err(e) = register_class(class) {
                // leave the registry as it was
                for done in &registered {
                    forget_class(done);
                }
                return Err(e);
            }
            registered.push(class.clone());
        }

        let audit_logger = if audit_log {
            match AuditLogger::new() {
                Ok(logger) => Some(Arc::new(logger)),
                Err(e) => {
                    for done in &registered {
                        forget_class(done);
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        let mut handles = observers
            .into_iter()
            .map(add_shared_persist_observer)
            .collect::<Vec<_>>();
        if let Some(logger) = &audit_logger {
            handles.push(add_shared_persist_observer(logger.clone()));
        }

        log::debug!(
            "Opened odm with {} classes and {} observers",
            registered.len(),
            handles.len()
        );
        Ok(Odm {
            inner: Arc::new(OdmInner {
                default_store,
                classes: registered,
                observers: Mutex::new(handles),
                audit_logger,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Resolves a registered class by id.
    pub fn model_class(&self, class_id: &str) -> OdmResult<ModelClass> {
        self.check_opened()?;
        resolve_class(class_id)
    }

    /// Classes registered when this instance was opened.
    pub fn classes(&self) -> &[ModelClass] {
        &self.inner.classes
    }

    pub fn default_data_store(&self) -> Option<&DataStore> {
        self.inner.default_store.as_ref()
    }

    pub fn audit_logger(&self) -> Option<&Arc<AuditLogger>> {
        self.inner.audit_logger.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Removes the observers, deregisters the classes and closes every store
    /// this instance was given. Closing twice is a no-op.
    pub fn close(&self) -> OdmResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        for handle in self.inner.observers.lock().drain(..) {
            remove_persist_observer(&handle);
        }

        for class in &self.inner.classes {
            forget_class(class);
        }
        if self.inner.audit_logger.is_some() {
            deregister_class(AUDIT_EVENT_CLASS);
        }

        let mut stores: Vec<DataStore> = Vec::new();
        let bound = self
            .inner
            .classes
            .iter()
            .filter_map(|class| class.data_store().cloned());
        for store in self.inner.default_store.iter().cloned().chain(bound) {
            if !stores.iter().any(|s| s.same_store(&store)) {
                stores.push(store);
            }
        }

        if let Some(store) = &self.inner.default_store {
            let still_default = current_default_data_store()
                .map(|current| current.same_store(store))
                .unwrap_or(false);
            if still_default {
                reset_default_data_store();
            }
        }

        let mut first_error = None;
        for store in stores {
            if let Err(e) = store.close() {
                log::error!("Failed to close data store: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn check_opened(&self) -> OdmResult<()> {
        if self.is_closed() {
            log::error!("Odm is already closed");
            return Err(OdmError::new("Odm is already closed", ErrorKind::InvalidOperation));
        }
        Ok(())
    }
}

// only removes the registration if it is still this class
fn forget_class(class: &ModelClass) {
    if let Ok(current) = resolve_class(class.class_id()) {
        if current.same_definition(class) {
            deregister_class(class.class_id());
        }
    }
}

use crate::common::{ReadExecutor, WriteExecutor};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::store::{DataStore, NoOpDataStore};
use crate::DEFAULT_DATA_STORE;

/// Sets the store used by classes whose storage root has no store bound.
///
/// Replacing a different store is allowed but logged, since it usually means
/// two parts of an application disagree about where data lives.
pub fn set_default_data_store(store: DataStore) {
    DEFAULT_DATA_STORE.write_with(|current| {
        if let Some(existing) = current.as_ref() {
            if !existing.same_store(&store) {
                log::warn!("Replacing the default data store");
            }
        }
        *current = Some(store);
    });
}

/// Removes the default store. Unbound classes then fail with
/// [ErrorKind::DataStoreNotBound].
pub fn clear_default_data_store() {
    DEFAULT_DATA_STORE.write_with(|current| *current = None);
}

/// Restores the initial default: the [NoOpDataStore] guard.
pub fn reset_default_data_store() {
    DEFAULT_DATA_STORE.write_with(|current| *current = Some(DataStore::new(NoOpDataStore)));
}

pub fn current_default_data_store() -> Option<DataStore> {
    DEFAULT_DATA_STORE.read_with(|current| current.clone())
}

pub(crate) fn default_data_store(collection: &str) -> OdmResult<DataStore> {
    match current_default_data_store() {
        Some(store) => Ok(store),
        None => {
            log::error!("No datastore set for {}", collection);
            Err(OdmError::new(
                &format!("No datastore set for {}", collection),
                ErrorKind::DataStoreNotBound,
            ))
        }
    }
}

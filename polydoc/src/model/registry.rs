use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::ModelClass;
use crate::CLASS_REGISTRY;

/// Makes `class` resolvable by its class id.
///
/// Registering the same definition again is a no-op. A different class that
/// claims an already pinned id is rejected. An unpinned name collision
/// replaces the earlier class with a warning, since plain class names are
/// not guaranteed to be unique.
pub fn register_class(class: &ModelClass) -> OdmResult<()> {
    let mut registry = CLASS_REGISTRY.write();
    if let Some(existing) = registry.get(class.class_id()) {
        if existing.same_definition(class) {
            return Ok(());
        }

        if existing.is_pinned() || class.is_pinned() {
            log::error!(
                "Class id {} is already registered by another class",
                class.class_id()
            );
            return Err(OdmError::new(
                &format!(
                    "Class id {} is already registered by another class",
                    class.class_id()
                ),
                ErrorKind::DuplicateClassId,
            ));
        }

        log::warn!(
            "Class name {} is registered twice, the later definition wins; pin a class id to disambiguate",
            class.class_id()
        );
    }

    registry.insert(class.class_id().to_string(), class.clone());
    Ok(())
}

/// Looks up a class by the identity recorded in a class chain.
pub fn resolve_class(class_id: &str) -> OdmResult<ModelClass> {
    match CLASS_REGISTRY.read().get(class_id) {
        Some(class) => Ok(class.clone()),
        None => {
            log::error!("No model class registered for id: {}", class_id);
            Err(OdmError::new(
                &format!("No model class registered for id: {}", class_id),
                ErrorKind::ClassNotRegistered,
            ))
        }
    }
}

pub fn is_registered(class_id: &str) -> bool {
    CLASS_REGISTRY.read().contains_key(class_id)
}

pub fn deregister_class(class_id: &str) -> Option<ModelClass> {
    CLASS_REGISTRY.write().remove(class_id)
}

pub fn registered_class_ids() -> Vec<String> {
    let mut ids: Vec<String> = CLASS_REGISTRY.read().keys().cloned().collect();
    ids.sort();
    ids
}

/// Forgets every registered class.
pub fn clear_class_registry() {
    CLASS_REGISTRY.write().clear();
}

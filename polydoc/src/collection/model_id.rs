use std::borrow::Borrow;
use std::fmt::{Debug, Display};

/// The identity of a stored record.
///
/// A `ModelId` wraps the backend-issued identifier as a string. The memory
/// backend issues a decimal sequence (`"1"`, `"2"`, ..), the document store
/// adapter issues the hex form of a native object id. Ids compare by value.
///
/// [ModelId::EMPTY] is the single canonical "not yet persisted" id. Note that
/// an empty id does not mean a model was never saved; persisted state is
/// tracked by the model's snapshot, not by its id.
///
/// # Examples
///
/// ```rust,ignore
/// use polydoc::collection::ModelId;
///
/// let id = ModelId::new("5f1d7f0e9c1b2a3d4e5f6071");
/// assert!(!id.is_empty());
/// assert!(ModelId::EMPTY.is_empty());
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ModelId {
    id_value: String,
}

impl ModelId {
    /// The canonical empty id.
    pub const EMPTY: ModelId = ModelId {
        id_value: String::new(),
    };

    pub fn new(id_value: impl Into<String>) -> Self {
        ModelId {
            id_value: id_value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id_value
    }

    pub fn is_empty(&self) -> bool {
        self.id_value.is_empty()
    }
}

impl Borrow<str> for ModelId {
    fn borrow(&self) -> &str {
        &self.id_value
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        ModelId::new(value)
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        ModelId::new(value)
    }
}

impl Debug for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModelId({})", self.id_value)
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_value)
    }
}

use im::OrdMap;
use itertools::Itertools;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::collection::ModelId;
use crate::common::{Value, FIELD_SEPARATOR, ID_FIELD};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use std::fmt::{Debug, Display};

type PathVec<'a> = SmallVec<[&'a str; 8]>;

/// An ordered mapping of field names to [Value]s.
///
/// `Document` is the plain-data currency of the crate: model fields, envelopes,
/// serialized queries and backend records are all documents. It is backed by
/// `im::OrdMap`, so cloning is O(1) and every clone is independent; mutating a
/// clone never shows through the original. The persisted snapshot of a model
/// relies on exactly that.
///
/// Keys are stored literally by [Document::put], so a structural query may
/// carry a dotted key such as `"stuff.foo"` as-is. Nested fields are addressed
/// with the `*_path` methods, where `.` separates levels, a numeric segment
/// indexes into an array and any other segment applied to an array is
/// resolved against each element.
///
/// ```ignore
/// let mut doc = doc!{ "name": "Fido" };
/// doc.put_path("owner.name", "Alice")?;
/// assert_eq!(doc.get("owner.name"), Value::from("Alice"));
/// ```
#[derive(Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with the literal `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) -> OdmResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(OdmError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        self.data.insert(key, value.into());
        Ok(())
    }

    /// Associates `value` with a nested field, creating intermediate
    /// documents as needed.
    pub fn put_path<T: Into<Value>>(&mut self, path: &str, value: T) -> OdmResult<()> {
        let splits: PathVec = path.split(FIELD_SEPARATOR).collect();
        self.deep_put(&splits, value.into())
    }

    /// Returns the value for `key`, or [Value::Null] when absent.
    ///
    /// A literal key wins; otherwise a dotted key is resolved as a path.
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None if key.contains(FIELD_SEPARATOR) => self.get_path(key),
            None => Value::Null,
        }
    }

    /// Resolves a dotted path, returning [Value::Null] when any level is
    /// missing.
    pub fn get_path(&self, path: &str) -> Value {
        let splits: PathVec = path.split(FIELD_SEPARATOR).collect();
        if splits.iter().any(|s| s.is_empty()) {
            return Value::Null;
        }
        recursive_get(self.data.get(splits[0]), &splits[1..])
    }

    /// Borrows the value stored under the literal `key`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks whether a literal key or a dotted path holds a non-null value.
    pub fn contains_field(&self, field: &str) -> bool {
        !self.get(field).is_null()
    }

    /// Removes the literal `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Removes a nested field. Missing levels are ignored.
    pub fn remove_path(&mut self, path: &str) {
        let splits: PathVec = path.split(FIELD_SEPARATOR).collect();
        self.deep_remove(&splits);
    }

    /// Copies every top-level entry of `other` into this document,
    /// overwriting existing keys.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// The record id stored under `id`, or [ModelId::EMPTY].
    pub fn id(&self) -> ModelId {
        match self.data.get(ID_FIELD) {
            Some(Value::Id(id)) => id.clone(),
            Some(Value::String(s)) => ModelId::new(s.as_str()),
            _ => ModelId::EMPTY,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub(crate) fn to_pretty_json(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut json_string = String::with_capacity(self.data.len() * 30 + indent * 2);
        json_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        for (key, value) in self.data.iter() {
            json_string.push_str(&format!(
                "{}\"{}\": {},\n",
                indent_str,
                key,
                value.to_pretty_json(indent + 2)
            ));
        }

        json_string.pop();
        json_string.pop();
        json_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        json_string
    }

    pub(crate) fn to_debug_string(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut debug_string = String::new();
        debug_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        for (key, value) in self.data.iter() {
            debug_string.push_str(&format!(
                "{}\"{}\": {},\n",
                indent_str,
                key,
                value.to_debug_string(indent + 2)
            ));
        }

        debug_string.pop();
        debug_string.pop();
        debug_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        debug_string
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> OdmResult<()> {
        let key = match splits.first() {
            Some(key) if !key.is_empty() => *key,
            _ => {
                log::error!("Document does not support empty key");
                return Err(OdmError::new(
                    "Document does not support empty key",
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        if splits.len() == 1 {
            return self.put(key, value);
        }

        // descend into an existing document, anything else is replaced
        let mut nested = match self.data.get(key) {
            Some(Value::Document(obj)) => obj.clone(),
            _ => Document::new(),
        };
        let result = nested.deep_put(&splits[1..], value);
        self.data.insert(key.to_string(), Value::Document(nested));
        result
    }

    fn deep_remove(&mut self, splits: &[&str]) {
        let Some(key) = splits.first() else {
            return;
        };

        if splits.len() == 1 {
            self.data.remove(*key);
            return;
        }

        if let Some(Value::Document(obj)) = self.data.get(*key) {
            let mut nested = obj.clone();
            nested.deep_remove(&splits[1..]);
            self.data.insert(key.to_string(), Value::Document(nested));
        }
    }
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> Value {
    let value = match value {
        None => return Value::Null,
        Some(v) => v,
    };

    if splits.is_empty() {
        return value.clone();
    }

    let key = splits[0];
    match value {
        Value::Document(obj) => recursive_get(obj.data.get(key), &splits[1..]),
        Value::Model(model) => recursive_get(model.data().data.get(key), &splits[1..]),
        Value::Array(arr) => match key.parse::<usize>() {
            Ok(index) => recursive_get(arr.get(index), &splits[1..]),
            Err(_) => decompose(arr, splits),
        },
        _ => Value::Null,
    }
}

// resolves the remaining path against every element of an array
fn decompose(arr: &[Value], splits: &[&str]) -> Value {
    let mut items: Vec<Value> = Vec::with_capacity(arr.len());
    for item in arr {
        match recursive_get(Some(item), splits) {
            Value::Null => {}
            Value::Array(values) => items.extend(values),
            value => items.push(value),
        }
    }
    Value::Array(items.into_iter().unique().collect())
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_debug_string(0))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pretty_json(0))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.data.len()))?;
        for (key, value) in self.data.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Document(doc) => Ok(doc),
            other => Err(serde::de::Error::custom(format!(
                "expected a document, found {}",
                other
            ))),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys are stored literally, so `"stuff.foo": 1` produces a single dotted
/// key, which is what structural queries expect.
///
/// ```rust
/// use polydoc::doc;
///
/// let query = doc!{ "lastName": "Smith", "stuff.foo": 42 };
/// let nested = doc!{
///     user: {
///         name: "Charlie",
///         tags: ["admin", "user"]
///     },
///     values: [1, 2, 3]
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

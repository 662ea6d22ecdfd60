use crate::collection::{Document, ModelId};
use crate::common::Value;
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::Model;
use chrono::{DateTime, Utc};

/// Typed conversion between Rust values and [Value].
///
/// Used by [Model::get_as](crate::model::Model::get_as) for typed field
/// access. Conversions are strict about the variant, except that integer
/// targets accept any integer variant that fits and `f64` accepts any number.
pub trait Convertible {
    type Output;

    fn to_value(&self) -> OdmResult<Value>;
    fn from_value(value: &Value) -> OdmResult<Self::Output>;
}

fn mapping_error(value: &Value, expected: &str) -> OdmError {
    log::error!("Value {} is not {}", value, expected);
    OdmError::new(
        &format!("Value is not {}", expected),
        ErrorKind::ObjectMappingError,
    )
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mapping_error(value, "a bool")),
        }
    }
}

impl Convertible for i32 {
    type Output = i32;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::I32(*self))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value.as_integer().map(i32::try_from) {
            Some(Ok(i)) => Ok(i),
            _ => Err(mapping_error(value, "an i32")),
        }
    }
}

impl Convertible for i64 {
    type Output = i64;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::I64(*self))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        value
            .as_integer()
            .ok_or_else(|| mapping_error(value, "an i64"))
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        value
            .as_decimal()
            .ok_or_else(|| mapping_error(value, "a number"))
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mapping_error(value, "a string")),
        }
    }
}

impl Convertible for ModelId {
    type Output = ModelId;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::Id(self.clone()))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Id(id) => Ok(id.clone()),
            Value::String(s) => Ok(ModelId::new(s.as_str())),
            Value::Null => Ok(ModelId::EMPTY),
            _ => Err(mapping_error(value, "an id")),
        }
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::Date(*self))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            _ => Err(mapping_error(value, "a date")),
        }
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Document(d) => Ok(d.clone()),
            _ => Err(mapping_error(value, "a document")),
        }
    }
}

impl Convertible for Model {
    type Output = Model;

    fn to_value(&self) -> OdmResult<Value> {
        Ok(Value::Model(Box::new(self.clone())))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Model(m) => Ok(m.as_ref().clone()),
            _ => Err(mapping_error(value, "a model")),
        }
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible<Output = T>,
{
    type Output = Vec<T>;

    fn to_value(&self) -> OdmResult<Value> {
        let items = self
            .iter()
            .map(|it| it.to_value())
            .collect::<OdmResult<Vec<Value>>>()?;
        Ok(Value::Array(items))
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

impl<T> Convertible for Option<T>
where
    T: Convertible<Output = T>,
{
    type Output = Option<T>;

    fn to_value(&self) -> OdmResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> OdmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

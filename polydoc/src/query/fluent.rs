use crate::common::Value;
use crate::query::{Query, QueryExpr, QueryOp};

/// Starts an expression atom on a field path.
///
/// ```rust,ignore
/// let adults = field("age").gte(18);
/// let named = field("name").in_(vec!["Fido", "Rex"]);
/// let query = adults.and(named)?;
/// ```
pub fn field(name: &str) -> FieldQuery {
    FieldQuery {
        field: name.to_string(),
    }
}

/// A field path waiting for its operator.
#[derive(Debug, Clone)]
pub struct FieldQuery {
    field: String,
}

impl FieldQuery {
    pub fn eq(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Gt, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Gte, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Lt, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Query {
        self.atom(QueryOp::Lte, value.into())
    }

    pub fn in_<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Query {
        self.atom(QueryOp::In, collect(values))
    }

    pub fn nin<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Query {
        self.atom(QueryOp::Nin, collect(values))
    }

    pub fn exists(self, exists: bool) -> Query {
        self.atom(QueryOp::Exists, Value::Bool(exists))
    }

    fn atom(self, op: QueryOp, value: Value) -> Query {
        Query::Expression(QueryExpr::atom(&self.field, op, value))
    }
}

fn collect<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Value {
    Value::Array(values.into_iter().map(Into::into).collect())
}

use crate::collection::Document;
use crate::common::{Value, OP_AND, OP_OR};
use crate::errors::{ErrorKind, OdmError, OdmResult};
use crate::model::codec;
use std::fmt::{Display, Formatter};

/// Comparison operators of an expression atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    In,
    Nin,
    Exists,
}

impl QueryOp {
    /// The serialized operator key, e.g. `$gte`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOp::Eq => "$eq",
            QueryOp::Gt => "$gt",
            QueryOp::Gte => "$gte",
            QueryOp::Lt => "$lt",
            QueryOp::Lte => "$lte",
            QueryOp::Ne => "$ne",
            QueryOp::In => "$in",
            QueryOp::Nin => "$nin",
            QueryOp::Exists => "$exists",
        }
    }

    pub fn parse(op: &str) -> Option<QueryOp> {
        match op {
            "$eq" => Some(QueryOp::Eq),
            "$gt" => Some(QueryOp::Gt),
            "$gte" => Some(QueryOp::Gte),
            "$lt" => Some(QueryOp::Lt),
            "$lte" => Some(QueryOp::Lte),
            "$ne" => Some(QueryOp::Ne),
            "$in" => Some(QueryOp::In),
            "$nin" => Some(QueryOp::Nin),
            "$exists" => Some(QueryOp::Exists),
            _ => None,
        }
    }
}

impl Display for QueryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    And,
    Or,
}

impl JoinType {
    fn key(&self) -> &'static str {
        match self {
            JoinType::And => OP_AND,
            JoinType::Or => OP_OR,
        }
    }
}

/// A composed expression: one `field op value` atom, optionally joined with
/// further queries by a single join type.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpr {
    field: String,
    op: QueryOp,
    value: Value,
    join: Option<JoinType>,
    queries: Vec<Query>,
}

impl QueryExpr {
    pub(crate) fn atom(field: &str, op: QueryOp, value: Value) -> QueryExpr {
        QueryExpr {
            field: field.to_string(),
            op,
            value,
            join: None,
            queries: Vec::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> QueryOp {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn join_type(&self) -> Option<JoinType> {
        self.join
    }

    fn join_with(mut self, join: JoinType, other: Query) -> OdmResult<QueryExpr> {
        match self.join {
            Some(current) if current != join => {
                let message = match current {
                    JoinType::Or => "Query is already an OR query",
                    JoinType::And => "Query is already an AND query",
                };
                log::error!("{}", message);
                Err(OdmError::new(message, ErrorKind::InvalidQuery))
            }
            _ => {
                self.join = Some(join);
                self.queries.push(other);
                Ok(self)
            }
        }
    }

    fn serialize(&self) -> Document {
        let atom: Document = [(
            self.field.clone(),
            Value::Document(
                [(self.op.as_str().to_string(), codec::to_plain(&self.value))]
                    .into_iter()
                    .collect(),
            ),
        )]
        .into_iter()
        .collect();

        match self.join {
            None => atom,
            Some(join) => {
                let mut clauses = vec![Value::Document(atom)];
                clauses.extend(self.queries.iter().map(|q| Value::Document(q.serialize())));
                [(join.key().to_string(), Value::Array(clauses))]
                    .into_iter()
                    .collect()
            }
        }
    }
}

/// A backend-agnostic query.
///
/// The structural form is a plain document matched key by key; the
/// expression form is built from [field](crate::query::field) atoms. Both
/// serialize to one document shape before they reach a backend:
///
/// ```rust,ignore
/// let structural = Query::from(doc!{ "lastName": "Smith" });
/// let expression = field("age").gte(18).and(field("age").lt(65))?;
///
/// assert_eq!(
///     expression.serialize(),
///     doc!{ "$and": [{ "age": { "$gte": 18 } }, { "age": { "$lt": 65 } }] }
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Structural(Document),
    Expression(QueryExpr),
}

impl Query {
    /// Matches every record.
    pub fn all() -> Query {
        Query::Structural(Document::new())
    }

    /// Joins `other` with AND. A query already joined with OR rejects it.
    pub fn and(self, other: impl Into<Query>) -> OdmResult<Query> {
        self.join(JoinType::And, other.into())
    }

    /// Joins `other` with OR. A query already joined with AND rejects it.
    pub fn or(self, other: impl Into<Query>) -> OdmResult<Query> {
        self.join(JoinType::Or, other.into())
    }

    /// The normalized document form that backends receive. Embedded models
    /// are written as envelopes.
    pub fn serialize(&self) -> Document {
        match self {
            Query::Structural(doc) => doc
                .iter()
                .map(|(key, value)| (key.clone(), codec::to_plain(value)))
                .collect(),
            Query::Expression(expr) => expr.serialize(),
        }
    }

    fn join(self, join: JoinType, other: Query) -> OdmResult<Query> {
        match self {
            Query::Expression(expr) => Ok(Query::Expression(expr.join_with(join, other)?)),
            Query::Structural(_) => {
                log::error!("Only expression queries can be composed with and/or");
                Err(OdmError::new(
                    "Only expression queries can be composed with and/or",
                    ErrorKind::InvalidQuery,
                ))
            }
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::all()
    }
}

impl From<Document> for Query {
    fn from(doc: Document) -> Self {
        Query::Structural(doc)
    }
}

impl From<QueryExpr> for Query {
    fn from(expr: QueryExpr) -> Self {
        Query::Expression(expr)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

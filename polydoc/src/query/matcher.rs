//! Evaluates serialized queries against in-memory records.
//!
//! Matching rules:
//!
//! * top-level keys are combined with AND; `$and` / `$or` keys hold arrays
//!   of sub-queries;
//! * a value whose keys all start with `$` is an operator document and is
//!   evaluated against the field's value (`$eq` on an array means "contains");
//! * a plain value under a key without a dot is matched recursively over the
//!   query's own keys: every key of a nested query document and every
//!   element of a query array (by index) must match, extra candidate fields
//!   are ignored;
//! * a plain value under a dotted key matches when *any* value reachable by
//!   that path matches it. Nested documents and arrays under a dotted key are
//!   matched in the same mode, so one matching sub-key or index is enough.

use crate::collection::Document;
use crate::common::{Value, FIELD_SEPARATOR, OP_AND, OP_OR, OP_PREFIX};
use crate::query::QueryOp;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Whether `record` satisfies the serialized `query`. An empty query matches
/// everything.
pub fn matches(query: &Document, record: &Document) -> bool {
    query.iter().all(|(key, expected)| match key.as_str() {
        OP_AND => sub_queries(expected).all(|q| matches(q, record)),
        OP_OR => sub_queries(expected).any(|q| matches(q, record)),
        _ => match_key(record, key, expected),
    })
}

fn sub_queries(value: &Value) -> impl Iterator<Item = &Document> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_document)
}

fn match_key(record: &Document, key: &str, expected: &Value) -> bool {
    if let Some(operators) = operator_document(expected) {
        let actual = record.get(key);
        return operators
            .iter()
            .all(|(op, operand)| match QueryOp::parse(op) {
                Some(op) => apply_operator(op, &actual, operand),
                None => {
                    log::warn!("Unsupported query operator {} on {}", op, key);
                    false
                }
            });
    }

    if key.contains(FIELD_SEPARATOR) {
        let splits: SmallVec<[&str; 8]> = key.split(FIELD_SEPARATOR).collect();
        return any_path_matches(record.field(splits[0]), &splits[1..], expected);
    }

    let actual = record.field(key).unwrap_or(&Value::Null);
    all_match(actual, expected)
}

fn all_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Document(doc), Value::Document(query)) => all_keys_match(doc, query),
        (Value::Model(model), Value::Document(query)) => all_keys_match(model.data(), query),
        (Value::Array(items), Value::Array(query)) => query
            .iter()
            .enumerate()
            .all(|(index, item)| all_match(items.get(index).unwrap_or(&Value::Null), item)),
        _ => actual == expected,
    }
}

fn all_keys_match(doc: &Document, query: &Document) -> bool {
    query
        .iter()
        .all(|(key, expected)| all_match(doc.field(key).unwrap_or(&Value::Null), expected))
}

fn operator_document(value: &Value) -> Option<&Document> {
    match value {
        Value::Document(doc) if !doc.is_empty() && doc.keys().all(|k| k.starts_with(OP_PREFIX)) => {
            Some(doc)
        }
        _ => None,
    }
}

fn apply_operator(op: QueryOp, actual: &Value, operand: &Value) -> bool {
    match op {
        QueryOp::Eq => equals_or_contains(actual, operand),
        QueryOp::Ne => !equals_or_contains(actual, operand),
        QueryOp::Gt => compares(actual, operand, |o| o == Ordering::Greater),
        QueryOp::Gte => compares(actual, operand, |o| o != Ordering::Less),
        QueryOp::Lt => compares(actual, operand, |o| o == Ordering::Less),
        QueryOp::Lte => compares(actual, operand, |o| o != Ordering::Greater),
        QueryOp::In => in_set(actual, operand),
        QueryOp::Nin => !in_set(actual, operand),
        QueryOp::Exists => match operand {
            Value::Bool(exists) => actual.is_null() != *exists,
            _ => false,
        },
    }
}

fn equals_or_contains(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => false,
    }
}

fn compares(actual: &Value, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| item.is_comparable_with(operand) && accept(item.cmp(operand))),
        _ => actual.is_comparable_with(operand) && accept(actual.cmp(operand)),
    }
}

fn in_set(actual: &Value, operand: &Value) -> bool {
    match operand {
        Value::Array(candidates) => candidates.iter().any(|c| equals_or_contains(actual, c)),
        _ => false,
    }
}

fn any_path_matches(value: Option<&Value>, splits: &[&str], expected: &Value) -> bool {
    let Some(value) = value else {
        return false;
    };

    let Some(key) = splits.first() else {
        return leaf_matches(value, expected);
    };

    match value {
        Value::Document(doc) => any_path_matches(doc.field(key), &splits[1..], expected),
        Value::Model(model) => any_path_matches(model.data().field(key), &splits[1..], expected),
        Value::Array(items) => match key.parse::<usize>() {
            Ok(index) => any_path_matches(items.get(index), &splits[1..], expected),
            Err(_) => items
                .iter()
                .any(|item| any_path_matches(Some(item), splits, expected)),
        },
        _ => false,
    }
}

fn leaf_matches(value: &Value, expected: &Value) -> bool {
    if value == expected {
        return true;
    }
    match (value, expected) {
        (Value::Array(items), Value::Array(sub_query)) => sub_query
            .iter()
            .enumerate()
            .any(|(index, item)| items.get(index).is_some_and(|found| leaf_matches(found, item))),
        (Value::Array(items), _) => items.iter().any(|item| leaf_matches(item, expected)),
        (Value::Document(_), Value::Document(sub_query)) | (Value::Model(_), Value::Document(sub_query)) => {
            sub_query.iter().any(|(key, sub_expected)| {
                let splits: SmallVec<[&str; 8]> = key.split(FIELD_SEPARATOR).collect();
                any_path_matches(Some(value), &splits, sub_expected)
            })
        }
        _ => false,
    }
}

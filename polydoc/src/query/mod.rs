//! Backend-agnostic queries.
//!
//! A query is either a structural document or an expression composed from
//! field atoms:
//!
//! - `doc!{ "lastName": "Smith" }` - every key must match, nested query
//!   documents and arrays must match on each of their own keys and indexes
//! - `doc!{ "stuff.foo": 1 }` - dotted keys match when any value at that
//!   path matches
//! - `field("age").gte(18)` - comparison atoms (`eq`, `ne`, `gt`, `gte`,
//!   `lt`, `lte`, `in_`, `nin`, `exists`)
//! - `field("a").eq(1).and(field("b").eq(2))?` - AND/OR composition; one
//!   query never mixes both
//!
//! Both forms serialize to the same document shape. The memory backend
//! evaluates that shape with [matches]; the document store adapter
//! translates it into the native filter dialect.
//!
//! ```rust,ignore
//! use polydoc::query::{field, Query};
//!
//! let query = field("age").gte(18).or(field("guardian").exists(true))?;
//! let cursor = user.search(query)?;
//! ```

mod fluent;
mod matcher;
mod query;

pub use fluent::*;
pub use matcher::*;
pub use query::*;

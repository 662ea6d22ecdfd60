//! Model classes, model instances and their envelope codec.
//!
//! A [ModelClass] declares the persisted fields of an entity type and its
//! place in an inheritance chain. A [Model] is an instance of a class.
//! [codec] converts models to and from envelopes, the plain documents that
//! carry the class chain so a generic reader can recover the concrete class.

pub mod codec;
mod class;
#[allow(clippy::module_inception)]
mod model;
pub(crate) mod operations;
mod registry;

pub use class::*;
pub use model::*;
pub use registry::*;

//! Plain-data building blocks: [Document] and the record identifier
//! [ModelId].

mod document;
mod model_id;

pub use document::*;
pub use model_id::*;

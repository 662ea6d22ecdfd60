// model constants
pub const ID_FIELD: &str = "id";
pub const CLASS_CHAIN: &str = "_classChain_";
pub const PERSISTED_FLAG: &str = "_persisted_";
pub const RESERVED_FIELDS: [&str; 2] = [CLASS_CHAIN, PERSISTED_FLAG];

// path constants
pub const FIELD_SEPARATOR: &str = ".";
pub const DESCENDING_PREFIX: &str = "-";

// query operator constants
pub const OP_AND: &str = "$and";
pub const OP_OR: &str = "$or";
pub const OP_PREFIX: &str = "$";

// wire tags for values json has no native type for
pub const DATE_TAG: &str = "$date";
pub const ID_TAG: &str = "$id";

// native document store constants
pub const NATIVE_ID: &str = "_id";

pub const NOT_PERMITTED_MESSAGE: &str = "Operation not permitted in this context";

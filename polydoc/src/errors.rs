use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for polydoc operations.
///
/// The variants are grouped the way callers are expected to react to them:
/// configuration mistakes are raised at the point of misuse, resolution
/// failures mean an envelope could not be turned back into an entity, and
/// backend failures carry the storage layer's own detail in their cause.
///
/// # Examples
///
/// ```rust,ignore
/// use polydoc::errors::{ErrorKind, OdmError, OdmResult};
///
/// fn example() -> OdmResult<()> {
///     Err(OdmError::new("No datastore set for users", ErrorKind::DataStoreNotBound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Configuration errors
    /// A class or store was configured in a way that can never work
    InvalidConfiguration,
    /// No backend is bound for the class and no default store is set
    DataStoreNotBound,
    /// Two different classes claim the same pinned class identity
    DuplicateClassId,
    /// A query expression mixes AND and OR composition
    InvalidQuery,

    // Resolution errors
    /// No class is registered for a class identity
    ClassNotRegistered,
    /// An envelope's class chain is not compatible with the requested class
    ClassMismatch,

    // Backend errors
    /// Error reported by a storage backend or its driver
    BackendError,
    /// The operation is rejected by a guard backend
    OperationNotPermitted,

    // Usage errors
    /// The model cannot be identified for an update or delete
    NotIdentifiable,
    /// The provided id is not valid for the backend
    InvalidId,
    /// The field is not declared for the model class
    InvalidFieldName,
    /// The operation is not valid in the current state
    InvalidOperation,
    /// Generic validation error
    ValidationError,
    /// Error mapping a value to or from a Rust type
    ObjectMappingError,
    /// Error encoding or decoding a wire representation
    EncodingError,

    /// Error raised while delivering a persistence event
    EventError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::DataStoreNotBound => write!(f, "Data store not bound"),
            ErrorKind::DuplicateClassId => write!(f, "Duplicate class id"),
            ErrorKind::InvalidQuery => write!(f, "Invalid query"),
            ErrorKind::ClassNotRegistered => write!(f, "Class not registered"),
            ErrorKind::ClassMismatch => write!(f, "Class mismatch"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::OperationNotPermitted => write!(f, "Operation not permitted"),
            ErrorKind::NotIdentifiable => write!(f, "Not identifiable"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type for every fallible polydoc operation.
///
/// `OdmError` carries a message, an [ErrorKind], an optional cause and the
/// backtrace captured where it was created. Backend adapters wrap driver
/// failures with [OdmError::new_with_cause] so the driver's own message stays
/// reachable through [Error::source].
///
/// # Examples
///
/// ```rust,ignore
/// use polydoc::errors::{ErrorKind, OdmError};
///
/// let cause = OdmError::new("connection reset", ErrorKind::BackendError);
/// let err = OdmError::new_with_cause("insert failed", ErrorKind::BackendError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct OdmError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<OdmError>>,
    backtrace: Atomic<Backtrace>,
}

impl OdmError {
    /// Creates a new `OdmError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        OdmError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `OdmError` that keeps `cause` in its error chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: OdmError) -> Self {
        OdmError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&OdmError> {
        self.cause.as_deref()
    }
}

impl Display for OdmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for OdmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for OdmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for polydoc operations.
pub type OdmResult<T> = Result<T, OdmError>;

impl de::Error for OdmError {
    fn custom<T: Display>(msg: T) -> Self {
        OdmError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl ser::Error for OdmError {
    fn custom<T: Display>(msg: T) -> Self {
        OdmError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl From<serde_json::Error> for OdmError {
    fn from(err: serde_json::Error) -> Self {
        OdmError::new(&format!("JSON encoding error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<bson::oid::Error> for OdmError {
    fn from(err: bson::oid::Error) -> Self {
        OdmError::new(&format!("Invalid object id: {}", err), ErrorKind::InvalidId)
    }
}

impl From<String> for OdmError {
    fn from(msg: String) -> Self {
        OdmError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for OdmError {
    fn from(msg: &str) -> Self {
        OdmError::new(msg, ErrorKind::InternalError)
    }
}

use crate::collection::Document;
use crate::errors::OdmResult;
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};

/// A lazily produced sequence of records.
///
/// Dropping the stream releases whatever backs it, drained or not.
pub type RecordStream = Box<dyn Iterator<Item = OdmResult<Document>> + Send>;

type CountResolver = Box<dyn Fn() -> OdmResult<u64> + Send + Sync>;

/// A match count that is resolved at most once.
///
/// Backends that know the count up front hand out [LazyCount::ready];
/// backends that need a round trip defer it with [LazyCount::deferred]. A
/// failed resolution is not cached, so the next call asks again.
pub struct LazyCount {
    value: OnceCell<u64>,
    resolver: Option<CountResolver>,
}

impl LazyCount {
    pub fn ready(count: u64) -> LazyCount {
        LazyCount {
            value: OnceCell::with_value(count),
            resolver: None,
        }
    }

    pub fn deferred<F>(resolver: F) -> LazyCount
    where
        F: Fn() -> OdmResult<u64> + Send + Sync + 'static,
    {
        LazyCount {
            value: OnceCell::new(),
            resolver: Some(Box::new(resolver)),
        }
    }

    pub fn get(&self) -> OdmResult<u64> {
        self.value
            .get_or_try_init(|| match &self.resolver {
                Some(resolver) => resolver(),
                None => Ok(0),
            })
            .copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }
}

impl Debug for LazyCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.value.get() {
            Some(count) => write!(f, "LazyCount({})", count),
            None => write!(f, "LazyCount(<pending>)"),
        }
    }
}

/// What a backend returns for a search: the count of matches and the stream
/// of matching records.
pub struct SearchResult {
    pub(crate) count: LazyCount,
    pub(crate) stream: RecordStream,
}

impl SearchResult {
    pub fn new(count: LazyCount, stream: RecordStream) -> SearchResult {
        SearchResult { count, stream }
    }

    pub fn empty() -> SearchResult {
        SearchResult::new(LazyCount::ready(0), Box::new(std::iter::empty()))
    }

    pub fn into_parts(self) -> (LazyCount, RecordStream) {
        (self.count, self.stream)
    }
}

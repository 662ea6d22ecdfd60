//! The persistence event feed.
//!
//! Every state-changing operation publishes one [PersistEvent] after its
//! storage effect has completed. Observers run synchronously on the calling
//! thread, in registration order. An observer that fails or panics is logged
//! and skipped; it never fails the operation that produced the event.

use crate::collection::Document;
use crate::common::{get_current_time_or_zero, ReadExecutor, WriteExecutor};
use crate::errors::OdmResult;
use crate::{OBSERVERS, OBSERVER_SEQUENCE};
use std::fmt::{Debug, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// The kind of state change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistOperation {
    Create,
    Update,
    Delete,
    Drop,
}

impl PersistOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOperation::Create => "create",
            PersistOperation::Update => "update",
            PersistOperation::Delete => "delete",
            PersistOperation::Drop => "drop",
        }
    }
}

impl Display for PersistOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single state change.
///
/// The payload depends on the operation:
/// - `create`: the stored record including its new id
/// - `update`: the stored record
/// - `delete`: `{id}` of the removed record
/// - `drop`: an empty document
///
/// Events are cheap to clone; clones share the payload.
#[derive(Clone)]
pub struct PersistEvent {
    inner: Arc<PersistEventInner>,
}

struct PersistEventInner {
    operation: PersistOperation,
    collection_name: String,
    data: Document,
    timestamp: u128,
}

impl PersistEvent {
    pub fn new(operation: PersistOperation, collection_name: &str, data: Document) -> Self {
        PersistEvent {
            inner: Arc::new(PersistEventInner {
                operation,
                collection_name: collection_name.to_string(),
                data,
                timestamp: get_current_time_or_zero(),
            }),
        }
    }

    pub fn operation(&self) -> PersistOperation {
        self.inner.operation
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    pub fn data(&self) -> &Document {
        &self.inner.data
    }

    /// Milliseconds since the epoch when the event was created.
    pub fn timestamp(&self) -> u128 {
        self.inner.timestamp
    }
}

impl Debug for PersistEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistEvent")
            .field("operation", &self.operation())
            .field("collection_name", &self.collection_name())
            .field("data", self.data())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

/// A consumer of the persistence event feed.
///
/// Observers may themselves persist entities; the feed is re-entrant.
pub trait PersistObserver: Send + Sync {
    fn on_persist(&self, event: &PersistEvent) -> OdmResult<()>;
}

/// Signature of closure-based observers.
pub trait PersistEventCallback: Send + Sync + Fn(&PersistEvent) -> OdmResult<()> {}

impl<F> PersistEventCallback for F where F: Send + Sync + Fn(&PersistEvent) -> OdmResult<()> {}

/// Adapts a closure to [PersistObserver].
///
/// ```rust,ignore
/// add_persist_observer(PersistEventListener::new(|event| {
///     println!("{} on {}", event.operation(), event.collection_name());
///     Ok(())
/// }));
/// ```
#[derive(Clone)]
pub struct PersistEventListener {
    on_event: Arc<dyn PersistEventCallback>,
}

impl PersistEventListener {
    pub fn new(on_event: impl PersistEventCallback + 'static) -> Self {
        PersistEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl PersistObserver for PersistEventListener {
    fn on_persist(&self, event: &PersistEvent) -> OdmResult<()> {
        (self.on_event)(event)
    }
}

impl Debug for PersistEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistEventListener").finish()
    }
}

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverRef(u64);

pub fn add_persist_observer<O: PersistObserver + 'static>(observer: O) -> ObserverRef {
    add_shared_persist_observer(Arc::new(observer))
}

pub fn add_shared_persist_observer(observer: Arc<dyn PersistObserver>) -> ObserverRef {
    let key = OBSERVER_SEQUENCE.fetch_add(1, Ordering::SeqCst);
    OBSERVERS.write_with(|observers| observers.push((key, observer)));
    ObserverRef(key)
}

/// Removes an observer, returning whether it was registered.
pub fn remove_persist_observer(observer: &ObserverRef) -> bool {
    OBSERVERS.write_with(|observers| {
        let before = observers.len();
        observers.retain(|(key, _)| *key != observer.0);
        observers.len() != before
    })
}

pub fn clear_persist_observers() {
    OBSERVERS.write_with(|observers| observers.clear());
}

pub(crate) fn notify_observers(event: PersistEvent) {
    // snapshot first, observers may register or persist while handling
    let observers = OBSERVERS.read_with(|observers| {
        observers
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect::<Vec<_>>()
    });

    for observer in observers {
        match catch_unwind(AssertUnwindSafe(|| observer.on_persist(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::warn!(
                    "Persist observer failed on {} in {}: {}",
                    event.operation(),
                    event.collection_name(),
                    err
                );
            }
            Err(_) => {
                log::warn!(
                    "Persist observer panicked on {} in {}",
                    event.operation(),
                    event.collection_name()
                );
            }
        }
    }
}

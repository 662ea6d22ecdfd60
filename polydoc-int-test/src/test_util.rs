use bson::oid::ObjectId;
use bson::{Bson, Document as NativeDocument};
use parking_lot::{Mutex, MutexGuard};
use polydoc::collection::Document;
use polydoc::common::Value;
use polydoc::errors::{ErrorKind, OdmError, OdmResult};
use polydoc::model::{deregister_class, ModelClass, ModelClassBuilder};
use polydoc::query::matches;
use polydoc::store::document::translate::{from_native_record, from_native_value, id_from_native};
use polydoc::store::document::{DocumentCursor, DocumentDataStore, DocumentDriver, NativeFindOptions};
use polydoc::store::{DataStore, MemoryDataStore};
use std::backtrace::Backtrace;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// `after` always runs once `before` succeeded, also when the test failed.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> OdmResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> OdmResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> OdmResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => match after(ctx) {
                        Ok(_) => Ok(()),
                        Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                    },
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(50 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = Some(Backtrace::capture().to_string());

                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("{}", err_msg);
                    thread::sleep(Duration::from_millis(50 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

static PROCESS_WIDE: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Serializes tests that touch the default data store or open an `Odm`.
pub fn process_wide_lock() -> MutexGuard<'static, ()> {
    PROCESS_WIDE.lock()
}

/// Per-test state: a fresh store and a unique suffix for class and
/// collection names, since the class registry is shared by all tests.
#[derive(Clone)]
pub struct TestContext {
    suffix: String,
    store: DataStore,
    driver: Option<Arc<RecordingDriver>>,
    classes: Arc<Mutex<Vec<ModelClass>>>,
}

impl TestContext {
    pub fn new(store: DataStore, driver: Option<Arc<RecordingDriver>>) -> Self {
        TestContext {
            suffix: uuid::Uuid::new_v4().simple().to_string(),
            store,
            driver,
            classes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn store(&self) -> DataStore {
        self.store.clone()
    }

    pub fn driver(&self) -> Option<Arc<RecordingDriver>> {
        self.driver.clone()
    }

    /// `base` made unique to this test.
    pub fn name(&self, base: &str) -> String {
        format!("{}_{}", base, self.suffix)
    }

    /// Registers a storage root bound to the test store.
    pub fn root(&self, base: &str, fields: &[&str]) -> OdmResult<ModelClass> {
        self.register(
            ModelClass::builder(&self.name(base))
                .fields(fields.iter().copied())
                .data_store(self.store()),
        )
    }

    /// Registers a subclass of `parent`.
    pub fn child(&self, base: &str, parent: &ModelClass, fields: &[&str]) -> OdmResult<ModelClass> {
        self.register(
            ModelClass::builder(&self.name(base))
                .extends(parent)
                .fields(fields.iter().copied()),
        )
    }

    pub fn register(&self, builder: ModelClassBuilder) -> OdmResult<ModelClass> {
        let class = builder.register()?;
        self.classes.lock().push(class.clone());
        Ok(class)
    }

    fn forget_classes(&self) {
        for class in self.classes.lock().drain(..) {
            deregister_class(class.class_id());
        }
    }
}

pub fn create_memory_test_context() -> OdmResult<TestContext> {
    Ok(TestContext::new(DataStore::new(MemoryDataStore::new()), None))
}

pub fn create_document_test_context() -> OdmResult<TestContext> {
    let driver = Arc::new(RecordingDriver::default());
    let shared: Arc<dyn DocumentDriver> = driver.clone();
    let store = DataStore::new(DocumentDataStore::from_shared(shared));
    Ok(TestContext::new(store, Some(driver)))
}

#[cfg(not(feature = "document"))]
pub fn create_test_context() -> OdmResult<TestContext> {
    create_memory_test_context()
}

#[cfg(feature = "document")]
pub fn create_test_context() -> OdmResult<TestContext> {
    create_document_test_context()
}

pub fn cleanup(ctx: TestContext) -> OdmResult<()> {
    ctx.forget_classes();
    ctx.store().close()
}

/// A document driver keeping `bson::Document`s in process.
///
/// Native filters are evaluated by reading them back into polydoc queries,
/// so only the operators polydoc produces are understood. Every filter and
/// option set it receives is recorded for inspection.
#[derive(Default)]
pub struct RecordingDriver {
    collections: Mutex<HashMap<String, Vec<NativeDocument>>>,
    filters: Mutex<Vec<NativeDocument>>,
    options: Mutex<Vec<NativeFindOptions>>,
    indexes: Mutex<Vec<(String, NativeDocument)>>,
    open_cursors: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl RecordingDriver {
    pub fn documents(&self, collection: &str) -> Vec<NativeDocument> {
        self.collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn filters(&self) -> Vec<NativeDocument> {
        self.filters.lock().clone()
    }

    pub fn last_options(&self) -> Option<NativeFindOptions> {
        self.options.lock().last().cloned()
    }

    pub fn indexes(&self) -> Vec<(String, NativeDocument)> {
        self.indexes.lock().clone()
    }

    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> OdmResult<()> {
        if self.is_closed() {
            return Err(OdmError::new("Driver is closed", ErrorKind::BackendError));
        }
        Ok(())
    }

    fn matching(&self, collection: &str, filter: &NativeDocument) -> Vec<NativeDocument> {
        let query = query_from_native(filter);
        self.documents(collection)
            .into_iter()
            .filter(|doc| matches(&query, &from_native_record(doc)))
            .collect()
    }
}

impl DocumentDriver for RecordingDriver {
    fn insert_one(&self, collection: &str, mut document: NativeDocument) -> OdmResult<Bson> {
        self.check_open()?;
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection.to_string()).or_default();
        documents.retain(|existing| existing.get("_id") != Some(&id));
        documents.push(document);
        Ok(id)
    }

    fn update_one(&self, collection: &str, filter: NativeDocument, update: NativeDocument) -> OdmResult<u64> {
        self.check_open()?;
        let query = query_from_native(&filter);
        let values = update.get_document("$set").cloned().unwrap_or_default();
        let removed = update.get_document("$unset").cloned().unwrap_or_default();
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection.to_string()).or_default();
        match documents
            .iter_mut()
            .find(|doc| matches(&query, &from_native_record(doc)))
        {
            Some(document) => {
                for (key, value) in values {
                    document.insert(key, value);
                }
                for key in removed.keys() {
                    document.remove(key);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn find_one(
        &self,
        collection: &str,
        filter: NativeDocument,
        options: &NativeFindOptions,
    ) -> OdmResult<Option<NativeDocument>> {
        self.check_open()?;
        self.options.lock().push(options.clone());
        Ok(self
            .matching(collection, &filter)
            .into_iter()
            .next()
            .map(|doc| project(doc, options)))
    }

    fn find(
        &self,
        collection: &str,
        filter: NativeDocument,
        options: &NativeFindOptions,
    ) -> OdmResult<Box<dyn DocumentCursor>> {
        self.check_open()?;
        self.filters.lock().push(filter.clone());
        self.options.lock().push(options.clone());

        let mut documents = self.matching(collection, &filter);
        if let Some(sort) = &options.sort {
            documents.sort_by(|a, b| {
                let a = from_native_record(a);
                let b = from_native_record(b);
                for (key, direction) in sort.iter() {
                    let field = if key == "_id" { "id" } else { key.as_str() };
                    let ordering = a.get_path(field).cmp(&b.get_path(field));
                    let ordering = if direction.as_i32() == Some(-1) {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering.is_ne() {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let documents = documents
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, options))
            .collect();

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingCursor {
            documents,
            open_cursors: self.open_cursors.clone(),
        }))
    }

    fn count(&self, collection: &str, filter: NativeDocument) -> OdmResult<u64> {
        self.check_open()?;
        Ok(self.matching(collection, &filter).len() as u64)
    }

    fn delete_many(&self, collection: &str, filter: NativeDocument) -> OdmResult<u64> {
        self.check_open()?;
        let query = query_from_native(&filter);
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection.to_string()).or_default();
        let before = documents.len();
        documents.retain(|doc| !matches(&query, &from_native_record(doc)));
        Ok((before - documents.len()) as u64)
    }

    fn drop_collection(&self, collection: &str) -> OdmResult<bool> {
        self.check_open()?;
        Ok(self.collections.lock().remove(collection).is_some())
    }

    fn create_index(&self, collection: &str, keys: NativeDocument, _options: NativeDocument) -> OdmResult<()> {
        self.check_open()?;
        self.indexes.lock().push((collection.to_string(), keys));
        Ok(())
    }

    fn close(&self) -> OdmResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingCursor {
    documents: VecDeque<NativeDocument>,
    open_cursors: Arc<AtomicUsize>,
}

impl DocumentCursor for RecordingCursor {
    fn next_document(&mut self) -> OdmResult<Option<NativeDocument>> {
        Ok(self.documents.pop_front())
    }

    fn close(&mut self) -> OdmResult<()> {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn project(document: NativeDocument, options: &NativeFindOptions) -> NativeDocument {
    match &options.projection {
        None => document,
        Some(projection) if projection.values().any(|v| v.as_i32() == Some(1)) => {
            let mut projected = NativeDocument::new();
            if let Some(id) = document.get("_id") {
                projected.insert("_id", id.clone());
            }
            for path in projection.keys() {
                if let Some(value) = lookup(&document, path) {
                    insert_path(&mut projected, path, value.clone());
                }
            }
            projected
        }
        Some(projection) => {
            let mut projected = document;
            for path in projection.keys() {
                remove_path(&mut projected, path);
            }
            projected
        }
    }
}

fn lookup<'a>(document: &'a NativeDocument, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head) {
            Some(Bson::Document(inner)) => lookup(inner, rest),
            _ => None,
        },
    }
}

fn insert_path(document: &mut NativeDocument, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, NativeDocument::new());
            }
            if let Ok(inner) = document.get_document_mut(head) {
                insert_path(inner, rest, value);
            }
        }
    }
}

fn remove_path(document: &mut NativeDocument, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Ok(inner) = document.get_document_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

// reads a native filter back into a polydoc query
fn query_from_native(filter: &NativeDocument) -> Document {
    filter
        .iter()
        .map(|(key, value)| match key.as_str() {
            "_id" => ("id".to_string(), id_value(value)),
            "$and" | "$or" => {
                let clauses = match value {
                    Bson::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Bson::Document(clause) => Value::Document(query_from_native(clause)),
                            other => from_native_value(other),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                (key.clone(), Value::Array(clauses))
            }
            _ => (key.clone(), from_native_value(value)),
        })
        .collect()
}

fn id_value(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(_) | Bson::String(_) => Value::Id(id_from_native(value)),
        Bson::Array(items) => Value::Array(items.iter().map(id_value).collect()),
        Bson::Document(doc) => Value::Document(
            doc.iter()
                .map(|(op, operand)| (op.clone(), id_value(operand)))
                .collect(),
        ),
        other => from_native_value(other),
    }
}

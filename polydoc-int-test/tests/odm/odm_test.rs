use parking_lot::Mutex;
use polydoc::audit::AUDIT_EVENT_CLASS;
use polydoc::doc;
use polydoc::errors::ErrorKind;
use polydoc::event::{PersistEvent, PersistEventListener, PersistOperation};
use polydoc::model::{is_registered, ModelClass};
use polydoc::odm::Odm;
use polydoc::query::Query;
use polydoc::store::{current_default_data_store, DataStore, MemoryDataStore, NoOpDataStore};
use polydoc_int_test::test_util::process_wide_lock;
use std::sync::Arc;
use uuid::Uuid;

fn unique(base: &str) -> String {
    format!("{}_{}", base, Uuid::new_v4().simple())
}

#[test]
fn test_open_wires_default_store_and_classes() {
    let _guard = process_wide_lock();
    let memory = MemoryDataStore::new();
    let user_id = unique("User");
    let admin_id = unique("Admin");

    let user_class = ModelClass::builder(&user_id)
        .fields(["email", "role"])
        .build()
        .expect("user class builds");
    let odm = Odm::builder()
        .default_data_store(DataStore::new(memory.clone()))
        .model_class(user_class.clone())
        .define(ModelClass::builder(&admin_id).extends(&user_class).field("level"))
        .open()
        .expect("odm opens");

    assert_eq!(odm.classes().len(), 2);
    assert!(is_registered(&user_id));
    let admin = odm.model_class(&admin_id).expect("admin is registered");
    let saved = admin
        .new_model()
        .with("email", "root@example.com")
        .and_then(|m| m.with("level", 9))
        .and_then(|m| m.save())
        .expect("admin saves in the default store");
    assert_eq!(memory.size(&user_id), 1);

    let user = odm.model_class(&user_id).expect("user is registered");
    let found = user.find(&saved.id()).expect("find works").expect("admin is a user");
    assert_eq!(found.model_class(), &user);
    assert!(found.is_a(&user));
    assert_eq!(found.get("email"), saved.get("email"));
    let found = admin.find(&saved.id()).expect("find works").expect("admin is found");
    assert_eq!(found.model_class(), &admin);

    odm.close().expect("odm closes");
    assert!(!is_registered(&user_id));
    assert!(!is_registered(&admin_id));
    assert!(memory.is_closed());

    let current = current_default_data_store().expect("guard store is back");
    let err = current.drop_collection(&user_id).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::OperationNotPermitted);

    let err = odm.model_class(&user_id).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
}

#[test]
fn test_open_reports_first_definition_error() {
    let _guard = process_wide_lock();
    let valid = unique("Valid");
    let err = Odm::builder()
        .define(ModelClass::builder(&valid).field("name"))
        .define(ModelClass::builder(&unique("Broken")).field("a.b"))
        .define(ModelClass::builder(""))
        .open()
        .err()
        .expect("invalid field fails");
    assert_eq!(err.kind(), &ErrorKind::InvalidFieldName);
    assert!(!is_registered(&valid));
    assert!(current_default_data_store().is_some());
}

#[test]
fn test_observers_live_until_close() {
    let _guard = process_wide_lock();
    let memory = MemoryDataStore::new();
    let note_id = unique("Note");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let collection = note_id.clone();

    let odm = Odm::builder()
        .define(
            ModelClass::builder(&note_id)
                .field("text")
                .data_store(DataStore::new(memory.clone())),
        )
        .observer(PersistEventListener::new(move |event: &PersistEvent| {
            if event.collection_name() == collection {
                sink.lock().push(event.operation());
            }
            Ok(())
        }))
        .open()
        .expect("odm opens");

    let note = odm.model_class(&note_id).expect("note is registered");
    note.new_model()
        .with("text", "hello")
        .and_then(|m| m.save())
        .expect("note saves");
    odm.close().expect("odm closes");

    // the class id is free again once the odm is closed
    let replacement = ModelClass::builder(&note_id)
        .field("text")
        .data_store(DataStore::new(MemoryDataStore::new()))
        .register()
        .expect("note re-registers");
    replacement
        .new_model()
        .with("text", "unobserved")
        .and_then(|m| m.save())
        .expect("note saves again");
    polydoc::model::deregister_class(&note_id);

    assert_eq!(*seen.lock(), vec![PersistOperation::Create]);
}

#[test]
fn test_audit_log_records_into_default_store() {
    let _guard = process_wide_lock();
    let memory = MemoryDataStore::new();
    let task_id = unique("Task");

    let odm = Odm::builder()
        .default_data_store(DataStore::new(memory.clone()))
        .define(ModelClass::builder(&task_id).field("title"))
        .audit_log(true)
        .open()
        .expect("odm opens");
    assert!(is_registered(AUDIT_EVENT_CLASS));

    let task = odm.model_class(&task_id).expect("task is registered");
    let saved = task
        .new_model()
        .with("title", "write tests")
        .and_then(|m| m.save())
        .expect("task saves");

    let logger = odm.audit_logger().expect("audit logger is enabled").clone();
    let state = logger.reconstruct().expect("trail replays");
    let tasks = &state[task_id.as_str()];
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id(), saved.id());

    let recorded = logger
        .event_class()
        .search(doc! { "collectionName": (task_id.as_str()) })
        .and_then(|mut cursor| cursor.all())
        .expect("audit events are searchable");
    assert_eq!(recorded.len(), 1);
    assert!(memory.size(AUDIT_EVENT_CLASS) >= 1);

    odm.close().expect("odm closes");
    assert!(!is_registered(AUDIT_EVENT_CLASS));
    assert!(task.search(Query::all()).is_err());
}

#[test]
fn test_closing_guard_default_store_fails() {
    let _guard = process_wide_lock();
    let odm = Odm::builder()
        .default_data_store(DataStore::new(NoOpDataStore))
        .open()
        .expect("odm opens");
    let err = odm.close().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::OperationNotPermitted);
    assert!(odm.is_closed());
}

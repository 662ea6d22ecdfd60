use parking_lot::Mutex;
use polydoc::common::Value;
use polydoc::doc;
use polydoc::errors::{ErrorKind, OdmError};
use polydoc::event::{
    add_persist_observer, remove_persist_observer, PersistEvent, PersistEventListener,
    PersistOperation,
};
use polydoc::query::Query;
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test};
use std::sync::Arc;

// events of one collection only, other tests publish on the same feed
fn record_events(collection: &str) -> (Arc<Mutex<Vec<PersistEvent>>>, PersistEventListener) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let collection = collection.to_string();
    let listener = PersistEventListener::new(move |event: &PersistEvent| {
        if event.collection_name() == collection {
            sink.lock().push(event.clone());
        }
        Ok(())
    });
    (events, listener)
}

#[test]
fn test_events_follow_model_lifecycle() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let (events, listener) = record_events(user.collection_name());
            let handle = add_persist_observer(listener);

            let mut saved = user.new_model().with("email", "ann@example.com")?.save()?;
            saved.set("email", "ann@example.org")?;
            let saved = saved.save()?;
            saved.delete()?;
            remove_persist_observer(&handle);

            let events = events.lock().clone();
            let operations: Vec<_> = events.iter().map(|e| e.operation()).collect();
            assert_eq!(
                operations,
                vec![
                    PersistOperation::Create,
                    PersistOperation::Update,
                    PersistOperation::Delete
                ]
            );

            assert_eq!(events[0].data().id(), saved.id());
            assert_eq!(events[0].data().get("email"), Value::from("ann@example.com"));
            assert_eq!(events[1].data().get("email"), Value::from("ann@example.org"));
            assert_eq!(events[2].data(), &doc! { "id": (Value::Id(saved.id())) });
            assert!(events.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_drop_emits_one_event() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            for email in ["a@example.com", "b@example.com", "c@example.com"] {
                user.new_model().with("email", email)?.save()?;
            }

            let (events, listener) = record_events(user.collection_name());
            let handle = add_persist_observer(listener);
            user.drop()?;
            remove_persist_observer(&handle);

            let events = events.lock().clone();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].operation(), PersistOperation::Drop);
            assert!(events[0].data().is_empty());
            assert_eq!(user.search(Query::all())?.count()?, 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete_where_emits_one_event_per_record() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["team"])?;
            for team in ["red", "red", "blue"] {
                user.new_model().with("team", team)?.save()?;
            }

            let (events, listener) = record_events(user.collection_name());
            let handle = add_persist_observer(listener);
            let removed = user.delete_where(doc! { "team": "red" })?;
            remove_persist_observer(&handle);

            assert_eq!(removed, 2);
            let events = events.lock().clone();
            assert_eq!(events.len(), 2);
            assert!(events
                .iter()
                .all(|e| e.operation() == PersistOperation::Delete && !e.data().id().is_empty()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failing_observer_does_not_fail_save() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let collection = user.collection_name().to_string();
            let failing = add_persist_observer(PersistEventListener::new(move |event: &PersistEvent| {
                if event.collection_name() == collection {
                    return Err(OdmError::new("observer failed", ErrorKind::EventError));
                }
                Ok(())
            }));
            let panicking_collection = user.collection_name().to_string();
            let panicking = add_persist_observer(PersistEventListener::new(move |event: &PersistEvent| {
                if event.collection_name() == panicking_collection {
                    panic!("observer panicked");
                }
                Ok(())
            }));
            let (events, listener) = record_events(user.collection_name());
            let recording = add_persist_observer(listener);

            let result = user.new_model().with("email", "ann@example.com")?.save();
            for handle in [failing, panicking, recording] {
                remove_persist_observer(&handle);
            }

            let saved = result?;
            assert!(user.find(&saved.id())?.is_some());
            assert_eq!(events.lock().len(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_observer_may_persist_while_handling() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let log = ctx.root("Log", &["message"])?;
            let user_collection = user.collection_name().to_string();
            let log_class = log.clone();
            let handle = add_persist_observer(PersistEventListener::new(move |event: &PersistEvent| {
                if event.collection_name() == user_collection {
                    log_class
                        .new_model()
                        .with("message", format!("{} {}", event.operation(), event.data().id()))?
                        .save()?;
                }
                Ok(())
            }));

            let saved = user.new_model().with("email", "ann@example.com")?.save()?;
            remove_persist_observer(&handle);

            let logs = log.search(Query::all())?.all()?;
            assert_eq!(logs.len(), 1);
            assert_eq!(
                logs[0].get_as::<String>("message")?,
                format!("create {}", saved.id())
            );
            assert!(!remove_persist_observer(&handle));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

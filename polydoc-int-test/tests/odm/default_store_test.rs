use polydoc::collection::ModelId;
use polydoc::common::NOT_PERMITTED_MESSAGE;
use polydoc::doc;
use polydoc::errors::{ErrorKind, OdmResult};
use polydoc::model::ModelClass;
use polydoc::query::Query;
use polydoc::store::{
    clear_default_data_store, current_default_data_store, reset_default_data_store,
    set_default_data_store, DataStore, MemoryDataStore,
};
use polydoc_int_test::test_util::{
    cleanup, create_memory_test_context, process_wide_lock, run_test,
};

// holds the process-wide lock while the default store is swapped
fn with_default_store<T>(
    store: Option<DataStore>,
    test: impl FnOnce() -> OdmResult<T>,
) -> OdmResult<T> {
    let _guard = process_wide_lock();
    match store {
        Some(store) => set_default_data_store(store),
        None => reset_default_data_store(),
    }
    let result = test();
    reset_default_data_store();
    result
}

#[test]
fn test_unbound_class_hits_guard_store() {
    run_test(
        || create_memory_test_context(),
        |ctx| {
            let unbound = ctx.register(ModelClass::builder(&ctx.name("Unbound")).field("email"))?;
            with_default_store(None, || {
                let err = unbound
                    .new_model()
                    .with("email", "ann@example.com")?
                    .save()
                    .unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::OperationNotPermitted);
                assert_eq!(err.message(), NOT_PERMITTED_MESSAGE);

                let err = unbound.search(Query::all()).err().expect("search is guarded");
                assert_eq!(err.kind(), &ErrorKind::OperationNotPermitted);
                let err = unbound.find(&ModelId::new("1")).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::OperationNotPermitted);
                Ok(())
            })
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unbound_class_uses_configured_default() {
    run_test(
        || create_memory_test_context(),
        |ctx| {
            let unbound = ctx.register(ModelClass::builder(&ctx.name("Unbound")).field("email"))?;
            let memory = MemoryDataStore::new();
            with_default_store(Some(DataStore::new(memory.clone())), || {
                let saved = unbound.new_model().with("email", "ann@example.com")?.save()?;
                assert_eq!(memory.size(unbound.collection_name()), 1);
                assert!(unbound.find(&saved.id())?.is_some());
                assert_eq!(
                    unbound.search(doc! { "email": "ann@example.com" })?.count()?,
                    1
                );
                Ok(())
            })
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_bound_class_ignores_default() {
    run_test(
        || create_memory_test_context(),
        |ctx| {
            let bound = ctx.root("Bound", &["email"])?;
            with_default_store(None, || {
                bound.new_model().with("email", "ann@example.com")?.save()?;
                assert_eq!(bound.search(Query::all())?.count()?, 1);
                Ok(())
            })
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cleared_default_is_not_bound() {
    run_test(
        || create_memory_test_context(),
        |ctx| {
            let unbound = ctx.register(ModelClass::builder(&ctx.name("Unbound")).field("email"))?;
            let child = ctx.child("Child", &unbound, &[])?;
            with_default_store(None, || {
                clear_default_data_store();
                assert!(current_default_data_store().is_none());

                let err = child.new_model().save().unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::DataStoreNotBound);
                assert!(err.message().contains(unbound.collection_name()));
                Ok(())
            })
        },
        |ctx| cleanup(ctx),
    )
}

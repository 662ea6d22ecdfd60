use polydoc::collection::ModelId;
use polydoc::common::Value;
use polydoc::doc;
use polydoc::errors::ErrorKind;
use polydoc::query::Query;
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_search_by_last_name() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email", "firstName", "lastName"])?;
            for (email, first, last) in [
                ("ann@example.com", "Ann", "Smith"),
                ("bob@example.com", "Bob", "Smith"),
                ("cid@example.com", "Cid", "Jones"),
            ] {
                user.new_model()
                    .with("email", email)?
                    .with("firstName", first)?
                    .with("lastName", last)?
                    .save()?;
            }

            let smiths = user.search(doc! { "lastName": "Smith" })?.all()?;
            assert_eq!(smiths.len(), 2);
            assert!(smiths
                .iter()
                .all(|m| m.get("lastName") == Value::from("Smith")));
            assert!(!smiths
                .iter()
                .any(|m| m.get("email") == Value::from("cid@example.com")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_after_save() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email", "age"])?;
            let saved = user
                .new_model()
                .with("email", "ann@example.com")?
                .with("age", 31)?
                .save()?;
            assert!(!saved.id().is_empty());
            assert!(saved.is_persisted());
            assert!(!saved.has_changes());

            let found = user.find(&saved.id())?.expect("saved user is found");
            assert_eq!(found.data(), saved.data());
            assert!(found.is_persisted());
            assert_eq!(found.get_as::<i32>("age")?, 31);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_does_not_alias_earlier_snapshot() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email", "lastName"])?;
            let original = user
                .new_model()
                .with("email", "ann@example.com")?
                .with("lastName", "Smith")?
                .save()?;

            let mut copy = user.find(&original.id())?.expect("user is found");
            copy.set("lastName", "Jones")?;
            assert!(copy.has_changes());
            let updated = copy.save()?;
            assert_eq!(updated.id(), original.id());

            let reread = user.find(&original.id())?.expect("user is found");
            assert_eq!(reread.get("lastName"), Value::from("Jones"));

            assert_eq!(original.get("lastName"), Value::from("Smith"));
            assert_eq!(
                original.persisted().map(|p| p.get("lastName")),
                Some(Value::from("Smith"))
            );
            assert_eq!(user.search(Query::all())?.count()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_save_frozen_model() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let frozen = user.new_model().with("email", "ann@example.com")?.freeze();

            let saved = frozen.save()?;
            assert!(frozen.is_frozen());
            assert!(frozen.id().is_empty());
            assert!(!frozen.is_persisted());

            assert!(!saved.is_frozen());
            assert!(saved.is_persisted());
            assert_eq!(saved.persisted(), Some(saved.data()));

            let again = frozen.save()?;
            assert_ne!(again.id(), saved.id());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_save_with_preset_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let mut model = user.new_model().with("email", "ann@example.com")?;
            model.set_id("custom-id")?;
            let saved = model.save()?;
            assert_eq!(saved.id(), ModelId::new("custom-id"));
            assert!(user.find(&ModelId::new("custom-id"))?.is_some());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_fresh_save_with_taken_id_replaces_record() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let mut first = user.new_model().with("email", "old@example.com")?;
            first.set_id("shared-id")?;
            first.save()?;
            let mut second = user.new_model().with("email", "new@example.com")?;
            second.set_id("shared-id")?;
            second.save()?;

            assert_eq!(user.search(Query::all())?.count()?, 1);
            let found = user.find(&ModelId::new("shared-id"))?.expect("record is found");
            assert_eq!(found.get("email"), Value::from("new@example.com"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_missing_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            assert!(user.find(&ModelId::new("missing"))?.is_none());
            assert!(user.find(&ModelId::EMPTY)?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let saved = user.new_model().with("email", "ann@example.com")?.save()?;

            assert!(saved.delete()?);
            assert!(user.find(&saved.id())?.is_none());
            assert!(!saved.delete()?);

            let unsaved = user.new_model();
            let err = unsaved.delete().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotIdentifiable);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_persisted_without_id_cannot_save() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let mut saved = user.new_model().with("email", "ann@example.com")?.save()?;
            saved.set("id", Value::Null)?;

            let err = saved.save().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotIdentifiable);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unset_field_is_removed_from_record() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email", "nickname"])?;
            let mut saved = user
                .new_model()
                .with("email", "ann@example.com")?
                .with("nickname", "annie")?
                .save()?;
            saved.set("nickname", Value::Null)?;
            saved.save()?;

            let found = user.find(&saved.id())?.expect("user is found");
            assert_eq!(found.get("nickname"), Value::Null);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

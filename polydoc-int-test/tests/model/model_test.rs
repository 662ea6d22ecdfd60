use chrono::{TimeZone, Utc};
use polydoc::common::{Value, CLASS_CHAIN, PERSISTED_FLAG};
use polydoc::errors::ErrorKind;
use polydoc::model::ModelClass;
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_undeclared_field_is_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let mut model = user.new_model();
            let err = model.set("password", "secret").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidFieldName);
            assert_eq!(model.get("password"), Value::Null);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_reserved_field_cannot_be_declared() {
    run_test(
        || create_test_context(),
        |ctx| {
            for field in [CLASS_CHAIN, PERSISTED_FLAG, "a.b", ""] {
                let err = ModelClass::builder(&ctx.name("Broken"))
                    .field(field)
                    .build()
                    .unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::InvalidFieldName);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_has_changes_tracks_snapshot() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let fresh = user.new_model();
            assert!(fresh.has_changes());

            let mut saved = fresh.with("email", "ann@example.com")?.save()?;
            assert!(!saved.has_changes());

            saved.set("email", "ann@example.org")?;
            assert!(saved.has_changes());
            saved.set("email", "ann@example.com")?;
            assert!(!saved.has_changes());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_typed_access() {
    run_test(
        || create_test_context(),
        |ctx| {
            let event = ctx.root("Event", &["title", "at", "attendees", "public"])?;
            let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
            let saved = event
                .new_model()
                .with("title", "launch")?
                .with("at", at)?
                .with("attendees", Value::Array(vec!["ann".into(), "bob".into()]))?
                .with("public", true)?
                .save()?;

            let found = event.find(&saved.id())?.expect("event is found");
            assert_eq!(found.get_as::<String>("title")?, "launch");
            assert_eq!(found.get_as::<chrono::DateTime<Utc>>("at")?, at);
            assert_eq!(
                found.get_as::<Vec<String>>("attendees")?,
                vec!["ann".to_string(), "bob".to_string()]
            );
            assert!(found.get_as::<bool>("public")?);
            assert!(found.get_as::<i64>("title").is_err());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_frozen_model_rejects_changes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let user = ctx.root("User", &["email"])?;
            let mut frozen = user.new_model().with("email", "ann@example.com")?.freeze();
            let err = frozen.set("email", "other").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert_eq!(frozen.get("email"), Value::from("ann@example.com"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

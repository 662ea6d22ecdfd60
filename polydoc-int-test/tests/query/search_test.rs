use polydoc::common::Value;
use polydoc::doc;
use polydoc::errors::{ErrorKind, OdmResult};
use polydoc::model::ModelClass;
use polydoc::query::{field, Query};
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test, TestContext};

fn seed_people(ctx: &TestContext) -> OdmResult<ModelClass> {
    let person = ctx.root("Person", &["name", "age", "tags", "stuff", "pets"])?;
    person
        .new_model()
        .with("name", "Ann")?
        .with("age", 40)?
        .with("tags", Value::Array(vec!["admin".into(), "staff".into()]))?
        .with("stuff", doc! { "foo": 1, "bar": 2 })?
        .with("pets", doc! { "list": [{ "kind": "dog", "age": 3 }] })?
        .save()?;
    person
        .new_model()
        .with("name", "Bob")?
        .with("age", 17)?
        .with("tags", Value::Array(vec!["staff".into()]))?
        .with("stuff", doc! { "foo": 1 })?
        .with("pets", doc! { "list": [{ "kind": "cat", "age": 9 }, { "kind": "dog", "age": 1 }] })?
        .save()?;
    person
        .new_model()
        .with("name", "Cid")?
        .with("age", 65)?
        .with("stuff", doc! { "foo": 2 })?
        .save()?;
    Ok(person)
}

fn names(person: &ModelClass, query: impl Into<Query>) -> OdmResult<Vec<String>> {
    let mut names = person
        .search(query)?
        .all()?
        .iter()
        .map(|m| m.get_as::<String>("name"))
        .collect::<OdmResult<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[test]
fn test_dotted_key_matches_nested_value() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert_eq!(names(&person, doc! { "stuff.foo": 1 })?, vec!["Ann", "Bob"]);
            assert_eq!(names(&person, doc! { "stuff.foo": 2 })?, vec!["Cid"]);
            assert!(names(&person, doc! { "stuff.baz": 1 })?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_nested_document_matches_every_query_key() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert_eq!(names(&person, doc! { "stuff": { "foo": 1 } })?, vec!["Ann", "Bob"]);
            assert_eq!(
                names(&person, doc! { "stuff": { "foo": 1, "bar": 2 } })?,
                vec!["Ann"]
            );
            assert!(names(&person, doc! { "stuff": { "foo": 2, "bar": 2 } })?.is_empty());
            assert_eq!(
                names(&person, doc! { "pets": { "list": [{ "kind": "cat" }] } })?,
                vec!["Bob"]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_dotted_key_matches_any_sub_key() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            // one matching sub-key is enough under a dotted path
            assert_eq!(
                names(&person, doc! { "pets.list": [{ "kind": "dog", "age": 99 }] })?,
                vec!["Ann"]
            );
            assert_eq!(
                names(&person, doc! { "pets.list": [{ "kind": "x" }, { "age": 1 }] })?,
                vec!["Bob"]
            );
            assert!(names(&person, doc! { "pets.list": [{ "kind": "x", "age": 99 }] })?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_dotted_key_reaches_into_arrays() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert_eq!(
                names(&person, doc! { "pets.list.kind": "dog" })?,
                vec!["Ann", "Bob"]
            );
            assert_eq!(names(&person, doc! { "pets.list.kind": "cat" })?, vec!["Bob"]);
            assert_eq!(names(&person, doc! { "pets.list.0.kind": "dog" })?, vec!["Ann"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_comparison_operators() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert_eq!(names(&person, field("age").gte(18))?, vec!["Ann", "Cid"]);
            assert_eq!(names(&person, field("age").lt(18))?, vec!["Bob"]);
            assert_eq!(names(&person, field("age").ne(40))?, vec!["Bob", "Cid"]);
            assert_eq!(names(&person, field("name").in_(["Ann", "Cid"]))?, vec!["Ann", "Cid"]);
            assert_eq!(names(&person, field("name").nin(["Ann", "Cid"]))?, vec!["Bob"]);
            assert_eq!(names(&person, field("tags").exists(false))?, vec!["Cid"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_eq_operator_on_array_means_contains() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert_eq!(names(&person, field("tags").eq("staff"))?, vec!["Ann", "Bob"]);
            assert_eq!(names(&person, field("tags").eq("admin"))?, vec!["Ann"]);
            // a plain value is compared to the whole array
            assert!(names(&person, doc! { "tags": "admin" })?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_and_or_composition() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            let adults_named_ann = field("age").gte(18).and(field("name").eq("Ann"))?;
            assert_eq!(names(&person, adults_named_ann)?, vec!["Ann"]);

            let young_or_old = field("age").lt(18).or(field("age").gt(60))?;
            assert_eq!(names(&person, young_or_old)?, vec!["Bob", "Cid"]);

            let nested = field("name")
                .eq("Cid")
                .or(field("stuff.foo").eq(1).and(field("age").lt(18))?)?;
            assert_eq!(names(&person, nested)?, vec!["Bob", "Cid"]);

            let raw = doc! { "$or": [{ "name": "Ann" }, { "stuff.foo": 2 }] };
            assert_eq!(names(&person, raw)?, vec!["Ann", "Cid"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_mixed_join_is_rejected() {
    let or_query = field("age")
        .lt(18)
        .or(field("age").gt(60))
        .expect("or joins");
    let err = or_query.and(field("name").eq("Ann")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidQuery);
    assert!(err.message().contains("already an OR query"));

    let and_query = field("age")
        .gte(18)
        .and(field("age").lt(65))
        .expect("and joins");
    let err = and_query.or(field("name").eq("Ann")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

    let err = Query::from(doc! { "name": "Ann" })
        .and(field("age").gt(1))
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidQuery);
}

#[test]
fn test_unknown_operator_matches_nothing() {
    run_test(
        || create_test_context(),
        |ctx| {
            let person = seed_people(&ctx)?;
            assert!(names(&person, doc! { "age": { "$regex": "4.*" } })?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_search_embedded_model_by_envelope_fields() {
    run_test(
        || create_test_context(),
        |ctx| {
            let owner = ctx.root("Owner", &["name"])?;
            let car = ctx.root("Car", &["model", "owner"])?;
            let ann = owner.new_model().with("name", "Ann")?.save()?;
            car.new_model()
                .with("model", "Beetle")?
                .with("owner", ann.clone())?
                .save()?;
            car.new_model().with("model", "Mini")?.save()?;

            let found = car.search(doc! { "owner.name": "Ann" })?.all()?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].get("model"), Value::from("Beetle"));
            match found[0].get("owner") {
                Value::Model(embedded) => {
                    assert_eq!(embedded.model_class(), &owner);
                    assert_eq!(embedded.id(), ann.id());
                }
                other => panic!("expected embedded model, got {:?}", other),
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

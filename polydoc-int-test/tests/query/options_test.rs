use polydoc::common::{SortOrder, Value};
use polydoc::doc;
use polydoc::errors::{ErrorKind, OdmResult};
use polydoc::model::ModelClass;
use polydoc::query::{field, Query};
use polydoc::store::{include_only, limit_to, order_by, skip_by, FindOptions};
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test, TestContext};

fn seed_scores(ctx: &TestContext) -> OdmResult<ModelClass> {
    let player = ctx.root("Player", &["name", "score", "team", "stats"])?;
    for (name, score, team) in [
        ("Ann", 30, "red"),
        ("Bob", 10, "blue"),
        ("Cid", 50, "red"),
        ("Dee", 20, "blue"),
        ("Eve", 40, "red"),
    ] {
        let wins = score / 10;
        player
            .new_model()
            .with("name", name)?
            .with("score", score)?
            .with("team", team)?
            .with("stats", doc! { "wins": wins, "losses": 1 })?
            .save()?;
    }
    Ok(player)
}

fn names_in_order(
    player: &ModelClass,
    query: impl Into<Query>,
    options: &FindOptions,
) -> OdmResult<Vec<String>> {
    player
        .search_with_options(query, options)?
        .all()?
        .iter()
        .map(|m| m.get_as::<String>("name"))
        .collect()
}

#[test]
fn test_sort_ascending_and_descending() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let ascending = order_by("score", SortOrder::Ascending);
            assert_eq!(
                names_in_order(&player, Query::all(), &ascending)?,
                vec!["Bob", "Dee", "Ann", "Eve", "Cid"]
            );

            let descending = FindOptions::new().sort("-score");
            assert_eq!(
                names_in_order(&player, Query::all(), &descending)?,
                vec!["Cid", "Eve", "Ann", "Dee", "Bob"]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_multi_key_and_nested_sort() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let options = FindOptions::new().sort("team").sort("-stats.wins");
            assert_eq!(
                names_in_order(&player, Query::all(), &options)?,
                vec!["Dee", "Bob", "Cid", "Eve", "Ann"]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_offset_and_limit() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let page = order_by("score", SortOrder::Ascending)
                .merge(&skip_by(1))
                .merge(&limit_to(2));
            assert_eq!(names_in_order(&player, Query::all(), &page)?, vec!["Dee", "Ann"]);

            let past_end = order_by("score", SortOrder::Ascending).offset(10);
            assert!(names_in_order(&player, Query::all(), &past_end)?.is_empty());

            let filtered = order_by("score", SortOrder::Descending).limit(1);
            assert_eq!(
                names_in_order(&player, field("team").eq("blue"), &filtered)?,
                vec!["Dee"]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_include_projection_keeps_identity() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let options = include_only(["name", "stats.wins"]);
            let found = player
                .search_with_options(doc! { "name": "Cid" }, &options)?
                .all()?;
            assert_eq!(found.len(), 1);

            let cid = &found[0];
            assert!(!cid.id().is_empty());
            assert_eq!(cid.model_class(), &player);
            assert_eq!(cid.get("name"), Value::from("Cid"));
            assert_eq!(cid.get("score"), Value::Null);
            assert_eq!(cid.get("stats"), Value::Document(doc! { "wins": 5 }));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_exclude_projection() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let ann = player.find_first(doc! { "name": "Ann" })?.expect("ann exists");

            let options = FindOptions::new().exclude("team").exclude("stats.losses");
            let found = player
                .find_with_options(&ann.id(), &options)?
                .expect("ann is found");
            assert_eq!(found.get("team"), Value::Null);
            assert_eq!(found.get("score"), Value::I32(30));
            assert_eq!(found.get("stats"), Value::Document(doc! { "wins": 3 }));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_include_and_exclude_same_field_is_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let options = FindOptions::new().include("name").exclude("name");
            let err = player
                .search_with_options(Query::all(), &options)
                .err()
                .expect("overlapping projection fails");
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_first() {
    run_test(
        || create_test_context(),
        |ctx| {
            let player = seed_scores(&ctx)?;
            let red = player.find_first(field("team").eq("red"))?.expect("a red player");
            assert_eq!(red.get("team"), Value::from("red"));
            assert!(player.find_first(doc! { "team": "green" })?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

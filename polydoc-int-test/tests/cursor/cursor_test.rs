use polydoc::errors::OdmResult;
use polydoc::model::ModelClass;
use polydoc::query::Query;
use polydoc::store::limit_to;
use polydoc_int_test::test_util::{cleanup, create_test_context, run_test, TestContext};

fn seed(ctx: &TestContext, count: usize) -> OdmResult<ModelClass> {
    let item = ctx.root("Item", &["position"])?;
    for position in 0..count {
        item.new_model().with("position", position as i64)?.save()?;
    }
    Ok(item)
}

#[test]
fn test_iterating_twice_replays_cache() {
    run_test(
        || create_test_context(),
        |ctx| {
            let item = seed(&ctx, 4)?;
            let mut cursor = item.search(Query::all())?;

            let first_two = cursor.iter().take(2).collect::<OdmResult<Vec<_>>>()?;
            assert_eq!(first_two.len(), 2);
            assert_eq!(cursor.cached(), 2);
            assert!(!cursor.is_exhausted());

            let everything = cursor.all()?;
            assert_eq!(everything.len(), 4);
            assert_eq!(everything[0].id(), first_two[0].id());
            assert_eq!(everything[1].id(), first_two[1].id());
            assert!(cursor.is_exhausted());

            let mut replayed = 0;
            for model in &mut cursor {
                model?;
                replayed += 1;
            }
            assert_eq!(replayed, 4);
            assert_eq!(cursor.cached(), 4);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_count_is_independent_of_consumption() {
    run_test(
        || create_test_context(),
        |ctx| {
            let item = seed(&ctx, 3)?;
            let mut cursor = item.search(Query::all())?;
            assert_eq!(cursor.count()?, 3);
            assert_eq!(cursor.cached(), 0);

            cursor.all()?;
            assert_eq!(cursor.count()?, 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_count_ignores_paging() {
    run_test(
        || create_test_context(),
        |ctx| {
            let item = seed(&ctx, 3)?;
            let mut cursor = item.search_with_options(Query::all(), &limit_to(1))?;
            assert_eq!(cursor.all()?.len(), 1);
            assert_eq!(cursor.count()?, 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_first_returns_head_of_result() {
    run_test(
        || create_test_context(),
        |ctx| {
            let item = seed(&ctx, 3)?;
            let mut cursor = item.search(Query::all())?;
            let first = cursor.first()?.expect("a first item");
            assert!(cursor.is_exhausted());
            assert_eq!(cursor.all()?[0].id(), first.id());

            let mut empty = item.search(polydoc::doc! { "position": 99 })?;
            assert!(empty.first()?.is_none());
            assert_eq!(empty.count()?, 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cursor_skips_sibling_records() {
    run_test(
        || create_test_context(),
        |ctx| {
            let shape = ctx.root("Shape", &["sides"])?;
            let square = ctx.child("Square", &shape, &[])?;
            let triangle = ctx.child("Triangle", &shape, &[])?;
            square.new_model().with("sides", 4)?.save()?;
            triangle.new_model().with("sides", 3)?.save()?;
            shape.new_model().with("sides", 0)?.save()?;

            let mut squares = square.search(Query::all())?;
            assert_eq!(squares.model_class(), &square);
            assert_eq!(squares.all()?.len(), 1);
            assert_eq!(shape.search(Query::all())?.all()?.len(), 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

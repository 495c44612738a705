//! ORDER BY tests

mod common;

use common::{TestContext, s, setup_people};
use csvql::{Config, DataType, Value};

fn column(rows: Vec<Vec<Value>>, index: usize) -> Vec<Value> {
    rows.into_iter().map(|row| row[index].clone()).collect()
}

#[test]
fn test_order_by_column() {
    let ctx = setup_people();
    let rows = ctx.query_rows("SELECT name FROM people ORDER BY name DESC");
    assert_eq!(
        column(rows, 0),
        vec![s("Eve"), s("Dana"), s("Charlie"), s("Bob"), s("Alice")]
    );
}

#[test]
fn test_order_by_multiple_keys_is_stable() {
    let ctx = setup_people();
    let rows = ctx.query_rows("SELECT id FROM people ORDER BY dept");
    // Ties keep input order.
    assert_eq!(column(rows, 0), vec![s("1"), s("3"), s("2"), s("5"), s("4")]);

    let rows = ctx.query_rows("SELECT id FROM people ORDER BY dept ASC, age DESC");
    assert_eq!(column(rows, 0), vec![s("3"), s("1"), s("5"), s("2"), s("4")]);
}

#[test]
fn test_order_by_alias_and_position() {
    let ctx = setup_people();
    let by_alias = ctx.query_rows("SELECT name AS who, age FROM people ORDER BY who");
    let by_position = ctx.query_rows("SELECT name AS who, age FROM people ORDER BY 1");
    assert_eq!(by_alias, by_position);
    assert_eq!(by_alias[0], vec![s("Alice"), s("25")]);

    ctx.assert_error_contains("SELECT name FROM people ORDER BY 3", "out of range");
}

#[test]
fn test_order_by_expression_not_selected() {
    let ctx = setup_people();
    let rows = ctx.query_rows("SELECT name FROM people ORDER BY LENGTH(name) DESC, name");
    assert_eq!(
        column(rows, 0),
        vec![s("Charlie"), s("Alice"), s("Dana"), s("Bob"), s("Eve")]
    );
}

#[test]
fn test_order_by_numeric_type() {
    let mut ctx =
        TestContext::with_config(Config::default().with_column_types(vec![DataType::I32]));
    ctx.write_table("nums", "N\n10\n9\n100\n");
    let rows = ctx.query_rows("SELECT n FROM nums ORDER BY n");
    assert_eq!(
        column(rows, 0),
        vec![Value::I32(9), Value::I32(10), Value::I32(100)]
    );

    // Untyped, the same values sort as text.
    let mut ctx = TestContext::new();
    ctx.write_table("nums", "N\n10\n9\n100\n");
    let rows = ctx.query_rows("SELECT n FROM nums ORDER BY n");
    assert_eq!(column(rows, 0), vec![s("10"), s("100"), s("9")]);
}

#[test]
fn test_order_by_aggregate() {
    let ctx = setup_people();
    let rows = ctx.query_rows("SELECT dept FROM people GROUP BY dept ORDER BY MAX(age)");
    assert_eq!(column(rows, 0), vec![s("sales"), s("eng"), s("ops")]);
}

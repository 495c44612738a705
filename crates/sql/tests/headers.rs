//! Header handling and per-table options read from properties

mod common;

use common::{TestContext, s};
use csvql::{Config, Error, Value};
use std::collections::HashMap;

fn config(pairs: &[(&str, &str)]) -> Config {
    let properties: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_properties(&properties).unwrap()
}

fn labels(ctx: &TestContext, sql: &str) -> Vec<String> {
    ctx.database()
        .prepare(sql)
        .unwrap()
        .metadata()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

#[test]
fn test_header_names_are_trimmed() {
    let mut ctx = TestContext::new();
    ctx.write_table("t", " Id , Name \n1,ann\n");
    assert_eq!(labels(&ctx, "SELECT * FROM t"), vec!["Id", "Name"]);
    assert_eq!(ctx.query_rows("SELECT name FROM t"), vec![vec![s("ann")]]);
}

#[test]
fn test_suppress_headers() {
    let mut ctx = TestContext::with_config(config(&[("suppressHeaders", "true")]));
    ctx.write_table("raw", "1,ann\n2,bob\n");
    assert_eq!(labels(&ctx, "SELECT * FROM raw"), vec!["COLUMN1", "COLUMN2"]);
    assert_eq!(
        ctx.query_rows("SELECT column2 FROM raw WHERE column1 = '1'"),
        vec![vec![s("ann")]]
    );
    ctx.assert_row_count("SELECT * FROM raw", 2);
}

#[test]
fn test_header_line_replaces_file_header() {
    let mut ctx = TestContext::with_config(config(&[("headerline", "KEY,LABEL")]));
    ctx.write_table("t", "ID,NAME\n1,ann\n");
    assert_eq!(labels(&ctx, "SELECT * FROM t"), vec!["KEY", "LABEL"]);
    assert_eq!(ctx.query_rows("SELECT label FROM t"), vec![vec![s("ann")]]);

    let mut ctx = TestContext::with_config(config(&[
        ("headerline", "KEY,LABEL"),
        ("suppressHeaders", "true"),
    ]));
    ctx.write_table("t", "1,ann\n2,bob\n");
    ctx.assert_row_count("SELECT * FROM t", 2);
}

#[test]
fn test_defective_headers() {
    let mut ctx = TestContext::with_config(config(&[("defectiveHeaders", "true")]));
    ctx.write_table("t", "A,,C\n1,2,3\n");
    assert_eq!(labels(&ctx, "SELECT * FROM t"), vec!["A", "COLUMN2", "C"]);
    assert_eq!(ctx.query_rows("SELECT column2 FROM t"), vec![vec![s("2")]]);
}

#[test]
fn test_duplicate_header() {
    let mut ctx = TestContext::new();
    ctx.write_table("t", "A,B,a\n1,2,3\n");
    assert_eq!(
        ctx.query_error("SELECT * FROM t"),
        Error::DuplicateColumn("a".into())
    );
}

#[test]
fn test_comment_lines_before_header() {
    let mut ctx = TestContext::with_config(config(&[("commentChar", "#")]));
    ctx.write_table("t", "# exported\n# by hand\nA,B\n1,2\n#3,4\n");
    // The marker only applies while the header is read.
    assert_eq!(
        ctx.query_rows("SELECT a FROM t"),
        vec![vec![s("1")], vec![s("#3")]]
    );
}

#[test]
fn test_skip_leading_lines() {
    let mut ctx = TestContext::with_config(config(&[
        ("skipLeadingLines", "2"),
        ("skipLeadingDataLines", "1"),
    ]));
    ctx.write_table("t", "report\ngenerated today\nA,B\nunits,count\n1,2\n3,4\n");
    assert_eq!(
        ctx.query_rows("SELECT a, b FROM t"),
        vec![vec![s("1"), s("2")], vec![s("3"), s("4")]]
    );
}

#[test]
fn test_table_overrides() {
    let mut ctx = TestContext::with_config(config(&[
        ("separator.semi", ";"),
        ("columnTypes.semi", "Int,String"),
    ]));
    ctx.write_table("semi", "A;B\n1;x\n");
    ctx.write_table("comma", "A,B\n1,x\n");
    assert_eq!(
        ctx.query_rows("SELECT a, b FROM semi"),
        vec![vec![Value::I32(1), s("x")]]
    );
    assert_eq!(
        ctx.query_rows("SELECT a, b FROM comma"),
        vec![vec![s("1"), s("x")]]
    );
}

#[test]
fn test_file_extension_and_table_names() {
    let mut ctx = TestContext::with_config(config(&[("fileExtension", ".txt")]));
    ctx.write_table("b", "X\n1\n");
    ctx.write_table("a", "X\n2\n");
    assert_eq!(ctx.database().table_names().unwrap(), vec!["a", "b"]);
    assert_eq!(ctx.query_rows("SELECT x FROM B"), vec![vec![s("1")]]);
    assert_eq!(
        ctx.query_error("SELECT x FROM c"),
        Error::TableNotFound("c".into())
    );
}

#[test]
fn test_pivot_layout() {
    let mut ctx = TestContext::with_config(config(&[
        ("suppressHeaders", "true"),
        ("transposedLines", "1"),
        ("transposedFieldsToSkip", "1"),
        ("headerline", "MONTH,REGION,AMOUNT"),
        ("columnTypes", "String,String,Int"),
    ]));
    ctx.write_table("sales", ",Jan,Feb\nnorth,10,12\nsouth,7,9\n");

    assert_eq!(
        labels(&ctx, "SELECT * FROM sales"),
        vec!["MONTH", "REGION", "AMOUNT"]
    );
    assert_eq!(
        ctx.query_rows("SELECT month, region, amount FROM sales"),
        vec![
            vec![s("Jan"), s("north"), Value::I32(10)],
            vec![s("Feb"), s("north"), Value::I32(12)],
            vec![s("Jan"), s("south"), Value::I32(7)],
            vec![s("Feb"), s("south"), Value::I32(9)],
        ]
    );
    assert_eq!(
        ctx.query_rows("SELECT month, SUM(amount) FROM sales GROUP BY month"),
        vec![
            vec![s("Jan"), Value::I64(17)],
            vec![s("Feb"), Value::I64(21)],
        ]
    );
}

#[test]
fn test_pivot_synthesized_names() {
    let mut ctx = TestContext::with_config(config(&[
        ("transposedLines", "2"),
        ("transposedFieldsToSkip", "1"),
    ]));
    ctx.write_table("grid", "ignored header\n,Jan,Feb\n,2024,2024\nnorth,10,12\n");
    assert_eq!(
        labels(&ctx, "SELECT * FROM grid"),
        vec!["COLUMN1", "COLUMN2", "COLUMN3", "COLUMN4"]
    );
    assert_eq!(
        ctx.query_rows("SELECT * FROM grid WHERE column1 = 'Feb'"),
        vec![vec![s("Feb"), s("2024"), s("north"), s("12")]]
    );
}

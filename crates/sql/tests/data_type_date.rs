//! Date, time and timestamp columns

mod common;

use chrono::{NaiveDate, NaiveTime};
use common::{TestContext, s};
use csvql::{Config, DataType, TableOptions, Value};

fn date(y: i32, m: u32, d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn events() -> TestContext {
    let mut ctx = TestContext::with_config(
        Config::default().with_column_types(vec![DataType::I32, DataType::Date]),
    );
    ctx.write_table("events", "ID,DAY\n1,2011-10-19\n2,2012-01-02\n3,\n");
    ctx
}

#[test]
fn test_date_column_equals_string() {
    let ctx = events();
    let rows = ctx.query_rows("SELECT id, day FROM events WHERE day = '2011-10-19'");
    assert_eq!(rows, vec![vec![Value::I32(1), date(2011, 10, 19)]]);
}

#[test]
fn test_date_against_unparseable_string_is_false() {
    let ctx = events();
    ctx.assert_row_count("SELECT * FROM events WHERE day = 'sometime'", 0);
    ctx.assert_row_count("SELECT * FROM events WHERE day = ''", 0);
    ctx.assert_row_count("SELECT * FROM events WHERE day <> 'sometime'", 0);
    ctx.assert_row_count("SELECT * FROM events WHERE day > 'sometime'", 0);
    ctx.assert_row_count("SELECT * FROM events WHERE day < 'sometime'", 0);
}

#[test]
fn test_date_ordering_and_ranges() {
    let ctx = events();
    let rows = ctx.query_rows("SELECT id FROM events ORDER BY day DESC");
    assert_eq!(rows, vec![vec![Value::I32(2)], vec![Value::I32(1)], vec![Value::I32(3)]]);

    let rows = ctx.query_rows("SELECT id FROM events WHERE day > '2012-01-01'");
    assert_eq!(rows, vec![vec![Value::I32(2)]]);

    let rows = ctx.query_rows("SELECT MIN(day), MAX(day) FROM events");
    assert_eq!(rows, vec![vec![date(2011, 10, 19), date(2012, 1, 2)]]);
}

#[test]
fn test_date_parameter() {
    let ctx = events();
    let rows = ctx.query_params(
        "SELECT id FROM events WHERE day < ?",
        &[Value::from(NaiveDate::from_ymd_opt(2012, 1, 1).unwrap())],
    );
    assert_eq!(rows, vec![vec![Value::I32(1)]]);
}

#[test]
fn test_date_arithmetic() {
    let ctx = events();
    ctx.assert_query_value(
        "SELECT day + 14 AS later FROM events WHERE id = 2",
        "later",
        date(2012, 1, 16),
    );
    ctx.assert_query_value(
        "SELECT day - 1 AS earlier FROM events WHERE id = 2",
        "earlier",
        date(2012, 1, 1),
    );
}

#[test]
fn test_mismatched_date_reads_as_epoch() {
    let mut ctx = TestContext::with_config(
        Config::default().with_column_types(vec![DataType::I32, DataType::Date]),
    );
    ctx.write_table("odd", "ID,DAY\n1,19/10/2011\n");
    ctx.assert_query_value("SELECT day FROM odd", "DAY", date(1970, 1, 1));
}

#[test]
fn test_custom_date_format() {
    let mut ctx = TestContext::with_config(
        Config::default()
            .with_column_types(vec![DataType::Str, DataType::Date])
            .with_date_format("dd.mm.yyyy"),
    );
    ctx.write_table("eu", "NAME,BORN\nann,19.10.2011\nbob,2.1.2012\n");
    let rows = ctx.query_rows("SELECT name, born FROM eu WHERE born >= '01.01.2012'");
    assert_eq!(rows, vec![vec![s("bob"), date(2012, 1, 2)]]);
}

#[test]
fn test_time_format() {
    let mut options = TableOptions::default();
    options.column_types = vec![DataType::Str, DataType::Time];
    options.time_format = "HHmm".into();
    let mut ctx = TestContext::with_config(Config::default().with_table_options("shifts", options));
    ctx.write_table("shifts", "WHO,STARTS\nann,0930\nbob,1415\n");

    let rows = ctx.query_rows("SELECT who, starts FROM shifts WHERE starts > '1200'");
    assert_eq!(
        rows,
        vec![vec![
            s("bob"),
            Value::Time(NaiveTime::from_hms_opt(14, 15, 0).unwrap())
        ]]
    );
}

#[test]
fn test_timestamps() {
    let mut ctx = TestContext::with_config(
        Config::default().with_column_types(vec![DataType::I32, DataType::Timestamp]),
    );
    ctx.write_table(
        "log",
        "ID,AT\n1,2024-03-01 08:00:00\n2,2024-03-01T17:30:00\n3,2024-03-02\n",
    );
    let rows = ctx.query_rows("SELECT id FROM log WHERE at > '2024-03-01 12:00:00' ORDER BY at");
    assert_eq!(rows, vec![vec![Value::I32(2)], vec![Value::I32(3)]]);
}

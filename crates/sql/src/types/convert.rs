//! Conversion of raw field strings into typed values
//!
//! Conversion never fails: numeric parse failures degrade to zero and
//! date/time parse failures degrade to NULL. A NULL (absent) raw value is NULL
//! for every target type.

use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Date used when a value does not match the configured date pattern.
const FALLBACK_DATE: &str = "1970-01-01";

/// Timestamp layouts tried when no explicit timestamp format is configured.
const TIMESTAMP_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DatePart {
    Day,
    Month,
    Year,
}

/// A date pattern built from runs of `d`, `m` and `y`, e.g. `dd.mm.yyyy`.
#[derive(Clone, Debug)]
pub struct DateFormat {
    pattern: String,
    matcher: Regex,
    parts: Vec<DatePart>,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        let lower = pattern.to_lowercase();
        let mut regex = String::from("^");
        let mut parts = Vec::new();
        let mut chars = lower.chars().peekable();
        while let Some(c) = chars.next() {
            let part = match c {
                'd' => DatePart::Day,
                'm' => DatePart::Month,
                'y' => DatePart::Year,
                other => {
                    regex.push_str(&regex::escape(&other.to_string()));
                    continue;
                }
            };
            while chars.next_if_eq(&c).is_some() {}
            regex.push_str(match part {
                DatePart::Year => r"(\d{1,4})",
                _ => r"(\d{1,2})",
            });
            parts.push(part);
        }
        regex.push('$');

        for required in [DatePart::Day, DatePart::Month, DatePart::Year] {
            if parts.iter().filter(|p| **p == required).count() != 1 {
                return Err(Error::Config(format!(
                    "date format '{}' needs exactly one day, month and year field",
                    pattern
                )));
            }
        }

        let matcher = Regex::new(&regex)
            .map_err(|e| Error::Config(format!("invalid date format '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            parts,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Rewrites a date in this format as `YYYY-MM-DD`. Input that does not
    /// match the pattern yields `1970-01-01`.
    pub fn normalize(&self, input: &str) -> String {
        let Some(captures) = self.matcher.captures(input.trim()) else {
            return FALLBACK_DATE.to_string();
        };
        let (mut year, mut month, mut day) = ("", "", "");
        for (i, part) in self.parts.iter().enumerate() {
            let text = captures.get(i + 1).map_or("", |m| m.as_str());
            match part {
                DatePart::Year => year = text,
                DatePart::Month => month = text,
                DatePart::Day => day = text,
            }
        }
        format!("{:0>4}-{:0>2}-{:0>2}", year, month, day)
    }

    pub fn matches(&self, input: &str) -> bool {
        self.matcher.is_match(input.trim())
    }

    pub fn parse(&self, input: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.normalize(input), "%Y-%m-%d").ok()
    }
}

/// A time pattern locating hour, minute and second by the positions of the
/// `HH`, `mm` and `ss` markers, e.g. `HH:mm:ss` or `HHmm`.
#[derive(Clone, Debug)]
pub struct TimeFormat {
    pattern: String,
    hour: Option<usize>,
    minute: Option<usize>,
    second: Option<usize>,
}

impl TimeFormat {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            hour: pattern.find("HH"),
            minute: pattern.find("mm"),
            second: pattern.find("ss"),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Rewrites a time in this format as `HH:MM:SS`.
    pub fn normalize(&self, input: &str) -> String {
        let input = input.trim();
        let width = self.pattern.chars().count();
        let pad = width.saturating_sub(input.chars().count());
        let padded: Vec<char> = std::iter::repeat_n('0', pad)
            .chain(input.chars())
            .collect();
        let slice = |position: Option<usize>| -> String {
            position
                .and_then(|start| padded.get(start..start + 2))
                .map(|chars| chars.iter().collect())
                .unwrap_or_else(|| "00".to_string())
        };
        format!(
            "{}:{}:{}",
            slice(self.hour),
            slice(self.minute),
            slice(self.second)
        )
    }

    pub fn parse(&self, input: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.normalize(input), "%H:%M:%S").ok()
    }
}

/// Converts raw strings to typed values using the configured date, time and
/// timestamp formats.
#[derive(Clone, Debug)]
pub struct Converter {
    date_format: DateFormat,
    time_format: TimeFormat,
    timestamp_format: Option<String>,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            date_format: DateFormat::new("yyyy-mm-dd").expect("default date format is valid"),
            time_format: TimeFormat::new("HH:mm:ss"),
            timestamp_format: None,
        }
    }
}

impl Converter {
    pub fn new(
        date_format: &str,
        time_format: &str,
        timestamp_format: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            date_format: DateFormat::new(date_format)?,
            time_format: TimeFormat::new(time_format),
            timestamp_format: timestamp_format.map(str::to_string),
        })
    }

    /// Converts a nullable raw string into the given type.
    pub fn convert(&self, raw: Option<&str>, target: DataType) -> Value {
        let Some(raw) = raw else {
            return Value::Null;
        };
        match target {
            DataType::Str => Value::Str(raw.to_string()),
            DataType::Bool => Value::Bool(raw.trim().eq_ignore_ascii_case("true")),
            DataType::I8 => Value::I8(parse_or_zero(raw)),
            DataType::I16 => Value::I16(parse_or_zero(raw)),
            DataType::I32 => Value::I32(parse_or_zero(raw)),
            DataType::I64 => Value::I64(parse_or_zero(raw)),
            DataType::F32 => Value::F32(parse_or_zero(raw)),
            DataType::F64 => Value::F64(parse_or_zero(raw)),
            DataType::Decimal => Value::Decimal(
                Decimal::from_str(raw.trim())
                    .or_else(|_| Decimal::from_scientific(raw.trim()))
                    .unwrap_or_default(),
            ),
            DataType::Date => self.parse_date(raw).map_or(Value::Null, Value::Date),
            DataType::Time => self.parse_time(raw).map_or(Value::Null, Value::Time),
            DataType::Timestamp => self
                .parse_timestamp(raw)
                .map_or(Value::Null, Value::Timestamp),
            DataType::Bytea => Value::Bytea(raw.as_bytes().to_vec()),
        }
    }

    /// Converts a string value into the type of a temporal value, used when a
    /// date/time column is compared against a string literal. A string that
    /// does not look like a date stays incomparable instead of reading as the
    /// epoch.
    pub fn coerce_like(&self, text: &str, like: &Value) -> Option<Value> {
        match like {
            Value::Date(_) if !self.date_format.matches(text) => None,
            Value::Date(_) => self.parse_date(text).map(Value::Date),
            Value::Time(_) => self.parse_time(text).map(Value::Time),
            Value::Timestamp(_) => self.parse_timestamp(text).map(Value::Timestamp),
            _ => None,
        }
    }

    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        if raw.trim().is_empty() {
            return None;
        }
        self.date_format.parse(raw)
    }

    pub fn parse_time(&self, raw: &str) -> Option<NaiveTime> {
        if raw.trim().is_empty() {
            return None;
        }
        self.time_format.parse(raw)
    }

    pub fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Some(format) = &self.timestamp_format {
            return NaiveDateTime::parse_from_str(raw, format).ok();
        }
        TIMESTAMP_LAYOUTS
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }
}

fn parse_or_zero<T: FromStr + Default>(raw: &str) -> T {
    raw.trim().parse().unwrap_or_default()
}

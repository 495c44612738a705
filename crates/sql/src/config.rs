//! Connection options
//!
//! Options are read from a flat set of named properties. Any option may be
//! overridden for a single table by suffixing its name with `.<TABLE>`, e.g.
//! `separator.orders=;`. Table names in overrides are matched
//! case-insensitively.

use crate::error::{Error, Result};
use crate::types::{Converter, DataType};
use std::collections::HashMap;
use std::str::FromStr;

/// How quote characters inside quoted fields are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Doubled quotes collapse to one literal quote.
    #[default]
    Default,
    /// Same as default; the second quote of a pair is consumed.
    Sql,
    /// Backslash escapes the next character; doubled quotes are kept as-is.
    C,
}

impl FromStr for QuoteStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEFAULT" | "" => Ok(QuoteStyle::Default),
            "SQL" => Ok(QuoteStyle::Sql),
            "C" => Ok(QuoteStyle::C),
            other => Err(Error::Config(format!("unknown quoteStyle '{}'", other))),
        }
    }
}

/// Options that control how a single table is read.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Field separator, may be more than one character.
    pub separator: String,
    /// Quote character, or None to disable quoting.
    pub quote: Option<char>,
    pub quote_style: QuoteStyle,
    /// The first data line is not a header; columns are named COLUMN1..n.
    pub suppress_headers: bool,
    /// Explicit header line used instead of the file's header.
    pub header_line: Option<String>,
    pub trim_headers: bool,
    pub trim_values: bool,
    /// Blank header names are replaced by COLUMNn.
    pub defective_headers: bool,
    /// Lines starting with this prefix are skipped while reading the header.
    pub comment_prefix: Option<String>,
    pub skip_leading_lines: usize,
    pub skip_leading_data_lines: usize,
    /// Records that fail to tokenize or have the wrong field count are
    /// discarded instead of failing the query.
    pub ignore_unparseable_lines: bool,
    /// Declared column types by position; missing entries are strings.
    pub column_types: Vec<DataType>,
    pub date_format: String,
    pub time_format: String,
    pub timestamp_format: Option<String>,
    pub charset: String,
    /// Number of leading lines joined to each later line in pivot mode.
    pub transposed_lines: usize,
    /// Number of leading fields of each later line repeated in pivot mode.
    pub transposed_fields_to_skip: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            quote: Some('"'),
            quote_style: QuoteStyle::Default,
            suppress_headers: false,
            header_line: None,
            trim_headers: true,
            trim_values: false,
            defective_headers: false,
            comment_prefix: None,
            skip_leading_lines: 0,
            skip_leading_data_lines: 0,
            ignore_unparseable_lines: false,
            column_types: Vec::new(),
            date_format: "yyyy-mm-dd".to_string(),
            time_format: "HH:mm:ss".to_string(),
            timestamp_format: None,
            charset: "UTF-8".to_string(),
            transposed_lines: 0,
            transposed_fields_to_skip: 0,
        }
    }
}

impl TableOptions {
    /// The declared type of the column at the given position.
    pub fn column_type(&self, index: usize) -> DataType {
        self.column_types.get(index).copied().unwrap_or_default()
    }

    /// Pivot mode requires both counts to be non-zero.
    pub fn is_pivot(&self) -> bool {
        self.transposed_lines > 0 && self.transposed_fields_to_skip > 0
    }

    pub fn converter(&self) -> Result<Converter> {
        Converter::new(
            &self.date_format,
            &self.time_format,
            self.timestamp_format.as_deref(),
        )
    }

    /// Applies a single named option. Unknown names are ignored so that
    /// callers can pass a shared property set.
    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "separator" => {
                let separator = unescape(value);
                if separator.is_empty() {
                    return Err(Error::Config("separator must not be empty".into()));
                }
                self.separator = separator;
            }
            "quotechar" => {
                let mut chars = value.chars();
                self.quote = match (chars.next(), chars.next()) {
                    (None, _) => None,
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(Error::Config(format!(
                            "quotechar must be a single character, got '{}'",
                            value
                        )));
                    }
                };
            }
            "quoteStyle" => self.quote_style = value.parse()?,
            "suppressHeaders" => self.suppress_headers = parse_bool(key, value)?,
            "headerline" => {
                self.header_line = (!value.is_empty()).then(|| value.to_string());
            }
            "trimHeaders" => self.trim_headers = parse_bool(key, value)?,
            "trimValues" => self.trim_values = parse_bool(key, value)?,
            "defectiveHeaders" => self.defective_headers = parse_bool(key, value)?,
            "commentChar" => {
                self.comment_prefix = (!value.is_empty()).then(|| value.to_string());
            }
            "skipLeadingLines" => self.skip_leading_lines = parse_count(key, value)?,
            "skipLeadingDataLines" => self.skip_leading_data_lines = parse_count(key, value)?,
            "ignoreNonParseableLines" => {
                self.ignore_unparseable_lines = parse_bool(key, value)?
            }
            "columnTypes" => {
                self.column_types = value
                    .split(',')
                    .filter(|name| !name.trim().is_empty())
                    .map(DataType::from_name)
                    .collect::<Result<_>>()?;
            }
            "dateFormat" => self.date_format = value.to_string(),
            "timeFormat" => self.time_format = value.to_string(),
            "timestampFormat" => {
                self.timestamp_format = (!value.is_empty()).then(|| value.to_string());
            }
            "charset" => self.charset = value.to_string(),
            "transposedLines" => self.transposed_lines = parse_count(key, value)?,
            "transposedFieldsToSkip" => {
                self.transposed_fields_to_skip = parse_count(key, value)?
            }
            _ => {}
        }
        Ok(())
    }
}

/// Connection-wide configuration with per-table overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File name suffix appended to table names.
    pub file_extension: String,
    /// Options used for tables without overrides.
    pub defaults: TableOptions,
    /// Options for tables with overrides, keyed by uppercase table name.
    overrides: HashMap<String, TableOptions>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_extension: ".csv".to_string(),
            defaults: TableOptions::default(),
            overrides: HashMap::new(),
        }
    }
}

impl Config {
    /// Builds a configuration from flat named properties.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut config = Config::default();
        let mut table_properties: HashMap<String, Vec<(&str, &str)>> = HashMap::new();

        for (key, value) in properties {
            match key.split_once('.') {
                Some((option, table)) if !table.is_empty() => {
                    table_properties
                        .entry(table.to_uppercase())
                        .or_default()
                        .push((option, value));
                }
                _ if key == "fileExtension" => config.file_extension = value.clone(),
                _ => config.defaults.apply(key, value)?,
            }
        }

        for (table, options) in table_properties {
            let mut table_options = config.defaults.clone();
            for (option, value) in options {
                table_options.apply(option, value)?;
            }
            config.overrides.insert(table, table_options);
        }

        config.defaults.converter()?;
        for options in config.overrides.values() {
            options.converter()?;
        }
        Ok(config)
    }

    /// The effective options for a table.
    pub fn table_options(&self, table: &str) -> &TableOptions {
        self.overrides
            .get(&table.to_uppercase())
            .unwrap_or(&self.defaults)
    }

    /// Sets options for a single table, replacing any earlier override.
    pub fn with_table_options(mut self, table: &str, options: TableOptions) -> Self {
        self.overrides.insert(table.to_uppercase(), options);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.defaults.separator = separator.into();
        self
    }

    pub fn with_quote(mut self, quote: Option<char>, style: QuoteStyle) -> Self {
        self.defaults.quote = quote;
        self.defaults.quote_style = style;
        self
    }

    pub fn with_suppress_headers(mut self, suppress: bool) -> Self {
        self.defaults.suppress_headers = suppress;
        self
    }

    pub fn with_header_line(mut self, header_line: impl Into<String>) -> Self {
        self.defaults.header_line = Some(header_line.into());
        self
    }

    pub fn with_column_types(mut self, types: Vec<DataType>) -> Self {
        self.defaults.column_types = types;
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.defaults.date_format = format.into();
        self
    }

    pub fn with_ignore_unparseable_lines(mut self, ignore: bool) -> Self {
        self.defaults.ignore_unparseable_lines = ignore;
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" | "" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))
    })
}

/// Expands `\t` written as two characters, so tabs can be given in
/// property files.
fn unescape(value: &str) -> String {
    value.replace("\\t", "\t")
}

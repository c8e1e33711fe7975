//! SQL dialect specialization
//!
//! A dialect is the override surface consulted while the statement tree is
//! built (leaf predicates, casts, time parts) and while it is rendered
//! (identifier quoting, null ordering, row limit). The trait defaults produce
//! ANSI SQL; each engine overrides only what differs. Nothing ever rewrites
//! finished SQL text.

mod ansi;
mod mysql;
mod postgres;
mod presto;
mod sqlite;

use std::fmt;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::Result;
use crate::sql::{BinaryOperator, Expr, Literal};
use crate::time::TimePart;

pub use ansi::AnsiDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use presto::PrestoDialect;
pub use sqlite::SqliteDialect;

/// Escape character used in generated LIKE patterns
pub const LIKE_ESCAPE: char = '!';

/// How `NULLS FIRST` is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// `expr ASC NULLS FIRST`
    Keyword,
    /// `expr IS NULL DESC, expr ASC`
    Emulated,
}

pub trait SqlDialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR"
    }

    fn integer_type(&self) -> &'static str {
        "BIGINT"
    }

    fn float_type(&self) -> &'static str {
        "DOUBLE"
    }

    // -- leaf predicates ------------------------------------------------------

    /// Column as compared by equality predicates
    fn equality_operand(&self, column: Expr) -> Expr {
        column
    }

    /// Column as matched by substring and pattern predicates
    fn search_operand(&self, column: Expr) -> Expr {
        column
    }

    fn equals(&self, column: Expr, value: &str) -> Expr {
        Expr::binary(self.equality_operand(column), BinaryOperator::Eq, Expr::string(value))
    }

    fn contains(&self, column: Expr, text: &str) -> Expr {
        Expr::Like {
            expr: Box::new(self.search_operand(column)),
            pattern: Box::new(Expr::string(contains_pattern(text))),
            escape: Some(LIKE_ESCAPE),
        }
    }

    fn contains_insensitive(&self, column: Expr, text: &str) -> Expr {
        Expr::Like {
            expr: Box::new(Expr::lower(self.search_operand(column))),
            pattern: Box::new(Expr::lower(Expr::string(contains_pattern(text)))),
            escape: Some(LIKE_ESCAPE),
        }
    }

    /// Fails for engines without a built-in regular expression operator
    fn regex_match(&self, column: Expr, pattern: &str) -> Result<Expr> {
        Ok(Expr::function("REGEXP_LIKE", vec![self.search_operand(column), Expr::string(pattern)]))
    }

    // -- aggregates -----------------------------------------------------------

    /// Aggregate call as projected, forcing a driver-readable result type
    fn aggregate_projection(&self, call: Expr, _floating_point: bool) -> Expr {
        call
    }

    // -- time -----------------------------------------------------------------

    /// Timestamp column as a timestamp value (engines storing text parse it here)
    fn timestamp_column(&self, column: Expr) -> Expr {
        column
    }

    fn time_part(&self, part: TimePart, timestamp: Expr) -> Expr {
        Expr::Extract {
            field: extract_field(part).to_string(),
            expr: Box::new(timestamp),
        }
    }

    fn timestamp_literal(&self, ts: NaiveDateTime) -> Expr {
        Expr::Literal(Literal::Timestamp(ts))
    }

    /// Timestamp rendered as text, for results grouped on the raw timestamp
    fn timestamp_text(&self, timestamp: Expr) -> Expr {
        Expr::cast(timestamp, self.text_type())
    }

    // -- clauses --------------------------------------------------------------

    fn null_ordering(&self) -> NullOrdering {
        NullOrdering::Keyword
    }

    fn limit_clause(&self, limit: u64) -> String {
        format!("FETCH NEXT {} ROWS ONLY", limit)
    }
}

/// `%text%` with LIKE metacharacters escaped by [`LIKE_ESCAPE`]
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Field name understood by `EXTRACT(field FROM ts)`
pub fn extract_field(part: TimePart) -> &'static str {
    match part {
        TimePart::Year => "YEAR",
        TimePart::Quarter => "QUARTER",
        TimePart::Month => "MONTH",
        TimePart::DayOfYear => "DOY",
        TimePart::Hour => "HOUR",
        TimePart::Minute => "MINUTE",
        TimePart::IsoYear => "ISOYEAR",
        TimePart::IsoWeek => "WEEK",
    }
}

pub(crate) fn timestamp_string(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Dialect selection, made once in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Ansi,
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    Sqlite,
    Presto,
}

impl DialectKind {
    /// Build the dialect; `timestamp_format` only applies to engines storing textual timestamps
    pub fn build(&self, timestamp_format: Option<&str>) -> Box<dyn SqlDialect> {
        match self {
            DialectKind::Ansi => Box::new(AnsiDialect),
            DialectKind::Postgres => Box::new(PostgresDialect),
            DialectKind::MySql => Box::new(MySqlDialect),
            DialectKind::Sqlite => Box::new(SqliteDialect),
            DialectKind::Presto => Box::new(PrestoDialect::new(timestamp_format.map(String::from))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("abc"), "%abc%");
        assert_eq!(contains_pattern("50%_off!"), "%50!%!_off!!%");
    }

    #[test]
    fn test_dialect_kind_from_config() {
        let kind: DialectKind = serde_yaml::from_str("mysql").unwrap();
        assert_eq!(kind, DialectKind::MySql);
        assert_eq!(kind.build(None).name(), "mysql");
        assert_eq!(DialectKind::default().build(None).name(), "ansi");
    }
}

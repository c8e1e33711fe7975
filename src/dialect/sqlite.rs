use chrono::NaiveDateTime;

use crate::error::{Result, SqlBackendError};
use crate::sql::{BinaryOperator, Expr};
use crate::time::TimePart;

use super::{timestamp_string, SqlDialect};

/// SQLite; timestamps are stored as ISO-8601 text and handled through `strftime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    fn strftime(format: &str, timestamp: Expr) -> Expr {
        Expr::function("strftime", vec![Expr::string(format), timestamp])
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    fn integer_type(&self) -> &'static str {
        "INTEGER"
    }

    fn float_type(&self) -> &'static str {
        "REAL"
    }

    fn search_operand(&self, column: Expr) -> Expr {
        Expr::cast(column, self.text_type())
    }

    fn contains(&self, column: Expr, text: &str) -> Expr {
        let position = Expr::function("instr", vec![self.search_operand(column), Expr::string(text)]);
        Expr::binary(position, BinaryOperator::Gt, Expr::int(0))
    }

    // REGEXP is only a hook; stock SQLite defines no function behind it
    fn regex_match(&self, _column: Expr, pattern: &str) -> Result<Expr> {
        Err(SqlBackendError::UnsupportedConstruct(format!(
            "regex filter '{}' has no SQLite translation",
            pattern
        )))
    }

    fn time_part(&self, part: TimePart, timestamp: Expr) -> Expr {
        let format = match part {
            TimePart::Year => "%Y",
            TimePart::Month => "%m",
            TimePart::DayOfYear => "%j",
            TimePart::Hour => "%H",
            TimePart::Minute => "%M",
            TimePart::IsoYear => "%G",
            TimePart::IsoWeek => "%V",
            TimePart::Quarter => {
                let month = Expr::cast(Self::strftime("%m", timestamp), self.integer_type());
                let shifted = Expr::Add(Box::new(month), Box::new(Expr::int(2)));
                return Expr::Divide(Box::new(shifted), Box::new(Expr::int(3)));
            }
        };
        Expr::cast(Self::strftime(format, timestamp), self.integer_type())
    }

    fn timestamp_literal(&self, ts: NaiveDateTime) -> Expr {
        Expr::string(timestamp_string(ts))
    }

    fn limit_clause(&self, limit: u64) -> String {
        format!("LIMIT {}", limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::SqlEmitter;
    use chrono::NaiveDate;

    #[test]
    fn test_sqlite_overrides() {
        let d = SqliteDialect;
        let emitter = SqlEmitter::new(&d);
        assert_eq!(
            emitter.emit_expr(&d.contains(Expr::column("city"), "an")),
            "instr(CAST(\"city\" AS TEXT), 'an') > 0"
        );
        assert_eq!(
            emitter.emit_expr(&d.time_part(TimePart::Quarter, Expr::column("ts"))),
            "((CAST(strftime('%m', \"ts\") AS INTEGER) + 2) / 3)"
        );
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(emitter.emit_expr(&d.timestamp_literal(ts)), "'2024-01-02 03:04:05'");
    }

    #[test]
    fn test_sqlite_rejects_regex() {
        let err = SqliteDialect.regex_match(Expr::column("city"), "^Sea").unwrap_err();
        assert!(matches!(err, SqlBackendError::UnsupportedConstruct(_)));
    }
}

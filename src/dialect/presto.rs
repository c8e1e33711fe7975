use crate::error::Result;
use crate::sql::Expr;
use crate::time::TimePart;

use super::SqlDialect;

/// Presto / Trino
#[derive(Debug, Clone, Default)]
pub struct PrestoDialect {
    /// `date_parse` format for timestamp columns stored as text
    timestamp_format: Option<String>,
}

impl PrestoDialect {
    pub fn new(timestamp_format: Option<String>) -> Self {
        Self { timestamp_format }
    }
}

impl SqlDialect for PrestoDialect {
    fn name(&self) -> &'static str {
        "presto"
    }

    // Comparisons are strictly typed
    fn equality_operand(&self, column: Expr) -> Expr {
        Expr::cast(column, self.text_type())
    }

    fn search_operand(&self, column: Expr) -> Expr {
        Expr::cast(column, self.text_type())
    }

    fn regex_match(&self, column: Expr, pattern: &str) -> Result<Expr> {
        Ok(Expr::function("regexp_like", vec![self.search_operand(column), Expr::string(pattern)]))
    }

    fn timestamp_column(&self, column: Expr) -> Expr {
        match &self.timestamp_format {
            Some(format) => Expr::function("date_parse", vec![column, Expr::string(format.as_str())]),
            None => column,
        }
    }

    fn time_part(&self, part: TimePart, timestamp: Expr) -> Expr {
        let name = match part {
            TimePart::Year => "year",
            TimePart::Quarter => "quarter",
            TimePart::Month => "month",
            TimePart::DayOfYear => "day_of_year",
            TimePart::Hour => "hour",
            TimePart::Minute => "minute",
            TimePart::IsoYear => "year_of_week",
            TimePart::IsoWeek => "week",
        };
        Expr::function(name, vec![timestamp])
    }

    fn limit_clause(&self, limit: u64) -> String {
        format!("LIMIT {}", limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::SqlEmitter;

    #[test]
    fn test_presto_parses_text_timestamps() {
        let d = PrestoDialect::new(Some("%Y%m%d%H".to_string()));
        let emitter = SqlEmitter::new(&d);
        let ts = d.timestamp_column(Expr::column("dt"));
        assert_eq!(emitter.emit_expr(&ts), "date_parse(\"dt\", '%Y%m%d%H')");
        assert_eq!(
            emitter.emit_expr(&d.time_part(TimePart::Hour, ts)),
            "hour(date_parse(\"dt\", '%Y%m%d%H'))"
        );
        assert_eq!(
            emitter.emit_expr(&d.equals(Expr::column("id"), "7")),
            "CAST(\"id\" AS VARCHAR) = '7'"
        );
    }

    #[test]
    fn test_presto_without_format_keeps_column() {
        let d = PrestoDialect::default();
        assert_eq!(d.timestamp_column(Expr::column("ts")), Expr::column("ts"));
    }
}

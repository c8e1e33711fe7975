use chrono::NaiveDateTime;

use crate::error::Result;
use crate::sql::{BinaryOperator, Expr};
use crate::time::TimePart;

use super::{timestamp_string, NullOrdering, SqlDialect};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    // backslash is an escape character inside MySQL string literals
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn text_type(&self) -> &'static str {
        "CHAR"
    }

    fn integer_type(&self) -> &'static str {
        "SIGNED"
    }

    fn regex_match(&self, column: Expr, pattern: &str) -> Result<Expr> {
        Ok(Expr::binary(self.search_operand(column), BinaryOperator::Regexp, Expr::string(pattern)))
    }

    // SUM yields DECIMAL
    fn aggregate_projection(&self, call: Expr, floating_point: bool) -> Expr {
        let type_name = if floating_point { self.float_type() } else { self.integer_type() };
        Expr::cast(call, type_name)
    }

    fn time_part(&self, part: TimePart, timestamp: Expr) -> Expr {
        let call = |name: &str, ts: Expr| Expr::function(name, vec![ts]);
        match part {
            TimePart::Year => call("YEAR", timestamp),
            TimePart::Quarter => call("QUARTER", timestamp),
            TimePart::Month => call("MONTH", timestamp),
            TimePart::DayOfYear => call("DAYOFYEAR", timestamp),
            TimePart::Hour => call("HOUR", timestamp),
            TimePart::Minute => call("MINUTE", timestamp),
            TimePart::IsoWeek => Expr::function("WEEK", vec![timestamp, Expr::int(3)]),
            TimePart::IsoYear => {
                let year_week = Expr::function("YEARWEEK", vec![timestamp, Expr::int(3)]);
                let year = Expr::Divide(Box::new(year_week), Box::new(Expr::int(100)));
                Expr::cast(call("FLOOR", year), self.integer_type())
            }
        }
    }

    fn timestamp_literal(&self, ts: NaiveDateTime) -> Expr {
        Expr::string(timestamp_string(ts))
    }

    fn null_ordering(&self) -> NullOrdering {
        NullOrdering::Emulated
    }

    fn limit_clause(&self, limit: u64) -> String {
        format!("LIMIT {}", limit)
    }
}

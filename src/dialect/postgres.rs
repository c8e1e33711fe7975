use crate::error::Result;
use crate::sql::{BinaryOperator, Expr};
use crate::time::TimePart;

use super::{extract_field, SqlDialect};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    fn float_type(&self) -> &'static str {
        "DOUBLE PRECISION"
    }

    fn search_operand(&self, column: Expr) -> Expr {
        Expr::cast(column, self.text_type())
    }

    fn regex_match(&self, column: Expr, pattern: &str) -> Result<Expr> {
        Ok(Expr::binary(self.search_operand(column), BinaryOperator::RegexMatch, Expr::string(pattern)))
    }

    // SUM over integers yields NUMERIC
    fn aggregate_projection(&self, call: Expr, floating_point: bool) -> Expr {
        let type_name = if floating_point { self.float_type() } else { self.integer_type() };
        Expr::cast(call, type_name)
    }

    // EXTRACT yields NUMERIC
    fn time_part(&self, part: TimePart, timestamp: Expr) -> Expr {
        let extract = Expr::Extract {
            field: extract_field(part).to_string(),
            expr: Box::new(timestamp),
        };
        Expr::cast(extract, "INTEGER")
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
    fn test_postgres_overrides() {
        let d = PostgresDialect;
        let emitter = SqlEmitter::new(&d);
        assert_eq!(
            emitter.emit_expr(&d.regex_match(Expr::column("city"), "^S").unwrap()),
            "CAST(\"city\" AS TEXT) ~ '^S'"
        );
        assert_eq!(
            emitter.emit_expr(&d.time_part(TimePart::IsoYear, Expr::column("ts"))),
            "CAST(EXTRACT(ISOYEAR FROM \"ts\") AS INTEGER)"
        );
        assert_eq!(d.limit_clause(3), "LIMIT 3");
    }
}

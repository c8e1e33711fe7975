//! Having tree → HAVING predicate

use crate::error::{Result, SqlBackendError};
use crate::query::{ClauseOperator, ComparisonOp, Having};
use crate::sql::{AggregateExpr, BinaryOperator, Expr};

/// Compiles having trees against the statement's aggregate projections
///
/// Leaves compile to the aggregate call itself rather than its output alias,
/// since not every engine resolves SELECT aliases inside HAVING.
pub struct HavingEvaluator<'a> {
    aggregates: &'a [AggregateExpr],
}

impl<'a> HavingEvaluator<'a> {
    pub fn new(aggregates: &'a [AggregateExpr]) -> Self {
        Self { aggregates }
    }

    pub fn compile(&self, having: &Having) -> Result<Expr> {
        match having {
            Having::NumericComparison { aggregation, op, value } => {
                let aggregate = self
                    .aggregates
                    .iter()
                    .find(|a| a.alias == *aggregation)
                    .ok_or_else(|| {
                        SqlBackendError::UnknownField(format!("having references unknown aggregation '{}'", aggregation))
                    })?;
                let op = match op {
                    ComparisonOp::Eq => BinaryOperator::Eq,
                    ComparisonOp::Lt => BinaryOperator::Lt,
                    ComparisonOp::Gt => BinaryOperator::Gt,
                };
                Ok(Expr::binary(aggregate.call(), op, Expr::float(*value)))
            }
            Having::And(clauses) => Ok(Expr::And(self.compile_all("and", clauses)?)),
            Having::Or(clauses) => Ok(Expr::Or(self.compile_all("or", clauses)?)),
            Having::Not(inner) => Ok(Expr::Not(Box::new(self.compile(inner)?))),
            Having::MultiClause { operator, clauses } => match operator {
                ClauseOperator::And => Ok(Expr::And(self.compile_all("multi", clauses)?)),
                ClauseOperator::Or => Ok(Expr::Or(self.compile_all("multi", clauses)?)),
            },
        }
    }

    fn compile_all(&self, operator: &str, clauses: &[Having]) -> Result<Vec<Expr>> {
        if clauses.is_empty() {
            return Err(SqlBackendError::arity(operator, "at least 1", 0));
        }
        clauses.iter().map(|c| self.compile(c)).collect()
    }
}

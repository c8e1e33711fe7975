//! Post-aggregation tree → scalar expression, or direct numeric evaluation

use crate::dialect::SqlDialect;
use crate::error::{Result, SqlBackendError};
use crate::query::{AggregationQuery, ArithmeticOp, Number, PostAggregation};
use crate::sql::{BinaryOperator, Expr};

/// Compiles (SQL mode) or evaluates (direct mode) post-aggregations
///
/// Division by zero yields 0 in both modes. Field accesses name aggregation
/// outputs only, the one value set both modes can see.
pub struct PostAggregationEvaluator<'a> {
    query: &'a AggregationQuery,
}

impl<'a> PostAggregationEvaluator<'a> {
    pub fn new(query: &'a AggregationQuery) -> Self {
        Self { query }
    }

    /// Check names, arities and references without producing anything
    pub fn validate(&self, post_agg: &PostAggregation) -> Result<()> {
        if let Some(name) = post_agg.name() {
            if name.is_empty() {
                return Err(SqlBackendError::InvalidQuery(format!(
                    "{} post-aggregation has an empty name",
                    post_agg.type_name()
                )));
            }
        }
        match post_agg {
            PostAggregation::Constant { .. } => Ok(()),
            PostAggregation::FieldAccess { field_name } => self.check_reference(field_name),
            PostAggregation::Arithmetic { op, fields, .. } => {
                check_arity(*op, fields.len())?;
                fields.iter().try_for_each(|f| self.validate(f))
            }
            PostAggregation::SketchEstimate { field, .. } => self.validate(field),
            PostAggregation::SketchSetOp { .. } => {
                let operand = sketch_operand(post_agg)?;
                self.validate(operand)
            }
        }
    }

    /// Whether results are reported as floating point
    pub fn is_floating(&self, post_agg: &PostAggregation) -> bool {
        match post_agg {
            PostAggregation::Constant { value, .. } => value.is_floating_point(),
            PostAggregation::FieldAccess { field_name } => self
                .query
                .aggregation(field_name)
                .map(|a| a.kind.is_floating_point())
                .unwrap_or(false),
            PostAggregation::Arithmetic { op: ArithmeticOp::Divide, .. } => true,
            PostAggregation::Arithmetic { fields, .. } => fields.iter().any(|f| self.is_floating(f)),
            PostAggregation::SketchEstimate { .. } | PostAggregation::SketchSetOp { .. } => true,
        }
    }

    // -- SQL mode ---------------------------------------------------------------

    /// Scalar expression over the aggregate statement's output columns
    pub fn compile(&self, post_agg: &PostAggregation, dialect: &dyn SqlDialect) -> Result<Expr> {
        match post_agg {
            PostAggregation::Constant { value, .. } => Ok(match value {
                Number::Integer(i) => Expr::int(*i),
                Number::Float(f) => Expr::float(*f),
            }),
            PostAggregation::FieldAccess { field_name } => {
                self.check_reference(field_name)?;
                Ok(Expr::column(field_name.as_str()))
            }
            PostAggregation::Arithmetic { op, fields, .. } => {
                check_arity(*op, fields.len())?;
                let mut operands = fields
                    .iter()
                    .map(|f| self.compile(f, dialect))
                    .collect::<Result<Vec<_>>>()?
                    .into_iter();
                let first = operands
                    .next()
                    .ok_or_else(|| SqlBackendError::arity(op.as_str(), "at least 1", 0))?;
                Ok(match op {
                    ArithmeticOp::Add => operands.fold(first, |acc, e| Expr::Add(Box::new(acc), Box::new(e))),
                    ArithmeticOp::Subtract => operands.fold(first, |acc, e| Expr::Subtract(Box::new(acc), Box::new(e))),
                    ArithmeticOp::Multiply => operands.fold(first, |acc, e| Expr::Multiply(Box::new(acc), Box::new(e))),
                    ArithmeticOp::Divide => {
                        let divisor = operands
                            .next()
                            .ok_or_else(|| SqlBackendError::arity("/", "exactly 2", 1))?;
                        safe_divide(first, divisor, dialect)
                    }
                })
            }
            PostAggregation::SketchEstimate { field, .. } => self.compile(field, dialect),
            PostAggregation::SketchSetOp { .. } => self.compile(sketch_operand(post_agg)?, dialect),
        }
    }

    // -- direct mode ------------------------------------------------------------

    /// Evaluate against one materialized row; `lookup` yields the raw value of
    /// an aggregation (`None` for SQL NULL). Nulls propagate.
    pub fn evaluate<F>(&self, post_agg: &PostAggregation, lookup: &F) -> Result<Option<Number>>
    where
        F: Fn(&str) -> Option<String>,
    {
        match post_agg {
            PostAggregation::Constant { value, .. } => Ok(Some(*value)),
            PostAggregation::FieldAccess { field_name } => match lookup(field_name) {
                None => Ok(None),
                Some(raw) => parse_number(&raw).map(Some).ok_or_else(|| {
                    SqlBackendError::execution(format!("value '{}' of '{}' is not numeric", raw, field_name))
                }),
            },
            PostAggregation::Arithmetic { op, fields, .. } => {
                check_arity(*op, fields.len())?;
                let mut operands = Vec::with_capacity(fields.len());
                for field in fields {
                    operands.push(self.evaluate(field, lookup)?);
                }
                Ok(apply(*op, &operands))
            }
            PostAggregation::SketchEstimate { field, .. } => self.evaluate(field, lookup),
            PostAggregation::SketchSetOp { .. } => self.evaluate(sketch_operand(post_agg)?, lookup),
        }
    }

    fn check_reference(&self, name: &str) -> Result<()> {
        if self.query.aggregation(name).is_some() {
            Ok(())
        } else {
            Err(SqlBackendError::UnknownField(format!(
                "post-aggregation references '{}', which is not an aggregation",
                name
            )))
        }
    }
}

fn check_arity(op: ArithmeticOp, actual: usize) -> Result<()> {
    match op {
        ArithmeticOp::Divide if actual != 2 => Err(SqlBackendError::arity("/", "exactly 2", actual)),
        _ if actual == 0 => Err(SqlBackendError::arity(op.as_str(), "at least 1", 0)),
        _ => Ok(()),
    }
}

/// The single operand a sketch set operation can be routed to
///
/// Exact distinct counts cannot be combined across operands, so only the
/// identity case (one operand) translates.
fn sketch_operand(post_agg: &PostAggregation) -> Result<&PostAggregation> {
    let PostAggregation::SketchSetOp { name, func, fields, size } = post_agg else {
        return Ok(post_agg);
    };
    if *size == Some(0) {
        return Err(SqlBackendError::InvalidQuery(format!(
            "sketch set operation '{}' has a non-positive size",
            name
        )));
    }
    match fields.as_slice() {
        [] => Err(SqlBackendError::arity("thetaSketchSetOp", "at least 1", 0)),
        [single] => Ok(single),
        _ => Err(SqlBackendError::UnsupportedConstruct(format!(
            "sketch set operation {:?} over {} operands in '{}' cannot be computed from exact distinct counts",
            func,
            fields.len(),
            name
        ))),
    }
}

/// `CASE WHEN b = 0 THEN 0 ELSE CAST(a AS <float>) / b END`
fn safe_divide(dividend: Expr, divisor: Expr, dialect: &dyn SqlDialect) -> Expr {
    let quotient = Expr::Divide(
        Box::new(Expr::cast(dividend, dialect.float_type())),
        Box::new(divisor.clone()),
    );
    Expr::Case {
        when_then: vec![(Expr::binary(divisor, BinaryOperator::Eq, Expr::int(0)), Expr::int(0))],
        else_result: Some(Box::new(quotient)),
    }
}

fn apply(op: ArithmeticOp, operands: &[Option<Number>]) -> Option<Number> {
    if op == ArithmeticOp::Divide {
        // A zero divisor wins over a NULL dividend, as in the SQL form
        return match operands {
            [_, Some(divisor)] if divisor.is_zero() => Some(Number::Float(0.0)),
            [Some(dividend), Some(divisor)] => Some(Number::Float(dividend.as_f64() / divisor.as_f64())),
            _ => None,
        };
    }

    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        values.push((*operand)?);
    }
    match op {
        ArithmeticOp::Add => Some(
            values
                .into_iter()
                .fold(Number::Integer(0), |acc, v| acc.combine(v, i64::checked_add, |a, b| a + b)),
        ),
        ArithmeticOp::Multiply => Some(
            values
                .into_iter()
                .fold(Number::Integer(1), |acc, v| acc.combine(v, i64::checked_mul, |a, b| a * b)),
        ),
        ArithmeticOp::Subtract => {
            let mut rest = values.into_iter();
            let first = rest.next()?;
            Some(rest.fold(first, |acc, v| acc.combine(v, i64::checked_sub, |a, b| a - b)))
        }
        ArithmeticOp::Divide => None,
    }
}

/// Parse a raw driver value, keeping integers exact
pub fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Number::Integer(i));
    }
    raw.parse::<f64>().ok().map(Number::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::dialect::{AnsiDialect, PostgresDialect};
    use crate::emitter::SqlEmitter;
    use crate::error::ErrorKind;
    use crate::query::{Aggregation, AggregationKind, SetOperation};

    fn query() -> AggregationQuery {
        AggregationQuery {
            aggregations: vec![
                Aggregation::new(AggregationKind::LongSum, "clicks", "clicks"),
                Aggregation::new(AggregationKind::LongSum, "impressions", "impressions"),
                Aggregation::new(AggregationKind::DoubleSum, "revenue", "revenue"),
            ],
            ..Default::default()
        }
    }

    fn ratio(name: &str, dividend: &str, divisor: &str) -> PostAggregation {
        PostAggregation::arithmetic(
            name,
            ArithmeticOp::Divide,
            vec![PostAggregation::field(dividend), PostAggregation::field(divisor)],
        )
    }

    fn eval(post_agg: &PostAggregation, row: &[(&str, &str)]) -> Result<Option<Number>> {
        let q = query();
        let values: HashMap<String, String> = row.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let lookup = |name: &str| values.get(name).cloned();
        PostAggregationEvaluator::new(&q).evaluate(post_agg, &lookup)
    }

    fn compile_sql(post_agg: &PostAggregation) -> Result<String> {
        let q = query();
        let expr = PostAggregationEvaluator::new(&q).compile(post_agg, &AnsiDialect)?;
        Ok(SqlEmitter::new(&AnsiDialect).emit_expr(&expr))
    }

    // -- unit: direct evaluation ------------------------------------------------

    #[test]
    fn test_divide_by_zero_is_zero() {
        let pct = ratio("pct", "clicks", "impressions");
        let value = eval(&pct, &[("clicks", "7"), ("impressions", "0")]).unwrap();
        assert_eq!(value, Some(Number::Float(0.0)));
    }

    #[test]
    fn test_divide() {
        let pct = ratio("pct", "clicks", "impressions");
        let value = eval(&pct, &[("clicks", "1"), ("impressions", "4")]).unwrap();
        assert_eq!(value, Some(Number::Float(0.25)));
    }

    #[test]
    fn test_integer_arithmetic_stays_exact() {
        let sum = PostAggregation::arithmetic(
            "sum",
            ArithmeticOp::Add,
            vec![
                PostAggregation::field("clicks"),
                PostAggregation::field("impressions"),
                PostAggregation::constant("one", Number::Integer(1)),
            ],
        );
        assert_eq!(
            eval(&sum, &[("clicks", "2"), ("impressions", "3")]).unwrap(),
            Some(Number::Integer(6))
        );

        let diff = PostAggregation::arithmetic(
            "diff",
            ArithmeticOp::Subtract,
            vec![
                PostAggregation::field("impressions"),
                PostAggregation::field("clicks"),
                PostAggregation::constant("two", Number::Integer(2)),
            ],
        );
        assert_eq!(
            eval(&diff, &[("clicks", "2"), ("impressions", "10")]).unwrap(),
            Some(Number::Integer(6))
        );
    }

    #[test]
    fn test_float_operand_promotes() {
        let scaled = PostAggregation::arithmetic(
            "scaled",
            ArithmeticOp::Multiply,
            vec![
                PostAggregation::field("clicks"),
                PostAggregation::constant("half", Number::Float(0.5)),
            ],
        );
        assert_eq!(eval(&scaled, &[("clicks", "3")]).unwrap(), Some(Number::Float(1.5)));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        let big = PostAggregation::arithmetic(
            "big",
            ArithmeticOp::Multiply,
            vec![PostAggregation::field("clicks"), PostAggregation::field("impressions")],
        );
        let value = eval(&big, &[("clicks", "9223372036854775807"), ("impressions", "2")]).unwrap();
        assert!(matches!(value, Some(Number::Float(_))));
    }

    #[test]
    fn test_null_propagates() {
        let sum = PostAggregation::arithmetic(
            "sum",
            ArithmeticOp::Add,
            vec![PostAggregation::field("clicks"), PostAggregation::field("impressions")],
        );
        assert_eq!(eval(&sum, &[("clicks", "2")]).unwrap(), None);
        // zero divisor still wins
        let pct = ratio("pct", "clicks", "impressions");
        assert_eq!(eval(&pct, &[("impressions", "0")]).unwrap(), Some(Number::Float(0.0)));
    }

    #[test]
    fn test_non_numeric_value() {
        let pct = ratio("pct", "clicks", "impressions");
        let err = eval(&pct, &[("clicks", "abc"), ("impressions", "2")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    }

    // -- unit: SQL compilation ------------------------------------------------

    #[test]
    fn test_compile_divide_guards_zero() {
        assert_eq!(
            compile_sql(&ratio("pct", "clicks", "impressions")).unwrap(),
            "CASE WHEN \"impressions\" = 0 THEN 0 ELSE (CAST(\"clicks\" AS DOUBLE) / \"impressions\") END"
        );
    }

    #[test]
    fn test_compile_uses_dialect_float_type() {
        let q = query();
        let expr = PostAggregationEvaluator::new(&q)
            .compile(&ratio("pct", "clicks", "impressions"), &PostgresDialect)
            .unwrap();
        let sql = SqlEmitter::new(&PostgresDialect).emit_expr(&expr);
        assert!(sql.contains("CAST(\"clicks\" AS DOUBLE PRECISION)"), "{}", sql);
    }

    #[test]
    fn test_compile_folds_left() {
        let post_agg = PostAggregation::arithmetic(
            "net",
            ArithmeticOp::Subtract,
            vec![
                PostAggregation::field("revenue"),
                PostAggregation::field("clicks"),
                PostAggregation::constant("fee", Number::Float(1.5)),
            ],
        );
        assert_eq!(
            compile_sql(&post_agg).unwrap(),
            "((\"revenue\" - \"clicks\") - 1.5)"
        );
    }

    #[test]
    fn test_field_access_to_dimension_is_unknown() {
        let mut q = query();
        q.dimensions.push("region".into());
        let evaluator = PostAggregationEvaluator::new(&q);
        for name in ["region", "region_cd"] {
            let access = PostAggregation::field(name);
            assert_eq!(evaluator.validate(&access).unwrap_err().kind(), ErrorKind::UnknownField);
            assert_eq!(
                evaluator.compile(&access, &AnsiDialect).unwrap_err().kind(),
                ErrorKind::UnknownField
            );
        }
        assert_eq!(
            evaluator.compile(&PostAggregation::field("clicks"), &AnsiDialect).unwrap(),
            Expr::column("clicks")
        );
    }

    // -- unit: validation and typing ------------------------------------------

    #[test]
    fn test_divide_arity() {
        let bad = PostAggregation::arithmetic("bad", ArithmeticOp::Divide, vec![PostAggregation::field("clicks")]);
        assert_eq!(compile_sql(&bad).unwrap_err().kind(), ErrorKind::InvalidArity);
        assert_eq!(eval(&bad, &[("clicks", "1")]).unwrap_err().kind(), ErrorKind::InvalidArity);

        let empty = PostAggregation::arithmetic("empty", ArithmeticOp::Add, vec![]);
        assert_eq!(compile_sql(&empty).unwrap_err().kind(), ErrorKind::InvalidArity);
    }

    #[test]
    fn test_unknown_field() {
        let err = compile_sql(&ratio("pct", "clicks", "nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let q = query();
        let evaluator = PostAggregationEvaluator::new(&q);
        let nested = PostAggregation::arithmetic(
            "outer",
            ArithmeticOp::Add,
            vec![PostAggregation::constant("", Number::Integer(1))],
        );
        assert_eq!(evaluator.validate(&nested).unwrap_err().kind(), ErrorKind::InvalidQuery);
        assert!(evaluator.validate(&ratio("pct", "clicks", "impressions")).is_ok());
    }

    #[test]
    fn test_is_floating() {
        let q = query();
        let evaluator = PostAggregationEvaluator::new(&q);

        assert!(evaluator.is_floating(&ratio("pct", "clicks", "impressions")));
        let ints = PostAggregation::arithmetic(
            "sum",
            ArithmeticOp::Add,
            vec![PostAggregation::field("clicks"), PostAggregation::field("impressions")],
        );
        assert!(!evaluator.is_floating(&ints));
        let mixed = PostAggregation::arithmetic(
            "mixed",
            ArithmeticOp::Add,
            vec![PostAggregation::field("clicks"), PostAggregation::field("revenue")],
        );
        assert!(evaluator.is_floating(&mixed));
    }

    #[test]
    fn test_sketch_routing() {
        let estimate = PostAggregation::SketchEstimate {
            name: "users".into(),
            field: Box::new(PostAggregation::SketchSetOp {
                name: "only".into(),
                func: SetOperation::Union,
                fields: vec![PostAggregation::field("clicks")],
                size: Some(16384),
            }),
        };
        assert_eq!(compile_sql(&estimate).unwrap(), "\"clicks\"");
        assert_eq!(eval(&estimate, &[("clicks", "12")]).unwrap(), Some(Number::Integer(12)));

        let multi = PostAggregation::SketchSetOp {
            name: "both".into(),
            func: SetOperation::Intersect,
            fields: vec![PostAggregation::field("clicks"), PostAggregation::field("impressions")],
            size: None,
        };
        assert_eq!(compile_sql(&multi).unwrap_err().kind(), ErrorKind::UnsupportedConstruct);

        let none = PostAggregation::SketchSetOp {
            name: "none".into(),
            func: SetOperation::Union,
            fields: vec![],
            size: None,
        };
        assert_eq!(compile_sql(&none).unwrap_err().kind(), ErrorKind::InvalidArity);

        let zero = PostAggregation::SketchSetOp {
            name: "zero".into(),
            func: SetOperation::Union,
            fields: vec![PostAggregation::field("clicks")],
            size: Some(0),
        };
        assert_eq!(compile_sql(&zero).unwrap_err().kind(), ErrorKind::InvalidQuery);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(Number::Integer(42)));
        assert_eq!(parse_number(" 2.5 "), Some(Number::Float(2.5)));
        assert_eq!(parse_number("x"), None);
    }
}

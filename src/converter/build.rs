//! Statement building logic

use std::collections::HashSet;

use tracing::debug;

use crate::dialect::SqlDialect;
use crate::emitter::emit_sql;
use crate::error::{Result, SqlBackendError};
use crate::evaluator::{FilterEvaluator, HavingEvaluator, PostAggregationEvaluator};
use crate::mapper::FieldMapper;
use crate::query::{
    Aggregation, AggregationKind, AggregationQuery, Granularity, Interval, QueryType, SortDirection,
};
use crate::schema::TableSchema;
use crate::sql::{
    AggregateExpr, AggregateFunction, BinaryOperator, Expr, Projection, Relation, SelectStatement, SortKey,
};
use crate::time::SqlTimeConverter;

use super::{CompiledQuery, PostAggregationMode};

/// Alias of the aggregate statement when post-aggregations wrap it
pub const AGGREGATE_ALIAS: &str = "agg";

/// Output name of the raw timestamp for granularity `none`
pub const RAW_TIMESTAMP_ALIAS: &str = "__time";

/// Builds SQL statements for one dialect
///
/// Compilation is pure: no I/O and no state shared between calls.
#[derive(Debug)]
pub struct SqlConverter {
    dialect: Box<dyn SqlDialect>,
    post_aggregation_mode: PostAggregationMode,
}

impl SqlConverter {
    pub fn new(dialect: Box<dyn SqlDialect>, post_aggregation_mode: PostAggregationMode) -> Self {
        Self {
            dialect,
            post_aggregation_mode,
        }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn post_aggregation_mode(&self) -> PostAggregationMode {
        self.post_aggregation_mode
    }

    /// Build the statement and render it
    pub fn compile(&self, query: &AggregationQuery, table: &TableSchema, mapper: &FieldMapper) -> Result<CompiledQuery> {
        let statement = self.build_statement(query, table, mapper)?;
        let sql = emit_sql(&statement, self.dialect())?;
        debug!(dialect = self.dialect.name(), table = %table.name, sql = %sql, "compiled aggregation query");
        Ok(CompiledQuery {
            statement,
            sql,
            time_converter: SqlTimeConverter::new(query.granularity, &query.intervals),
            post_aggregation_mode: self.post_aggregation_mode,
        })
    }

    pub fn build_statement(
        &self,
        query: &AggregationQuery,
        table: &TableSchema,
        mapper: &FieldMapper,
    ) -> Result<SelectStatement> {
        let time_converter = SqlTimeConverter::new(query.granularity, &query.intervals);
        validate_query(query, mapper, &time_converter)?;
        let dialect = self.dialect();
        let post_aggregations = PostAggregationEvaluator::new(query);
        for post_agg in &query.post_aggregations {
            post_aggregations.validate(post_agg)?;
        }

        // Source relation
        let relation = table.relation_parts().into_iter().map(String::from).collect();
        let mut stmt = SelectStatement::new(Relation::Table(relation));

        // Time keys project first, each under its alias
        let timestamp = dialect.timestamp_column(Expr::column(table.timestamp_column.as_str()));
        let mut time_keys: Vec<(Expr, &str)> = Vec::new();
        if time_converter.groups_by_raw_timestamp() {
            stmt.projections.push(Projection::aliased(
                dialect.timestamp_text(timestamp.clone()),
                RAW_TIMESTAMP_ALIAS,
            ));
            time_keys.push((timestamp.clone(), RAW_TIMESTAMP_ALIAS));
        } else {
            for part in time_converter.time_parts() {
                let expr = dialect.time_part(*part, timestamp.clone());
                stmt.projections.push(Projection::aliased(expr.clone(), part.alias()));
                time_keys.push((expr, part.alias()));
            }
        }

        // Dimensions, one projection per physical column
        let mut dimension_columns: Vec<&str> = Vec::new();
        for dimension in query.grouping_dimensions() {
            let physical = mapper.to_physical(dimension);
            if !dimension_columns.contains(&physical) {
                dimension_columns.push(physical);
            }
        }
        for column in &dimension_columns {
            stmt.projections.push(Projection::bare(Expr::column(*column)));
            stmt.group_by.push(Expr::column(*column));
        }
        stmt.group_by.extend(time_keys.iter().map(|(expr, _)| expr.clone()));

        // Aggregations
        let aggregates = query
            .aggregations
            .iter()
            .map(|agg| aggregate_expr(agg, mapper))
            .collect::<Result<Vec<_>>>()?;
        for (agg, aggregate) in query.aggregations.iter().zip(&aggregates) {
            let projected = dialect.aggregate_projection(aggregate.call(), agg.kind.is_floating_point());
            stmt.projections.push(Projection::aliased(projected, aggregate.alias.as_str()));
        }

        // Filter, ANDed with the interval predicate
        let mut predicates = Vec::new();
        if let Some(filter) = &query.filter {
            predicates.push(FilterEvaluator::new(dialect, mapper, query).compile(filter)?);
        }
        if let Some(intervals) = interval_predicate(dialect, &timestamp, &query.intervals) {
            predicates.push(intervals);
        }
        stmt.filter = match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Expr::And(predicates)),
        };

        if let Some(having) = &query.having {
            stmt.having = Some(HavingEvaluator::new(&aggregates).compile(having)?);
        }

        stmt.order_by = self.sort_keys(query, mapper, &dimension_columns, &time_keys)?;
        stmt.limit = query.row_limit();

        if self.post_aggregation_mode == PostAggregationMode::Sql && !query.post_aggregations.is_empty() {
            return self.wrap_post_aggregations(stmt, query, &post_aggregations);
        }
        Ok(stmt)
    }

    /// Explicit sort entries first, then every grouping key not already sorted on
    fn sort_keys(
        &self,
        query: &AggregationQuery,
        mapper: &FieldMapper,
        dimension_columns: &[&str],
        time_keys: &[(Expr, &str)],
    ) -> Result<Vec<SortKey>> {
        let mut keys: Vec<SortKey> = Vec::new();
        for column in query.sort_columns() {
            let expr = self.sort_expr(query, mapper, &column.dimension)?;
            if !keys.iter().any(|k| k.expr == expr) {
                keys.push(SortKey::new(expr, column.direction));
            }
        }

        // Time keys are referenced by alias so the order survives wrapping
        let grouping = dimension_columns
            .iter()
            .map(|column| Expr::column(*column))
            .chain(time_keys.iter().map(|(_, alias)| Expr::column(*alias)));
        for expr in grouping {
            if !keys.iter().any(|k| k.expr == expr) {
                keys.push(SortKey::new(expr, SortDirection::Ascending));
            }
        }
        Ok(keys)
    }

    fn sort_expr(&self, query: &AggregationQuery, mapper: &FieldMapper, name: &str) -> Result<Expr> {
        if query.aggregation(name).is_some() {
            return Ok(Expr::column(name));
        }
        if query.post_aggregation(name).is_some() {
            return match self.post_aggregation_mode {
                PostAggregationMode::Sql => Ok(Expr::column(name)),
                PostAggregationMode::Direct => Err(SqlBackendError::UnsupportedConstruct(format!(
                    "cannot sort on post-aggregation '{}' when post-aggregations are computed after execution",
                    name
                ))),
            };
        }
        if query.has_dimension(name) {
            return Ok(Expr::column(mapper.to_physical(name)));
        }
        if mapper.is_mapped(name) {
            return Err(SqlBackendError::InvalidQuery(format!(
                "cannot sort on '{}', which is not grouped",
                name
            )));
        }
        Err(SqlBackendError::UnknownField(format!("sort references unknown field '{}'", name)))
    }

    /// `SELECT agg.*, <post-aggregations> FROM (<aggregate statement>) AS agg ORDER BY ... LIMIT ...`
    fn wrap_post_aggregations(
        &self,
        mut inner: SelectStatement,
        query: &AggregationQuery,
        evaluator: &PostAggregationEvaluator<'_>,
    ) -> Result<SelectStatement> {
        let order_by = std::mem::take(&mut inner.order_by);
        let limit = inner.limit.take();

        let mut outer = SelectStatement::new(Relation::Subquery {
            query: Box::new(inner),
            alias: AGGREGATE_ALIAS.to_string(),
        });
        outer.projections.push(Projection::AllFrom(AGGREGATE_ALIAS.to_string()));
        for post_agg in &query.post_aggregations {
            let name = post_agg.name().unwrap_or_default();
            outer
                .projections
                .push(Projection::aliased(evaluator.compile(post_agg, self.dialect())?, name));
        }
        outer.order_by = order_by;
        outer.limit = limit;
        Ok(outer)
    }
}

/// Shape and output-name checks that do not depend on the table
fn validate_query(query: &AggregationQuery, mapper: &FieldMapper, time_converter: &SqlTimeConverter) -> Result<()> {
    match query.query_type {
        QueryType::TopN => {
            let dimension = query
                .dimension
                .as_deref()
                .ok_or_else(|| SqlBackendError::InvalidQuery("topN query requires a dimension".to_string()))?;
            if query.metric.is_none() {
                return Err(SqlBackendError::InvalidQuery("topN query requires a metric".to_string()));
            }
            if matches!(query.threshold, None | Some(0)) {
                return Err(SqlBackendError::InvalidQuery(
                    "topN query requires a positive threshold".to_string(),
                ));
            }
            if query.dimensions.iter().any(|d| d != dimension) {
                return Err(SqlBackendError::UnsupportedConstruct(
                    "topN groups by exactly one dimension".to_string(),
                ));
            }
            if query.granularity != Granularity::All {
                return Err(SqlBackendError::UnsupportedConstruct(format!(
                    "topN over granularity '{}' needs a per-bucket limit",
                    query.granularity
                )));
            }
        }
        QueryType::Timeseries if !query.dimensions.is_empty() => {
            return Err(SqlBackendError::InvalidQuery(
                "timeseries query cannot group by dimensions".to_string(),
            ));
        }
        _ => {}
    }

    if query.grouping_dimensions().is_empty() && query.aggregations.is_empty() {
        return Err(SqlBackendError::InvalidQuery(
            "query selects no dimensions and no aggregations".to_string(),
        ));
    }

    // Grouping keys share the result row with aggregate outputs
    let mut grouping: HashSet<&str> = HashSet::new();
    for dimension in query.grouping_dimensions() {
        grouping.insert(dimension);
        grouping.insert(mapper.to_physical(dimension));
    }
    if time_converter.groups_by_raw_timestamp() {
        grouping.insert(RAW_TIMESTAMP_ALIAS);
    } else {
        grouping.extend(time_converter.time_parts().iter().map(|part| part.alias()));
    }
    let check_grouping = |name: &str| -> Result<()> {
        if grouping.contains(name) {
            return Err(SqlBackendError::InvalidQuery(format!(
                "output name '{}' collides with a grouping column",
                name
            )));
        }
        Ok(())
    };

    let mut names = HashSet::new();
    for agg in &query.aggregations {
        if agg.name.is_empty() {
            return Err(SqlBackendError::InvalidQuery(format!(
                "{} aggregation has an empty name",
                agg.kind.as_str()
            )));
        }
        if !names.insert(agg.name.as_str()) {
            return Err(SqlBackendError::InvalidQuery(format!("duplicate output name '{}'", agg.name)));
        }
        check_grouping(&agg.name)?;
    }
    for post_agg in &query.post_aggregations {
        let name = post_agg.name().ok_or_else(|| {
            SqlBackendError::InvalidQuery(format!(
                "top-level {} post-aggregation has no output name",
                post_agg.type_name()
            ))
        })?;
        if !name.is_empty() && !names.insert(name) {
            return Err(SqlBackendError::InvalidQuery(format!("duplicate output name '{}'", name)));
        }
        check_grouping(name)?;
    }
    Ok(())
}

fn aggregate_expr(agg: &Aggregation, mapper: &FieldMapper) -> Result<AggregateExpr> {
    let field = || -> Result<Expr> {
        agg.field_name
            .as_deref()
            .map(|name| Expr::column(mapper.to_physical(name)))
            .ok_or_else(|| {
                SqlBackendError::InvalidQuery(format!(
                    "{} aggregation '{}' requires a fieldName",
                    agg.kind.as_str(),
                    agg.name
                ))
            })
    };
    let (func, arg) = match agg.kind {
        AggregationKind::Count => (AggregateFunction::Count, None),
        AggregationKind::LongSum | AggregationKind::DoubleSum => (AggregateFunction::Sum, Some(field()?)),
        AggregationKind::LongMin | AggregationKind::DoubleMin => (AggregateFunction::Min, Some(field()?)),
        AggregationKind::LongMax | AggregationKind::DoubleMax => (AggregateFunction::Max, Some(field()?)),
        AggregationKind::ThetaSketch => (AggregateFunction::CountDistinct, Some(field()?)),
    };
    Ok(AggregateExpr {
        func,
        arg,
        alias: agg.name.clone(),
    })
}

/// `(ts >= start AND ts < end) OR ...`
fn interval_predicate(dialect: &dyn SqlDialect, timestamp: &Expr, intervals: &[Interval]) -> Option<Expr> {
    let mut ranges: Vec<Expr> = intervals
        .iter()
        .map(|interval| {
            Expr::And(vec![
                Expr::binary(
                    timestamp.clone(),
                    BinaryOperator::GtEq,
                    dialect.timestamp_literal(interval.start.naive_utc()),
                ),
                Expr::binary(
                    timestamp.clone(),
                    BinaryOperator::Lt,
                    dialect.timestamp_literal(interval.end.naive_utc()),
                ),
            ])
        })
        .collect();
    match ranges.len() {
        0 => None,
        1 => ranges.pop(),
        _ => Some(Expr::Or(ranges)),
    }
}

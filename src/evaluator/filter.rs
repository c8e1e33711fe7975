//! Filter tree → WHERE predicate

use crate::dialect::SqlDialect;
use crate::error::{Result, SqlBackendError};
use crate::mapper::FieldMapper;
use crate::query::{AggregationQuery, Filter, SearchMode, SearchQuery};
use crate::sql::Expr;

/// Compiles filter trees over raw dimension values
pub struct FilterEvaluator<'a> {
    dialect: &'a dyn SqlDialect,
    mapper: &'a FieldMapper,
    query: &'a AggregationQuery,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, mapper: &'a FieldMapper, query: &'a AggregationQuery) -> Self {
        Self { dialect, mapper, query }
    }

    pub fn compile(&self, filter: &Filter) -> Result<Expr> {
        match filter {
            Filter::Selector { dimension, value } => Ok(self.dialect.equals(self.column(dimension)?, value)),
            Filter::Regex { dimension, pattern } => self.dialect.regex_match(self.column(dimension)?, pattern),
            Filter::Search { dimension, query } => self.compile_search(dimension, query),
            Filter::In { dimension, values } => {
                if values.is_empty() {
                    return Err(SqlBackendError::arity("in", "at least 1", 0));
                }
                let selectors = values
                    .iter()
                    .map(|value| Filter::selector(dimension.as_str(), value.as_str()))
                    .collect();
                self.compile(&Filter::or(selectors))
            }
            Filter::And { fields } => Ok(Expr::And(self.compile_all("and", fields)?)),
            Filter::Or { fields } => Ok(Expr::Or(self.compile_all("or", fields)?)),
            Filter::Not { field } => Ok(Expr::Not(Box::new(self.compile(field)?))),
        }
    }

    fn compile_all(&self, operator: &str, fields: &[Filter]) -> Result<Vec<Expr>> {
        if fields.is_empty() {
            return Err(SqlBackendError::arity(operator, "at least 1", 0));
        }
        fields.iter().map(|f| self.compile(f)).collect()
    }

    fn compile_search(&self, dimension: &str, query: &SearchQuery) -> Result<Expr> {
        let column = self.column(dimension)?;
        let text = query.text();
        match query.mode() {
            SearchMode::Contains => Ok(self.dialect.contains(column, &text)),
            SearchMode::InsensitiveContains => Ok(self.dialect.contains_insensitive(column, &text)),
            SearchMode::Fragment => Err(SqlBackendError::UnsupportedConstruct(format!(
                "search filter on '{}' uses fragment matching, which has no SQL translation",
                dimension
            ))),
        }
    }

    /// Physical column for a filtered dimension
    fn column(&self, dimension: &str) -> Result<Expr> {
        if !self.mapper.is_mapped(dimension) && !self.query.has_dimension(dimension) {
            return Err(SqlBackendError::UnknownField(format!(
                "filter references unknown dimension '{}'",
                dimension
            )));
        }
        Ok(Expr::column(self.mapper.to_physical(dimension)))
    }
}

//! Query converter (verb module)
//!
//! Transforms an AggregationQuery plus a table schema into a SelectStatement
//! and its rendered SQL.

mod build;

use serde::Deserialize;

use crate::sql::SelectStatement;
use crate::time::SqlTimeConverter;

pub use build::{SqlConverter, AGGREGATE_ALIAS, RAW_TIMESTAMP_ALIAS};

/// Where post-aggregations are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostAggregationMode {
    /// Compiled into an outer SELECT around the aggregate statement
    #[default]
    Sql,
    /// Evaluated by the reconciler on materialized rows
    Direct,
}

/// A statement ready to execute, with what the reconciler needs to read it back
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub statement: SelectStatement,
    pub sql: String,
    pub time_converter: SqlTimeConverter,
    pub post_aggregation_mode: PostAggregationMode,
}

use serde::Deserialize;

use super::aggregation::Aggregation;
use super::filter::Filter;
use super::granularity::{Granularity, Interval};
use super::having::Having;
use super::post_aggregation::PostAggregation;

/// Native query type; decides the response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    #[default]
    GroupBy,
    Timeseries,
    #[serde(rename = "topN")]
    TopN,
}

/// Sort direction of an explicit order-by column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One explicit sort entry, naming a dimension, aggregation or post-aggregation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderByColumn {
    pub dimension: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderByColumn {
    pub fn new(dimension: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            dimension: dimension.into(),
            direction,
        }
    }
}

/// Sort and row limit
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct LimitSpec {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub columns: Vec<OrderByColumn>,
}

/// A fully-resolved aggregation query
///
/// Constructed upstream and consumed read-only by the converter and the
/// reconciler. Names are logical (API-facing) names.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationQuery {
    #[serde(default)]
    pub query_type: QueryType,
    /// Logical table name
    pub data_source: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub intervals: Vec<Interval>,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub post_aggregations: Vec<PostAggregation>,
    #[serde(default)]
    pub having: Option<Having>,
    #[serde(default)]
    pub limit_spec: Option<LimitSpec>,
    /// topN: the single grouped dimension
    #[serde(default)]
    pub dimension: Option<String>,
    /// topN: the aggregation ranked on (descending)
    #[serde(default)]
    pub metric: Option<String>,
    /// topN: rows kept per bucket
    #[serde(default)]
    pub threshold: Option<u64>,
}

impl AggregationQuery {
    /// Grouping dimensions in declared order, including the topN dimension
    pub fn grouping_dimensions(&self) -> Vec<&str> {
        let mut dims: Vec<&str> = self.dimensions.iter().map(String::as_str).collect();
        if self.query_type == QueryType::TopN {
            if let Some(dim) = &self.dimension {
                if !dims.contains(&dim.as_str()) {
                    dims.push(dim);
                }
            }
        }
        dims
    }

    /// Explicit sort entries; a topN ranks by its metric, descending
    pub fn sort_columns(&self) -> Vec<OrderByColumn> {
        if self.query_type == QueryType::TopN {
            if let Some(metric) = &self.metric {
                return vec![OrderByColumn::new(metric.clone(), SortDirection::Descending)];
            }
        }
        self.limit_spec
            .as_ref()
            .map(|spec| spec.columns.clone())
            .unwrap_or_default()
    }

    pub fn row_limit(&self) -> Option<u64> {
        if self.query_type == QueryType::TopN {
            return self.threshold;
        }
        self.limit_spec.as_ref().and_then(|spec| spec.limit)
    }

    pub fn aggregation(&self, name: &str) -> Option<&Aggregation> {
        self.aggregations.iter().find(|a| a.name == name)
    }

    pub fn post_aggregation(&self, name: &str) -> Option<&PostAggregation> {
        self.post_aggregations.iter().find(|p| p.name() == Some(name))
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.grouping_dimensions().contains(&name)
    }
}

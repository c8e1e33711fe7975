//! Named aggregations

use serde::Deserialize;

/// Aggregation function as named by the native engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationKind {
    Count,
    LongSum,
    DoubleSum,
    LongMin,
    LongMax,
    DoubleMin,
    DoubleMax,
    /// Distinct-count sketch; the SQL backend computes it exactly
    ThetaSketch,
}

impl AggregationKind {
    /// Whether results of this aggregation are reported as floating point
    pub fn is_floating_point(&self) -> bool {
        matches!(
            self,
            AggregationKind::DoubleSum
                | AggregationKind::DoubleMin
                | AggregationKind::DoubleMax
                | AggregationKind::ThetaSketch
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::LongSum => "longSum",
            AggregationKind::DoubleSum => "doubleSum",
            AggregationKind::LongMin => "longMin",
            AggregationKind::LongMax => "longMax",
            AggregationKind::DoubleMin => "doubleMin",
            AggregationKind::DoubleMax => "doubleMax",
            AggregationKind::ThetaSketch => "thetaSketch",
        }
    }
}

/// A named aggregation: `{"type": "longSum", "name": "total", "fieldName": "amount"}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Aggregation {
    #[serde(rename = "type")]
    pub kind: AggregationKind,
    /// Output name, local to the query
    pub name: String,
    /// Logical field aggregated over. Absent for `count`.
    #[serde(rename = "fieldName", default)]
    pub field_name: Option<String>,
}

impl Aggregation {
    pub fn new(kind: AggregationKind, name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            field_name: Some(field_name.into()),
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self {
            kind: AggregationKind::Count,
            name: name.into(),
            field_name: None,
        }
    }
}

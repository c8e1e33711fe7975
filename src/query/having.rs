//! Having expression tree (filters over aggregated columns)

use serde::Deserialize;

/// Numeric comparison operator of a having leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Lt,
    Gt,
}

/// Connective of a [`Having::MultiClause`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseOperator {
    And,
    Or,
}

/// Having tree; leaves reference aggregation output names, not dimensions
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "HavingSpec")]
pub enum Having {
    NumericComparison {
        aggregation: String,
        op: ComparisonOp,
        value: f64,
    },
    And(Vec<Having>),
    Or(Vec<Having>),
    Not(Box<Having>),
    /// n-ary generalization of `And` / `Or`
    MultiClause {
        operator: ClauseOperator,
        clauses: Vec<Having>,
    },
}

impl Having {
    pub fn compare(aggregation: impl Into<String>, op: ComparisonOp, value: f64) -> Self {
        Having::NumericComparison {
            aggregation: aggregation.into(),
            op,
            value,
        }
    }

    pub fn not(inner: Having) -> Self {
        Having::Not(Box::new(inner))
    }
}

/// Wire shape: `{"type": "greaterThan", "aggregation": "total", "value": 10}`
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum HavingSpec {
    EqualTo { aggregation: String, value: f64 },
    LessThan { aggregation: String, value: f64 },
    GreaterThan { aggregation: String, value: f64 },
    And {
        #[serde(rename = "havingSpecs")]
        having_specs: Vec<Having>,
    },
    Or {
        #[serde(rename = "havingSpecs")]
        having_specs: Vec<Having>,
    },
    Not {
        #[serde(rename = "havingSpec")]
        having_spec: Box<Having>,
    },
    Multi {
        operator: ClauseOperator,
        #[serde(rename = "havingSpecs")]
        having_specs: Vec<Having>,
    },
}

impl From<HavingSpec> for Having {
    fn from(spec: HavingSpec) -> Self {
        match spec {
            HavingSpec::EqualTo { aggregation, value } => Having::compare(aggregation, ComparisonOp::Eq, value),
            HavingSpec::LessThan { aggregation, value } => Having::compare(aggregation, ComparisonOp::Lt, value),
            HavingSpec::GreaterThan { aggregation, value } => Having::compare(aggregation, ComparisonOp::Gt, value),
            HavingSpec::And { having_specs } => Having::And(having_specs),
            HavingSpec::Or { having_specs } => Having::Or(having_specs),
            HavingSpec::Not { having_spec } => Having::Not(having_spec),
            HavingSpec::Multi { operator, having_specs } => Having::MultiClause {
                operator,
                clauses: having_specs,
            },
        }
    }
}

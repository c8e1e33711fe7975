//! Post-aggregation expression tree

use std::fmt;
use serde::Deserialize;

/// Numeric value keeping the integer/floating distinction of the source
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn is_floating_point(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(i) => *i == 0,
            Number::Float(f) => *f == 0.0,
        }
    }

    /// Integer arithmetic when both sides are integral and it does not overflow
    pub fn combine(
        self,
        other: Number,
        checked: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Number {
        if let (Number::Integer(a), Number::Integer(b)) = (self, other) {
            if let Some(result) = checked(a, b) {
                return Number::Integer(result);
            }
        }
        Number::Float(float(self.as_f64(), other.as_f64()))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Arithmetic operator: `"fn": "+" | "-" | "*" | "/"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ArithmeticOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl ArithmeticOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

/// Sketch set operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetOperation {
    Union,
    Intersect,
    Not,
}

/// Post-aggregation tree, evaluated once per output row
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAggregation {
    Constant {
        name: String,
        value: Number,
    },
    /// Reference to an aggregation; has no output name of its own
    FieldAccess {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
    Arithmetic {
        name: String,
        #[serde(rename = "fn")]
        op: ArithmeticOp,
        fields: Vec<PostAggregation>,
    },
    #[serde(rename = "thetaSketchEstimate")]
    SketchEstimate {
        name: String,
        field: Box<PostAggregation>,
    },
    #[serde(rename = "thetaSketchSetOp")]
    SketchSetOp {
        name: String,
        func: SetOperation,
        fields: Vec<PostAggregation>,
        #[serde(default)]
        size: Option<u32>,
    },
}

impl PostAggregation {
    pub fn constant(name: impl Into<String>, value: Number) -> Self {
        PostAggregation::Constant {
            name: name.into(),
            value,
        }
    }

    pub fn field(field_name: impl Into<String>) -> Self {
        PostAggregation::FieldAccess {
            field_name: field_name.into(),
        }
    }

    pub fn arithmetic(name: impl Into<String>, op: ArithmeticOp, fields: Vec<PostAggregation>) -> Self {
        PostAggregation::Arithmetic {
            name: name.into(),
            op,
            fields,
        }
    }

    /// Output name; `None` for field accessors
    pub fn name(&self) -> Option<&str> {
        match self {
            PostAggregation::FieldAccess { .. } => None,
            PostAggregation::Constant { name, .. }
            | PostAggregation::Arithmetic { name, .. }
            | PostAggregation::SketchEstimate { name, .. }
            | PostAggregation::SketchSetOp { name, .. } => Some(name),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PostAggregation::Constant { .. } => "constant",
            PostAggregation::FieldAccess { .. } => "fieldAccess",
            PostAggregation::Arithmetic { .. } => "arithmetic",
            PostAggregation::SketchEstimate { .. } => "thetaSketchEstimate",
            PostAggregation::SketchSetOp { .. } => "thetaSketchSetOp",
        }
    }
}

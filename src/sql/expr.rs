//! Expression types for compiled statements

use chrono::NaiveDateTime;

/// An unqualified column reference
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Scalar and predicate expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(Column),
    /// Literal value
    Literal(Literal),
    /// Binary comparison (e.g., a = b, a > 5, a ~ 'x')
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// `expr LIKE pattern [ESCAPE 'c']`
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<char>,
    },
    /// AND of multiple expressions
    And(Vec<Expr>),
    /// OR of multiple expressions
    Or(Vec<Expr>),
    /// NOT expr
    Not(Box<Expr>),
    /// Addition: a + b
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction: a - b
    Subtract(Box<Expr>, Box<Expr>),
    /// Multiplication: a * b
    Multiply(Box<Expr>, Box<Expr>),
    /// Division: a / b, with whatever semantics the engine gives it
    Divide(Box<Expr>, Box<Expr>),
    /// CAST(expr AS type)
    Cast {
        expr: Box<Expr>,
        type_name: String,
    },
    /// Scalar function call
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// EXTRACT(field FROM expr)
    Extract {
        field: String,
        expr: Box<Expr>,
    },
    /// Aggregate call; `arg` is `None` for COUNT(*)
    Aggregate {
        func: AggregateFunction,
        arg: Option<Box<Expr>>,
    },
    /// CASE WHEN expression
    Case {
        /// List of (condition, result) pairs
        when_then: Vec<(Expr, Expr)>,
        /// Optional ELSE result
        else_result: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(Column::new(name))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal(Literal::Float(value))
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn cast(expr: Expr, type_name: impl Into<String>) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            type_name: type_name.into(),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn lower(expr: Expr) -> Self {
        Expr::function("LOWER", vec![expr])
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    /// Rendered as `TIMESTAMP 'yyyy-MM-dd HH:mm:ss'`
    Timestamp(NaiveDateTime),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Eq,
    Lt,
    Gt,
    GtEq,
    /// `REGEXP` keyword operator (MySQL)
    Regexp,
    /// `~` operator (PostgreSQL)
    RegexMatch,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Regexp => "REGEXP",
            BinaryOperator::RegexMatch => "~",
        }
    }
}

/// SQL aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
}

/// An aggregate expression: func(expr) AS alias
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunction,
    pub arg: Option<Expr>,
    pub alias: String,
}

impl AggregateExpr {
    /// The aggregate call without its alias, for use inside HAVING
    pub fn call(&self) -> Expr {
        Expr::Aggregate {
            func: self.func,
            arg: self.arg.clone().map(Box::new),
        }
    }
}

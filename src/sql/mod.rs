//! Relational expression and statement trees (noun module)
//!
//! Built by the evaluators and the converter, rendered to text by the emitter.

mod expr;
mod statement;

pub use expr::{AggregateExpr, AggregateFunction, BinaryOperator, Column, Expr, Literal};
pub use statement::{Projection, Relation, SelectStatement, SortKey};

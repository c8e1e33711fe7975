//! Statement tree

use crate::query::SortDirection;
use super::expr::Expr;

/// A single SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub projections: Vec<Projection>,
    pub from: Relation,
    /// WHERE predicate
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<SortKey>,
    pub limit: Option<u64>,
}

impl SelectStatement {
    pub fn new(from: Relation) -> Self {
        Self {
            projections: Vec::new(),
            from,
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Output column names in projection order (`None` for `alias.*`)
    pub fn output_names(&self) -> Vec<Option<&str>> {
        self.projections
            .iter()
            .map(|p| match p {
                Projection::Expr { alias: Some(alias), .. } => Some(alias.as_str()),
                Projection::Expr { expr: Expr::Column(col), alias: None } => Some(col.name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// An item of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Expr { expr: Expr, alias: Option<String> },
    /// `alias.*`
    AllFrom(String),
}

impl Projection {
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Projection::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn bare(expr: Expr) -> Self {
        Projection::Expr { expr, alias: None }
    }
}

/// FROM clause source
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Physical table, split into qualifying parts (`schema`, `table`)
    Table(Vec<String>),
    /// Derived table
    Subquery {
        query: Box<SelectStatement>,
        alias: String,
    },
}

/// A sort key with direction and null placement
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub direction: SortDirection,
    pub nulls_first: bool,
}

impl SortKey {
    pub fn new(expr: Expr, direction: SortDirection) -> Self {
        Self {
            expr,
            direction,
            nulls_first: true,
        }
    }
}

//! SQL emitter
//!
//! Transforms a SelectStatement tree into a pretty-printed SQL string. Every
//! engine-specific decision is delegated to the dialect.

use crate::dialect::{NullOrdering, SqlDialect};
use crate::error::{Result, SqlBackendError};
use crate::query::SortDirection;
use crate::sql::{
    AggregateFunction, Column, Expr, Literal, Projection, Relation, SelectStatement, SortKey,
};

/// Emit a pretty-printed SQL string for `statement`
pub fn emit_sql(statement: &SelectStatement, dialect: &dyn SqlDialect) -> Result<String> {
    SqlEmitter::new(dialect).emit_statement(statement)
}

/// Renders statements and expressions for one dialect
#[derive(Debug, Clone, Copy)]
pub struct SqlEmitter<'a> {
    dialect: &'a dyn SqlDialect,
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

impl<'a> SqlEmitter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn emit_statement(&self, statement: &SelectStatement) -> Result<String> {
        self.emit_select(statement, 0)
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn emit_select(&self, stmt: &SelectStatement, indent: usize) -> Result<String> {
        if stmt.projections.is_empty() {
            return Err(SqlBackendError::InvalidQuery(
                "statement projects no columns".to_string(),
            ));
        }
        let p = pad(indent);

        let items: Vec<String> = stmt.projections.iter().map(|proj| self.emit_projection(proj)).collect();
        let mut sql = format!("{p}SELECT {}\n{p}FROM {}", items.join(", "), self.emit_relation(&stmt.from, indent)?);

        if let Some(filter) = &stmt.filter {
            sql.push_str(&format!("\n{p}WHERE {}", self.emit_expr(filter)));
        }
        if !stmt.group_by.is_empty() {
            let keys: Vec<String> = stmt.group_by.iter().map(|e| self.emit_expr(e)).collect();
            sql.push_str(&format!("\n{p}GROUP BY {}", keys.join(", ")));
        }
        if let Some(having) = &stmt.having {
            sql.push_str(&format!("\n{p}HAVING {}", self.emit_expr(having)));
        }
        if !stmt.order_by.is_empty() {
            let keys: Vec<String> = stmt.order_by.iter().map(|k| self.emit_sort_key(k)).collect();
            sql.push_str(&format!("\n{p}ORDER BY {}", keys.join(", ")));
        }
        if let Some(limit) = stmt.limit {
            sql.push_str(&format!("\n{p}{}", self.dialect.limit_clause(limit)));
        }
        Ok(sql)
    }

    fn emit_projection(&self, projection: &Projection) -> String {
        match projection {
            Projection::Expr { expr, alias: Some(alias) } => {
                format!("{} AS {}", self.emit_expr(expr), self.dialect.quote_identifier(alias))
            }
            Projection::Expr { expr, alias: None } => self.emit_expr(expr),
            Projection::AllFrom(alias) => format!("{}.*", self.dialect.quote_identifier(alias)),
        }
    }

    fn emit_relation(&self, relation: &Relation, indent: usize) -> Result<String> {
        match relation {
            Relation::Table(parts) => {
                let quoted: Vec<String> = parts.iter().map(|part| self.dialect.quote_identifier(part)).collect();
                Ok(quoted.join("."))
            }
            Relation::Subquery { query, alias } => {
                let inner = self.emit_select(query, indent + 1)?;
                Ok(format!(
                    "(\n{inner}\n{p}) AS {alias}",
                    p = pad(indent),
                    alias = self.dialect.quote_identifier(alias),
                ))
            }
        }
    }

    fn emit_sort_key(&self, key: &SortKey) -> String {
        let expr = self.emit_expr(&key.expr);
        let dir = match key.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        match self.dialect.null_ordering() {
            NullOrdering::Keyword => {
                let nulls = if key.nulls_first { "NULLS FIRST" } else { "NULLS LAST" };
                format!("{expr} {dir} {nulls}")
            }
            NullOrdering::Emulated => {
                let null_dir = if key.nulls_first { "DESC" } else { "ASC" };
                format!("{expr} IS NULL {null_dir}, {expr} {dir}")
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn emit_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Column(col) => self.emit_column(col),
            Expr::Literal(lit) => self.emit_literal(lit),
            Expr::BinaryOp { left, op, right } => {
                format!("{} {} {}", self.emit_expr(left), op.as_str(), self.emit_expr(right))
            }
            Expr::Like { expr, pattern, escape } => {
                let mut sql = format!("{} LIKE {}", self.emit_expr(expr), self.emit_expr(pattern));
                if let Some(c) = escape {
                    sql.push_str(&format!(" ESCAPE {}", self.dialect.quote_string(&c.to_string())));
                }
                sql
            }
            Expr::And(exprs) => self.emit_junction(exprs, " AND ", "TRUE"),
            Expr::Or(exprs) => self.emit_junction(exprs, " OR ", "FALSE"),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::And(_) | Expr::Or(_) => format!("NOT {}", self.emit_expr(inner)),
                _ => format!("NOT ({})", self.emit_expr(inner)),
            },
            Expr::Add(a, b) => format!("({} + {})", self.emit_expr(a), self.emit_expr(b)),
            Expr::Subtract(a, b) => format!("({} - {})", self.emit_expr(a), self.emit_expr(b)),
            Expr::Multiply(a, b) => format!("({} * {})", self.emit_expr(a), self.emit_expr(b)),
            Expr::Divide(a, b) => format!("({} / {})", self.emit_expr(a), self.emit_expr(b)),
            Expr::Cast { expr, type_name } => format!("CAST({} AS {})", self.emit_expr(expr), type_name),
            Expr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(|a| self.emit_expr(a)).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Extract { field, expr } => format!("EXTRACT({} FROM {})", field, self.emit_expr(expr)),
            Expr::Aggregate { func, arg } => {
                let inner = match arg {
                    Some(arg) => self.emit_expr(arg),
                    None => "*".to_string(),
                };
                match func {
                    AggregateFunction::Sum => format!("SUM({})", inner),
                    AggregateFunction::Min => format!("MIN({})", inner),
                    AggregateFunction::Max => format!("MAX({})", inner),
                    AggregateFunction::Count => format!("COUNT({})", inner),
                    AggregateFunction::CountDistinct => format!("COUNT(DISTINCT {})", inner),
                }
            }
            Expr::Case { when_then, else_result } => {
                let mut sql = String::from("CASE");
                for (cond, then) in when_then {
                    sql.push_str(&format!(" WHEN {} THEN {}", self.emit_expr(cond), self.emit_expr(then)));
                }
                if let Some(el) = else_result {
                    sql.push_str(&format!(" ELSE {}", self.emit_expr(el)));
                }
                sql.push_str(" END");
                sql
            }
        }
    }

    fn emit_junction(&self, exprs: &[Expr], separator: &str, empty: &str) -> String {
        match exprs {
            [] => empty.to_string(),
            [single] => self.emit_expr(single),
            _ => {
                let parts: Vec<String> = exprs.iter().map(|e| self.emit_expr(e)).collect();
                format!("({})", parts.join(separator))
            }
        }
    }

    fn emit_column(&self, col: &Column) -> String {
        self.dialect.quote_identifier(&col.name)
    }

    fn emit_literal(&self, lit: &Literal) -> String {
        match lit {
            Literal::Int(i) => i.to_string(),
            // Debug keeps the fractional part, so 2.0 stays a floating literal
            Literal::Float(f) => format!("{:?}", f),
            Literal::String(s) => self.dialect.quote_string(s),
            Literal::Timestamp(ts) => {
                let text = ts.format("%Y-%m-%d %H:%M:%S").to_string();
                format!("TIMESTAMP {}", self.dialect.quote_string(&text))
            }
        }
    }
}

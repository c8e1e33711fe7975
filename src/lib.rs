//! aggsql - Compile aggregation queries to SQL and reconcile the results
//!
//! This library provides:
//! - Aggregation query types (dimensions, aggregations, filter/having/post-aggregation trees)
//! - Table schema and logical ↔ physical column mapping
//! - Filter, having and post-aggregation compilation to SQL expressions
//! - Time bucketing by granularity
//! - Dialect-aware SQL emission (ANSI, PostgreSQL, MySQL, SQLite, Presto)
//! - Result-set reconciliation into engine-native response documents
//! - A pooled execution client
//!
//! # Architecture
//!
//! **Noun modules** (data structures):
//! - `query/` - query request types (AggregationQuery, Filter, Having, PostAggregation)
//! - `schema/` - table schema types (TableSchema, ColumnMapping)
//! - `sql/` - SQL statement types (SelectStatement, Expr, Projection)
//! - `config` - backend configuration (SqlBackendConfig)
//!
//! **Verb modules** (transformations):
//! - `parser/` - YAML/JSON → config, schema, query
//! - `mapper` - logical name ↔ physical column
//! - `evaluator/` - Filter/Having/PostAggregation → Expr
//! - `time` - Granularity + intervals → time parts, bucket timestamps
//! - `converter/` - AggregationQuery + TableSchema → SelectStatement
//! - `dialect/` + `emitter/` - SelectStatement → SQL text
//! - `reconciler/` - result rows → ResponseDocument
//! - `client/` - connection pool, execution, background submission
//!
//! # Example
//!
//! ```ignore
//! use aggsql::{parser, SqlBackedClient};
//!
//! let config = parser::parse_config_file("backend.yaml")?;
//! let query = parser::parse_query_file("query.json")?;
//! let client = SqlBackedClient::connect(&config).await?;
//! let response = client.execute(&query).await?;
//! println!("{}", response.to_json());
//! ```

pub mod query;
pub mod schema;
pub mod sql;
pub mod config;
pub mod mapper;
pub mod evaluator;
pub mod time;
pub mod dialect;
pub mod converter;
pub mod emitter;
pub mod reconciler;
pub mod client;
pub mod parser;
pub mod error;

// Re-export commonly used types
pub use query::{AggregationQuery, Aggregation, AggregationKind, Filter, Having, PostAggregation, QueryType, Granularity, Interval};
pub use schema::{TableSchema, ColumnMapping};
pub use config::SqlBackendConfig;
pub use mapper::FieldMapper;
pub use dialect::{SqlDialect, DialectKind};
pub use converter::{SqlConverter, CompiledQuery, PostAggregationMode};
pub use emitter::emit_sql;
pub use reconciler::{ResponseDocument, ResultRecord, CellValue};
pub use client::{SqlBackedClient, PreparedQuery, QueryHandle};
pub use error::{ParseError, SqlBackendError, ErrorKind};

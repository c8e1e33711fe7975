//! Backend configuration
//!
//! ```yaml
//! database_url: postgres://analytics@db/warehouse
//! dialect: postgres
//! max_connections: 16
//! query_timeout_secs: 60
//! post_aggregations: sql
//! tables:
//!   - name: sales
//!     table: public.sales_fact
//!     timestamp_column: event_time
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::converter::PostAggregationMode;
use crate::dialect::DialectKind;
use crate::schema::TableSchema;

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

/// Connection, dialect and table configuration of one SQL backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqlBackendConfig {
    pub database_url: String,
    #[serde(default)]
    pub dialect: DialectKind,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
    #[serde(default)]
    pub post_aggregations: PostAggregationMode,
    /// Parse pattern for timestamp columns stored as text
    #[serde(default)]
    pub timestamp_format: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl SqlBackendConfig {
    pub fn new(database_url: impl Into<String>, dialect: DialectKind) -> Self {
        Self {
            database_url: database_url.into(),
            dialect,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            query_timeout_secs: None,
            post_aggregations: PostAggregationMode::default(),
            timestamp_format: None,
            tables: Vec::new(),
        }
    }

    pub fn with_tables(mut self, tables: Vec<TableSchema>) -> Self {
        self.tables = tables;
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }
}

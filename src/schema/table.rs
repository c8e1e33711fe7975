//! Table schema definitions

use serde::Deserialize;
use super::column::ColumnMapping;

fn default_timestamp_column() -> String {
    "__time".to_string()
}

/// The resolved physical table a logical table reads from
///
/// ```yaml
/// name: sales
/// table: public.sales_fact
/// timestamp_column: event_time
/// columns:
///   - name: region
///     physical: region_cd
///   - name: amount
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableSchema {
    /// Logical table name (the query's data source)
    pub name: String,
    /// Physical relation, optionally schema-qualified
    pub table: String,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default)]
    pub columns: Vec<ColumnMapping>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>, timestamp_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            timestamp_column: timestamp_column.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnMapping>) -> Self {
        self.columns = columns;
        self
    }

    /// Relation name split into its qualifying parts (`schema.table` → `[schema, table]`)
    pub fn relation_parts(&self) -> Vec<&str> {
        self.table.split('.').collect()
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.name == name)
    }
}

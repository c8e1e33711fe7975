//! Column mappings for physical tables

use serde::Deserialize;

/// A logical (API-facing) column and the physical column backing it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMapping {
    /// Logical name used in queries and responses
    pub name: String,
    /// Physical column name. Defaults to the logical name.
    #[serde(default)]
    pub physical: Option<String>,
}

impl ColumnMapping {
    pub fn new(name: impl Into<String>, physical: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical: Some(physical.into()),
        }
    }

    /// Get the physical column name
    pub fn physical_name(&self) -> &str {
        self.physical.as_deref().unwrap_or(&self.name)
    }
}

//! Logical ↔ physical column name lookup
//!
//! Built once per query from the resolved table schema and never mutated.
//! Unmapped names pass through unchanged in both directions.

use std::collections::{BTreeSet, HashMap};

use crate::schema::TableSchema;

#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    to_physical: HashMap<String, String>,
    to_logical: HashMap<String, BTreeSet<String>>,
}

impl FieldMapper {
    pub fn new<I, L, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, P)>,
        L: Into<String>,
        P: Into<String>,
    {
        let mut to_physical = HashMap::new();
        let mut to_logical: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (logical, physical) in pairs {
            let logical = logical.into();
            let physical = physical.into();
            to_logical.entry(physical.clone()).or_default().insert(logical.clone());
            to_physical.insert(logical, physical);
        }
        Self { to_physical, to_logical }
    }

    pub fn from_schema(table: &TableSchema) -> Self {
        Self::new(
            table
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.physical_name().to_string())),
        )
    }

    /// Physical column for a logical name; the name itself when unmapped
    pub fn to_physical<'a>(&'a self, logical: &'a str) -> &'a str {
        self.to_physical.get(logical).map(String::as_str).unwrap_or(logical)
    }

    /// Every logical name aliasing a physical column; the name itself when unmapped
    pub fn to_logical(&self, physical: &str) -> BTreeSet<String> {
        match self.to_logical.get(physical) {
            Some(names) => names.clone(),
            None => BTreeSet::from([physical.to_string()]),
        }
    }

    /// Whether the logical name has an explicit mapping
    pub fn is_mapped(&self, logical: &str) -> bool {
        self.to_physical.contains_key(logical)
    }
}

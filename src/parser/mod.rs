//! Configuration and query parser (verb module)
//!
//! Transforms YAML (or JSON, which YAML accepts) into configuration, table
//! schemas and aggregation queries.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::config::SqlBackendConfig;
use crate::error::ParseError;
use crate::query::AggregationQuery;
use crate::schema::TableSchema;

fn read_file<P: AsRef<Path>>(path: P) -> Result<String, ParseError> {
    let path_str = path.as_ref().display().to_string();
    std::fs::read_to_string(&path).map_err(|e| ParseError::Io {
        path: path_str,
        source: e,
    })
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    serde_yaml::from_str(text).map_err(ParseError::from)
}

/// Parse backend configuration from a YAML file
pub fn parse_config_file<P: AsRef<Path>>(path: P) -> Result<SqlBackendConfig, ParseError> {
    parse_config_str(&read_file(path)?)
}

pub fn parse_config_str(yaml: &str) -> Result<SqlBackendConfig, ParseError> {
    parse(yaml)
}

/// Parse a single table schema
pub fn parse_table_str(yaml: &str) -> Result<TableSchema, ParseError> {
    parse(yaml)
}

/// Parse an aggregation query from a file (JSON or YAML)
pub fn parse_query_file<P: AsRef<Path>>(path: P) -> Result<AggregationQuery, ParseError> {
    parse_query_str(&read_file(path)?)
}

pub fn parse_query_str(text: &str) -> Result<AggregationQuery, ParseError> {
    parse(text)
}

//! Engine-native response shapes

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::query::QueryType;
use crate::time::format_timestamp;

/// One output row: its bucket start and its named fields
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub timestamp: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl ResultRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Reconciled result of one query
///
/// Serializes to the shape of the query type:
/// - groupBy: `[{"version": "v1", "timestamp": ..., "event": {...}}]`
/// - timeseries: `[{"timestamp": ..., "result": {...}}]`
/// - topN: `[{"timestamp": ..., "result": [{...}, ...]}]`, one entry per bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDocument {
    query_type: QueryType,
    records: Vec<ResultRecord>,
}

impl ResponseDocument {
    pub fn new(query_type: QueryType, records: Vec<ResultRecord>) -> Self {
        Self { query_type, records }
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Value {
        match self.query_type {
            QueryType::GroupBy => Value::Array(
                self.records
                    .iter()
                    .map(|r| {
                        json!({
                            "version": "v1",
                            "timestamp": format_timestamp(&r.timestamp),
                            "event": r.fields,
                        })
                    })
                    .collect(),
            ),
            QueryType::Timeseries => Value::Array(
                self.records
                    .iter()
                    .map(|r| {
                        json!({
                            "timestamp": format_timestamp(&r.timestamp),
                            "result": r.fields,
                        })
                    })
                    .collect(),
            ),
            QueryType::TopN => {
                // Records arrive ordered by bucket; consecutive equal timestamps form one entry
                let mut buckets: Vec<(DateTime<Utc>, Vec<Value>)> = Vec::new();
                for record in &self.records {
                    let row = Value::Object(record.fields.clone());
                    match buckets.last_mut() {
                        Some((ts, rows)) if *ts == record.timestamp => rows.push(row),
                        _ => buckets.push((record.timestamp, vec![row])),
                    }
                }
                Value::Array(
                    buckets
                        .into_iter()
                        .map(|(ts, rows)| json!({"timestamp": format_timestamp(&ts), "result": rows}))
                        .collect(),
                )
            }
        }
    }
}

impl Serialize for ResponseDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

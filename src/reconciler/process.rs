//! Row-at-a-time reconciliation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::converter::{CompiledQuery, PostAggregationMode};
use crate::error::{Result, SqlBackendError};
use crate::evaluator::PostAggregationEvaluator;
use crate::mapper::FieldMapper;
use crate::query::{AggregationQuery, Number};
use crate::time::{parse_timestamp, SqlTimeConverter};

use super::response::{ResponseDocument, ResultRecord};
use super::value::{float_value, CellValue};

/// What a result column carries
#[derive(Debug, Clone, PartialEq)]
enum ColumnRole {
    /// Time part or raw timestamp; consumed to rebuild the bucket start
    Time,
    Aggregation { name: String, floating_point: bool },
    /// Post-aggregation computed by the engine
    PostAggregation { name: String, floating_point: bool },
    /// Every logical dimension backed by this column
    Dimension { names: Vec<String> },
}

/// Turns rows of a compiled query into response records as they arrive
pub struct ResultSetProcessor<'a> {
    query: &'a AggregationQuery,
    mapper: &'a FieldMapper,
    time_converter: &'a SqlTimeConverter,
    mode: PostAggregationMode,
    layout: Option<Vec<ColumnRole>>,
    records: Vec<ResultRecord>,
}

impl<'a> ResultSetProcessor<'a> {
    pub fn new(query: &'a AggregationQuery, mapper: &'a FieldMapper, compiled: &'a CompiledQuery) -> Self {
        Self {
            query,
            mapper,
            time_converter: &compiled.time_converter,
            mode: compiled.post_aggregation_mode,
            layout: None,
            records: Vec::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.layout.is_some()
    }

    /// Classify result columns by name, in cursor order
    pub fn bind_columns(&mut self, names: &[String]) -> Result<()> {
        let leading = self.time_converter.leading_time_columns();
        if names.len() < leading {
            return Err(SqlBackendError::execution(format!(
                "result has {} column(s) but granularity '{}' needs {} time column(s)",
                names.len(),
                self.time_converter.granularity(),
                leading
            )));
        }
        let evaluator = PostAggregationEvaluator::new(self.query);

        let mut layout = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let role = if i < leading {
                ColumnRole::Time
            } else if let Some(agg) = self.query.aggregation(name) {
                ColumnRole::Aggregation {
                    name: name.clone(),
                    floating_point: agg.kind.is_floating_point(),
                }
            } else if let Some(post_agg) = self.query.post_aggregation(name) {
                ColumnRole::PostAggregation {
                    name: name.clone(),
                    floating_point: evaluator.is_floating(post_agg),
                }
            } else {
                let mut logical: Vec<String> = self
                    .mapper
                    .to_logical(name)
                    .into_iter()
                    .filter(|l| self.query.has_dimension(l))
                    .collect();
                if logical.is_empty() {
                    logical.push(name.clone());
                }
                ColumnRole::Dimension { names: logical }
            };
            layout.push(role);
        }
        self.layout = Some(layout);
        Ok(())
    }

    /// Reconcile one row; values are in bound column order
    pub fn push_row(&mut self, values: Vec<CellValue>) -> Result<()> {
        let record = self.reconcile_row(values)?;
        self.records.push(record);
        Ok(())
    }

    pub fn finish(self) -> ResponseDocument {
        ResponseDocument::new(self.query.query_type, self.records)
    }

    fn reconcile_row(&self, values: Vec<CellValue>) -> Result<ResultRecord> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| SqlBackendError::execution("row received before result columns were bound"))?;
        if values.len() != layout.len() {
            return Err(SqlBackendError::execution(format!(
                "row has {} value(s), expected {}",
                values.len(),
                layout.len()
            )));
        }

        let mut time_values = Vec::new();
        let mut fields = Map::new();
        let mut raw_aggregations: HashMap<&str, Option<String>> = HashMap::new();
        for (role, value) in layout.iter().zip(values) {
            match role {
                ColumnRole::Time => time_values.push(value),
                ColumnRole::Aggregation { name, floating_point } => {
                    raw_aggregations.insert(name.as_str(), value.as_text());
                    fields.insert(name.clone(), coerce(&value, *floating_point)?);
                }
                ColumnRole::PostAggregation { name, floating_point } => {
                    fields.insert(name.clone(), coerce(&value, *floating_point)?);
                }
                ColumnRole::Dimension { names } => {
                    for name in names {
                        fields.insert(name.clone(), value.to_dimension());
                    }
                }
            }
        }

        if self.mode == PostAggregationMode::Direct {
            let evaluator = PostAggregationEvaluator::new(self.query);
            let lookup = |name: &str| raw_aggregations.get(name).cloned().flatten();
            for post_agg in &self.query.post_aggregations {
                let Some(name) = post_agg.name() else { continue };
                let value = evaluator.evaluate(post_agg, &lookup)?;
                fields.insert(name.to_string(), number_value(value, evaluator.is_floating(post_agg)));
            }
        }

        Ok(ResultRecord {
            timestamp: self.bucket_start(&time_values)?,
            fields,
        })
    }

    fn bucket_start(&self, values: &[CellValue]) -> Result<DateTime<Utc>> {
        if self.time_converter.groups_by_raw_timestamp() {
            let raw = values
                .first()
                .and_then(CellValue::as_text)
                .ok_or_else(|| SqlBackendError::execution("missing raw timestamp value"))?;
            return parse_timestamp(&raw)
                .ok_or_else(|| SqlBackendError::execution(format!("cannot parse timestamp '{}'", raw)));
        }
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            let part = value
                .to_i64()?
                .ok_or_else(|| SqlBackendError::execution("time part is null"))?;
            parts.push(part);
        }
        self.time_converter.bucket_start(&parts)
    }
}

/// Apply an aggregation's numeric type; null stays null
fn coerce(value: &CellValue, floating_point: bool) -> Result<Value> {
    if floating_point {
        Ok(value.to_f64()?.map(float_value).unwrap_or(Value::Null))
    } else {
        Ok(value.to_i64()?.map(Value::from).unwrap_or(Value::Null))
    }
}

fn number_value(value: Option<Number>, floating_point: bool) -> Value {
    match value {
        None => Value::Null,
        Some(n) if floating_point => float_value(n.as_f64()),
        Some(Number::Integer(i)) => Value::from(i),
        Some(Number::Float(f)) => Value::from(f.trunc() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::dialect::AnsiDialect;
    use crate::converter::SqlConverter;
    use crate::query::{Aggregation, AggregationKind, ArithmeticOp, Granularity, PostAggregation};
    use crate::schema::{ColumnMapping, TableSchema};

    fn table() -> TableSchema {
        TableSchema::new("ads", "ad_stats", "ts").with_columns(vec![
            ColumnMapping::new("region", "region_cd"),
            ColumnMapping::new("area", "region_cd"),
        ])
    }

    fn query(granularity: Granularity) -> AggregationQuery {
        AggregationQuery {
            data_source: "ads".into(),
            dimensions: vec!["region".into()],
            granularity,
            aggregations: vec![
                Aggregation::new(AggregationKind::LongSum, "clicks", "clicks"),
                Aggregation::new(AggregationKind::DoubleSum, "cost", "cost"),
            ],
            post_aggregations: vec![PostAggregation::arithmetic(
                "ctr",
                ArithmeticOp::Divide,
                vec![PostAggregation::field("clicks"), PostAggregation::field("cost")],
            )],
            ..Default::default()
        }
    }

    fn compiled(query: &AggregationQuery, mode: PostAggregationMode) -> (FieldMapper, CompiledQuery) {
        let table = table();
        let mapper = FieldMapper::from_schema(&table);
        let compiled = SqlConverter::new(Box::new(AnsiDialect), mode)
            .compile(query, &table, &mapper)
            .unwrap();
        (mapper, compiled)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    // -- unit: coercion -------------------------------------------------------

    #[test]
    fn test_sql_mode_row() {
        let q = query(Granularity::All);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor
            .bind_columns(&names(&["region_cd", "clicks", "cost", "ctr"]))
            .unwrap();
        processor
            .push_row(vec![
                CellValue::Text("US".into()),
                CellValue::Text("12".into()),
                CellValue::Integer(4),
                CellValue::Integer(3),
            ])
            .unwrap();
        let doc = processor.finish();
        let record = &doc.records()[0];
        assert_eq!(record.get("region"), Some(&json!("US")));
        assert_eq!(record.get("clicks"), Some(&json!(12)));
        assert_eq!(record.get("cost"), Some(&json!(4.0)));
        assert_eq!(record.get("ctr"), Some(&json!(3.0)));
        assert!(record.get("region_cd").is_none());
    }

    #[test]
    fn test_null_aggregation_stays_null() {
        let q = query(Granularity::All);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor
            .bind_columns(&names(&["region_cd", "clicks", "cost", "ctr"]))
            .unwrap();
        processor
            .push_row(vec![CellValue::Null, CellValue::Null, CellValue::Null, CellValue::Null])
            .unwrap();
        let doc = processor.finish();
        assert_eq!(doc.records()[0].get("clicks"), Some(&Value::Null));
        assert_eq!(doc.records()[0].get("region"), Some(&Value::Null));
    }

    #[test]
    fn test_direct_mode_evaluates_post_aggregations() {
        let q = query(Granularity::All);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Direct);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor.bind_columns(&names(&["region_cd", "clicks", "cost"])).unwrap();
        processor
            .push_row(vec![CellValue::Text("US".into()), CellValue::Integer(6), CellValue::Float(0.0)])
            .unwrap();
        processor
            .push_row(vec![CellValue::Text("CA".into()), CellValue::Integer(6), CellValue::Float(4.0)])
            .unwrap();
        let doc = processor.finish();
        assert_eq!(doc.records()[0].get("ctr"), Some(&json!(0.0)));
        assert_eq!(doc.records()[1].get("ctr"), Some(&json!(1.5)));
    }

    #[test]
    fn test_aliased_physical_column_emits_queried_names() {
        let mut q = query(Granularity::All);
        q.dimensions = vec!["region".into(), "area".into()];
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor
            .bind_columns(&names(&["region_cd", "clicks", "cost", "ctr"]))
            .unwrap();
        processor
            .push_row(vec![
                CellValue::Text("EU".into()),
                CellValue::Integer(1),
                CellValue::Float(1.0),
                CellValue::Float(1.0),
            ])
            .unwrap();
        let doc = processor.finish();
        assert_eq!(doc.records()[0].get("region"), Some(&json!("EU")));
        assert_eq!(doc.records()[0].get("area"), Some(&json!("EU")));
    }

    // -- unit: time reconstruction ----------------------------------------------

    #[test]
    fn test_time_parts_rebuild_bucket() {
        let q = query(Granularity::Day);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor
            .bind_columns(&names(&["__year", "__dayofyear", "region_cd", "clicks", "cost", "ctr"]))
            .unwrap();
        processor
            .push_row(vec![
                CellValue::Integer(2024),
                CellValue::Float(60.0),
                CellValue::Text("US".into()),
                CellValue::Integer(1),
                CellValue::Float(1.0),
                CellValue::Float(1.0),
            ])
            .unwrap();
        let doc = processor.finish();
        let record = &doc.records()[0];
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert!(record.get("__year").is_none());
    }

    #[test]
    fn test_raw_timestamp_parsed() {
        let q = query(Granularity::None);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        processor
            .bind_columns(&names(&["__time", "region_cd", "clicks", "cost", "ctr"]))
            .unwrap();
        processor
            .push_row(vec![
                CellValue::Text("2024-05-06 07:08:09".into()),
                CellValue::Text("US".into()),
                CellValue::Integer(1),
                CellValue::Float(1.0),
                CellValue::Float(1.0),
            ])
            .unwrap();
        let doc = processor.finish();
        assert_eq!(doc.records()[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
    }

    #[test]
    fn test_row_width_mismatch() {
        let q = query(Granularity::All);
        let (mapper, compiled) = compiled(&q, PostAggregationMode::Sql);
        let mut processor = ResultSetProcessor::new(&q, &mapper, &compiled);
        assert!(processor.push_row(vec![CellValue::Null]).is_err());
        processor.bind_columns(&names(&["region_cd", "clicks"])).unwrap();
        let err = processor.push_row(vec![CellValue::Null]).unwrap_err();
        assert!(!err.is_compile_error());
    }
}

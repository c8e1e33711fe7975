//! Driver row decoding

use sqlx::any::AnyRow;
use sqlx::{Column, Row};

use crate::error::{Result, SqlBackendError};
use crate::reconciler::CellValue;

pub(crate) fn column_names(row: &AnyRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

pub(crate) fn decode_row(row: &AnyRow) -> Result<Vec<CellValue>> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

/// Decode by the value's runtime type; integers first so they stay exact
fn decode_cell(row: &AnyRow, index: usize) -> Result<CellValue> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map_or(CellValue::Null, CellValue::Integer));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.map_or(CellValue::Null, CellValue::Float));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map_or(CellValue::Null, CellValue::Bool));
    }
    row.try_get::<Option<String>, _>(index)
        .map(|value| value.map_or(CellValue::Null, CellValue::Text))
        .map_err(|e| SqlBackendError::driver(format!("cannot decode result column {}", index), e))
}

//! Input normalization: project, rename, coerce.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::{FieldKind, InputColumn};
use crate::error::ReportError;
use crate::table::{Scalar, Table};

/// Outcome of normalizing the uploaded sheet.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Canonical columns only, in declaration order.
    pub table: Table,
    /// Rows dropped because an integer field could not be coerced.
    pub dropped_rows: usize,
}

/// Select the declared source columns of `raw`, rename them to canonical
/// fields and coerce each value per its `FieldKind`.
///
/// Missing source columns fail with `ReportError::Schema`. Rows with a
/// non-numeric or blank integer field are dropped. A numeric key without a
/// leading integer fails with `ReportError::KeyParse`.
pub fn normalize(raw: &Table, columns: &[InputColumn]) -> Result<Ingested, ReportError> {
    let sources: Vec<&str> = columns.iter().map(|c| c.source.as_str()).collect();
    let selected = raw
        .select(&sources)
        .map_err(|missing| ReportError::missing_columns("input", missing))?;
    let renamed = selected.rename(|name| {
        columns
            .iter()
            .find(|c| c.source == name)
            .map(|c| c.field.clone())
    });

    let mut out = Table::new(renamed.columns().iter().cloned());
    let mut dropped_rows = 0;

    'rows: for row in renamed.rows() {
        let mut values = Vec::with_capacity(row.len());
        // Integer coercion runs first so malformed rows never reach key parsing
        for (col, value) in columns.iter().zip(row) {
            if col.kind == FieldKind::Integer {
                match coerce_integer(value) {
                    Some(n) => values.push(Scalar::Int(n)),
                    None => {
                        dropped_rows += 1;
                        continue 'rows;
                    }
                }
            } else {
                values.push(value.clone());
            }
        }
        for (col, value) in columns.iter().zip(values.iter_mut()) {
            match col.kind {
                FieldKind::Integer => {}
                FieldKind::Text => *value = coerce_text(value),
                FieldKind::TextKey => *value = value.key_text().map_or(Scalar::Null, Scalar::Text),
                FieldKind::NumericKey => {
                    *value = Scalar::Int(parse_numeric_key(&col.field, value, col.separator)?)
                }
            }
        }
        out.push_row(values);
    }

    if dropped_rows > 0 {
        warn!(dropped_rows, "dropped input rows with non-numeric integer fields");
    }
    info!(rows = out.len(), "normalized input sheet");

    Ok(Ingested {
        table: out,
        dropped_rows,
    })
}

/// Unique non-null keys of `field`, in first-seen order.
pub fn unique_keys(table: &Table, field: &str) -> Result<Vec<String>, ReportError> {
    let idx = table
        .column_index(field)
        .ok_or_else(|| ReportError::missing_columns("input", vec![field.to_string()]))?;
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in table.rows() {
        if let Some(key) = row[idx].key_text() {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    Ok(keys)
}

/// Float-to-int style coercion: fractions truncate toward zero.
pub fn coerce_integer(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Int(n) => Some(*n),
        Scalar::Number(n) => float_to_int(n.0),
        Scalar::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
        }
        Scalar::Null => None,
    }
}

fn float_to_int(n: f64) -> Option<i64> {
    (n.is_finite() && n.abs() < 9.2e18).then(|| n.trunc() as i64)
}

fn coerce_text(value: &Scalar) -> Scalar {
    match value {
        Scalar::Null => Scalar::Null,
        Scalar::Text(s) if s.trim().is_empty() => Scalar::Null,
        Scalar::Text(_) => value.clone(),
        other => Scalar::Text(other.to_string()),
    }
}

/// Leading integer segment of a composite key: `"123-ABC"` → 123.
pub fn parse_numeric_key(field: &str, value: &Scalar, separator: char) -> Result<i64, ReportError> {
    let text = value.to_string();
    let head = text.split(separator).next().unwrap_or_default().trim();
    head.parse::<i64>().map_err(|_| ReportError::KeyParse {
        field: field.to_string(),
        value: text.clone(),
    })
}

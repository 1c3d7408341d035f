use std::collections::HashMap;

use crate::config::{Measure, RECORD_COUNT};
use crate::error::ReportError;
use crate::table::{Scalar, Table};

/// Append `measure.name = left × right` to every row.
pub fn with_measure(table: &Table, measure: &Measure) -> Table {
    table.with_column(&measure.name, |r| match (r.get(&measure.left), r.get(&measure.right)) {
        (Some(a), Some(b)) => a.mul(b),
        _ => Scalar::Null,
    })
}

/// Group by `group_by`, summing `measure` and counting rows.
///
/// Output columns: `group_by..., measure, record_count`. Groups appear in
/// the order their first row appears in `table`.
pub fn group_sum(table: &Table, group_by: &[String], measure: &str) -> Result<Table, ReportError> {
    let mut wanted: Vec<&str> = group_by.iter().map(String::as_str).collect();
    wanted.push(measure);
    let missing = table.missing_columns(&wanted);
    if !missing.is_empty() {
        return Err(ReportError::missing_columns("aggregate", missing));
    }

    let key_idx: Vec<usize> = group_by.iter().filter_map(|c| table.column_index(c)).collect();
    let measure_idx = table.column_index(measure).unwrap_or_default();

    let mut order: Vec<(Vec<Scalar>, Scalar, i64)> = Vec::new();
    let mut index: HashMap<Vec<Scalar>, usize> = HashMap::new();

    for row in table.rows() {
        let key: Vec<Scalar> = key_idx.iter().map(|&i| group_cell(&row[i])).collect();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, Scalar::Int(0), 0));
                order.len() - 1
            }
        };
        let entry = &mut order[slot];
        entry.1 = entry.1.add(&row[measure_idx]);
        entry.2 += 1;
    }

    let mut columns: Vec<&str> = group_by.iter().map(String::as_str).collect();
    columns.push(measure);
    columns.push(RECORD_COUNT);

    let rows = order.into_iter().map(|(mut key, total, count)| {
        key.push(total);
        key.push(Scalar::Int(count));
        key
    });
    Ok(Table::from_rows(columns, rows))
}

/// Integral floats group with the equal integer.
fn group_cell(value: &Scalar) -> Scalar {
    match value {
        Scalar::Number(n) if n.0.fract() == 0.0 && n.0.abs() < 9.0e15 => Scalar::Int(n.0 as i64),
        other => other.clone(),
    }
}

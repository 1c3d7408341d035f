//! Relational store access.
//!
//! The engine never owns a connection: callers inject a `DataSource` whose
//! implementation decides how a handle is acquired and released per fetch.

use std::collections::HashMap;

use tracing::info;

use crate::config::{JoinClassifyConfig, SetReconcileConfig};
use crate::error::ReportError;
use crate::table::{Scalar, Table};

/// Read-only query execution against a relational store.
pub trait DataSource {
    /// Run one statement and return every row. Implementations must not
    /// retry; failures surface as `ReportError::DataSource`.
    fn fetch(&self, statement: &str) -> Result<Table, ReportError>;
}

/// Run the join-classify query and project onto the declared store fields.
pub fn fetch_store_rows(source: &dyn DataSource, config: &JoinClassifyConfig) -> Result<Table, ReportError> {
    let table = source.fetch(&config.query)?;
    let rows = table
        .select(&config.store_fields)
        .map_err(|missing| ReportError::missing_columns("store", missing))?;
    info!(rows = rows.len(), "fetched store rows");
    Ok(rows)
}

/// `SELECT <key>, <label> FROM <table>` with every identifier quoted.
///
/// Identifiers come from validated config only.
pub fn key_selection_statement(config: &SetReconcileConfig) -> String {
    format!(
        "SELECT {}, {} FROM {}",
        quote_ident(&config.key_column),
        quote_ident(&config.label_column),
        quote_ident(&config.table),
    )
}

fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Store side of a key reconciliation, all values coerced to text.
#[derive(Debug, Clone, Default)]
pub struct StoreKeys {
    /// Unique non-null keys in first-seen order.
    pub keys: Vec<String>,
    /// First label seen per key.
    pub labels: HashMap<String, Scalar>,
}

/// Fetch keys and labels for set reconciliation.
pub fn fetch_store_keys(source: &dyn DataSource, config: &SetReconcileConfig) -> Result<StoreKeys, ReportError> {
    let statement = key_selection_statement(config);
    let table = source.fetch(&statement)?;
    if table.columns().len() < 2 {
        return Err(ReportError::DataSource(format!(
            "key query returned {} column(s), expected 2",
            table.columns().len()
        )));
    }

    let mut out = StoreKeys::default();
    for row in table.rows() {
        let Some(key) = row[0].key_text() else {
            continue;
        };
        if !out.labels.contains_key(&key) {
            let label = match &row[1] {
                Scalar::Null => Scalar::Null,
                other => Scalar::Text(other.to_string()),
            };
            out.labels.insert(key.clone(), label);
            out.keys.push(key);
        }
    }
    info!(keys = out.keys.len(), "fetched store keys");
    Ok(out)
}

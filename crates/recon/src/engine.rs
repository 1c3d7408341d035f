use tracing::{info, warn};

use crate::aggregate::{group_sum, with_measure};
use crate::classify::partition;
use crate::config::{JoinClassifyConfig, ReportConfig, SetReconcileConfig, Strategy};
use crate::error::ReportError;
use crate::ingest::{normalize, unique_keys};
use crate::matcher::{inner_join, reconcile_keys};
use crate::model::{ReportBook, ReportMeta, ReportSheet, ReportWarning, RunStats};
use crate::source::{fetch_store_keys, fetch_store_rows, DataSource};
use crate::table::{Scalar, Table};

pub const SHEET_SUMMARY: &str = "summary";
pub const SHEET_MISSING_IN_DB: &str = "missing_in_db";
pub const SHEET_MISSING_IN_EXCEL: &str = "missing_in_excel";
pub const SHEET_MATCHED: &str = "matched";

/// Run one report: normalize `input`, query `source`, reconcile, aggregate
/// and lay out the output sheets.
///
/// `input` is the raw first worksheet with its header row as column names.
pub fn run(config: &ReportConfig, input: &Table, source: &dyn DataSource) -> Result<ReportBook, ReportError> {
    info!(config = %config.name, strategy = config.strategy.label(), "running report");

    let ingested = normalize(input, &config.input_columns)?;
    let mut warnings = Vec::new();
    if ingested.dropped_rows > 0 {
        warnings.push(ReportWarning::MalformedRows {
            dropped: ingested.dropped_rows,
        });
    }

    let (sheets, stats) = match &config.strategy {
        Strategy::JoinClassify(jc) => run_join_classify(config, jc, &ingested.table, source)?,
        Strategy::SetReconcile(sr) => run_set_reconcile(config, sr, &ingested.table, source)?,
    };

    if stats.matched_rows == 0 {
        warn!(config = %config.name, "no matching keys between input and store; exporting empty sheets");
        warnings.push(ReportWarning::EmptyJoin {
            strategy: config.strategy.label().to_string(),
        });
    }

    Ok(ReportBook {
        meta: ReportMeta {
            config_name: config.name.clone(),
            strategy: config.strategy.label().to_string(),
            output_name: config.output_name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        sheets,
        stats,
        warnings,
    })
}

fn run_join_classify(
    config: &ReportConfig,
    jc: &JoinClassifyConfig,
    input: &Table,
    source: &dyn DataSource,
) -> Result<(Vec<ReportSheet>, RunStats), ReportError> {
    let store = fetch_store_rows(source, jc)?;
    let joined = inner_join(input, &store, &jc.join_key)?.sorted_by(&jc.display_key);
    let groups = partition(&joined, &jc.classify);
    info!(
        joined = joined.len(),
        matched = groups.matched.len(),
        remainder = groups.remainder.len(),
        "classified joined rows"
    );

    let measured = with_measure(&groups.remainder, &jc.measure);
    let aggregated = group_sum(&measured, &jc.group_by, &jc.measure.name)?;

    let sheets = vec![
        labeled_sheet(config, &jc.matched_sheet.name, &groups.matched, &jc.matched_sheet.columns)?,
        labeled_sheet(config, &jc.remainder_sheet.name, &aggregated, &jc.remainder_sheet.columns)?,
    ];
    let stats = RunStats {
        input_rows: input.len(),
        store_rows: store.len(),
        matched_rows: joined.len(),
        reconciliation: None,
    };
    Ok((sheets, stats))
}

fn run_set_reconcile(
    config: &ReportConfig,
    sr: &SetReconcileConfig,
    input: &Table,
    source: &dyn DataSource,
) -> Result<(Vec<ReportSheet>, RunStats), ReportError> {
    let input_keys = unique_keys(input, &sr.key_field)?;
    let store = fetch_store_keys(source, sr)?;
    let set = reconcile_keys(&input_keys, &store.keys);
    info!(
        matched = set.summary.matched,
        missing_in_store = set.summary.missing_in_store,
        missing_in_input = set.summary.missing_in_input,
        "reconciled keys"
    );

    let key_label = label(config, &sr.key_field)?;
    let name_label = label(config, &sr.label_column)?;
    let s = &set.summary;

    let summary = ReportSheet {
        name: SHEET_SUMMARY.into(),
        headers: vec!["metric".into(), "value".into()],
        rows: [
            ("excel_unique_codes", s.input_keys),
            ("db_unique_codes", s.store_keys),
            ("matched", s.matched),
            ("missing_in_db", s.missing_in_store),
            ("missing_in_excel", s.missing_in_input),
        ]
        .into_iter()
        .map(|(metric, value)| vec![Scalar::text(metric), Scalar::Int(value as i64)])
        .collect(),
    };
    let key_sheet = |name: &str, keys: &[String]| ReportSheet {
        name: name.into(),
        headers: vec![key_label.clone()],
        rows: keys.iter().map(|k| vec![Scalar::text(k.clone())]).collect(),
    };
    let matched = ReportSheet {
        name: SHEET_MATCHED.into(),
        headers: vec![key_label.clone(), name_label],
        rows: set
            .matched
            .iter()
            .map(|k| {
                let name = store.labels.get(k).cloned().unwrap_or(Scalar::Null);
                vec![Scalar::text(k.clone()), name]
            })
            .collect(),
    };

    let sheets = vec![
        summary,
        key_sheet(SHEET_MISSING_IN_DB, &set.missing_in_store),
        key_sheet(SHEET_MISSING_IN_EXCEL, &set.missing_in_input),
        matched,
    ];
    let stats = RunStats {
        input_rows: input.len(),
        store_rows: store.keys.len(),
        matched_rows: set.summary.matched,
        reconciliation: Some(set.summary),
    };
    Ok((sheets, stats))
}

fn label(config: &ReportConfig, field: &str) -> Result<String, ReportError> {
    config
        .label_for(field)
        .map(str::to_string)
        .ok_or_else(|| ReportError::Config(format!("'{}': field '{field}' has no display label", config.name)))
}

/// Project `table` onto `columns` and relabel them for display.
pub fn labeled_sheet(
    config: &ReportConfig,
    name: &str,
    table: &Table,
    columns: &[String],
) -> Result<ReportSheet, ReportError> {
    let projected = table
        .select(columns)
        .map_err(|missing| ReportError::missing_columns(name, missing))?;
    let headers = columns
        .iter()
        .map(|c| label(config, c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReportSheet {
        name: name.to_string(),
        headers,
        rows: projected.into_rows(),
    })
}

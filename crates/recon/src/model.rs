use serde::Serialize;

use crate::table::{Scalar, Table};

// ---------------------------------------------------------------------------
// Join-classify
// ---------------------------------------------------------------------------

/// Joined records split by the classification predicate.
///
/// Every joined record lands in exactly one side.
#[derive(Debug, Clone)]
pub struct ClassifiedGroups {
    pub matched: Table,
    pub remainder: Table,
}

// ---------------------------------------------------------------------------
// Set-reconcile
// ---------------------------------------------------------------------------

/// Three disjoint key sets, each sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationSet {
    pub matched: Vec<String>,
    pub missing_in_store: Vec<String>,
    pub missing_in_input: Vec<String>,
    pub summary: KeySummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    pub input_keys: usize,
    pub store_keys: usize,
    pub matched: usize,
    pub missing_in_store: usize,
    pub missing_in_input: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A display-labeled table ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl ReportSheet {
    /// Column widths in characters: longest rendered cell or header, plus 2.
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let longest_cell = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                longest_cell.max(header.chars().count()) + 2
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    /// Join or reconciliation produced no matches; sheets are exported empty.
    EmptyJoin { strategy: String },
    /// Input rows dropped because an integer field was not numeric.
    MalformedRows { dropped: usize },
}

impl std::fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyJoin { strategy } => write!(f, "{strategy}: no matching keys between input and store"),
            Self::MalformedRows { dropped } => write!(f, "{dropped} malformed input row(s) dropped"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub input_rows: usize,
    pub store_rows: usize,
    pub matched_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<KeySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub strategy: String,
    pub output_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Everything one run produces, in export order.
#[derive(Debug, Clone)]
pub struct ReportBook {
    pub meta: ReportMeta,
    pub sheets: Vec<ReportSheet>,
    pub stats: RunStats,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
}

/// Serializable digest of a run, without cell data.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub meta: ReportMeta,
    pub sheets: Vec<SheetSummary>,
    pub stats: RunStats,
    pub warnings: Vec<ReportWarning>,
}

impl ReportBook {
    pub fn sheet(&self, name: &str) -> Option<&ReportSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            meta: self.meta.clone(),
            sheets: self
                .sheets
                .iter()
                .map(|s| SheetSummary {
                    name: s.name.clone(),
                    rows: s.rows.len(),
                })
                .collect(),
            stats: self.stats.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_use_longest_cell_or_header() {
        let sheet = ReportSheet {
            name: "s".into(),
            headers: vec!["Tea ID".into(), "Tea Name".into(), "Package Size (g)".into()],
            rows: vec![
                vec![Scalar::Int(12345678), "Jasmine Pearl Supreme".into(), Scalar::Int(100)],
                vec![Scalar::Int(1), Scalar::Null, Scalar::number(2.5)],
            ],
        };
        assert_eq!(sheet.column_widths(), vec![10, 23, 18]);
    }

    #[test]
    fn widths_count_characters_not_bytes() {
        let sheet = ReportSheet {
            name: "s".into(),
            headers: vec!["n".into()],
            rows: vec![vec!["Pu'er ☕ éé".into()]],
        };
        assert_eq!(sheet.column_widths(), vec![12]);
    }

    #[test]
    fn empty_sheet_widths_fall_back_to_headers() {
        let sheet = ReportSheet {
            name: "s".into(),
            headers: vec!["code".into()],
            rows: vec![],
        };
        assert_eq!(sheet.column_widths(), vec![6]);
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let json = serde_json::to_string(&ReportWarning::EmptyJoin {
            strategy: "join_classify".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"empty_join","strategy":"join_classify"}"#);
    }
}

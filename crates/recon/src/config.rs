use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Deserialize;

use crate::error::ReportError;
use crate::table::Scalar;

/// Synthetic column produced by the aggregator next to the measure sum.
pub const RECORD_COUNT: &str = "record_count";

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

/// Characters Excel refuses in a sheet name.
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub name: String,
    /// File stem of the exported workbook.
    pub output_name: String,
    pub input_columns: Vec<InputColumn>,
    pub strategy: Strategy,
    /// Canonical field → display label for exported columns.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Input column contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputColumn {
    /// Header text in the uploaded spreadsheet.
    pub source: String,
    /// Canonical field name after ingestion.
    pub field: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Separator for composite numeric keys like `"123-ABC"`.
    #[serde(default = "default_separator")]
    pub separator: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Kept as text; blank cells become null.
    #[default]
    Text,
    /// Coerced to an integer; rows that fail coercion are dropped.
    Integer,
    /// Leading integer segment of a composite key; failure is fatal.
    NumericKey,
    /// Whitespace-trimmed text key.
    TextKey,
}

fn default_separator() -> char {
    '-'
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    JoinClassify(JoinClassifyConfig),
    SetReconcile(SetReconcileConfig),
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::JoinClassify(_) => "join_classify",
            Self::SetReconcile(_) => "set_reconcile",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinClassifyConfig {
    /// Fixed read-only statement run against the store.
    pub query: String,
    /// Columns the query is expected to return.
    pub store_fields: Vec<String>,
    pub join_key: String,
    /// Joined rows are stably sorted by this field before classification.
    pub display_key: String,
    /// Rows satisfying this go to `matched_sheet`; all others are aggregated.
    pub classify: Predicate,
    pub measure: Measure,
    pub group_by: Vec<String>,
    pub matched_sheet: SheetLayout,
    pub remainder_sheet: SheetLayout,
}

/// Derived per-row measure `left × right`, stored as `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct Measure {
    pub name: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetLayout {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetReconcileConfig {
    /// Canonical input field holding the keys.
    pub key_field: String,
    pub table: String,
    pub key_column: String,
    /// Store column reported next to matched keys.
    pub label_column: String,
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// Boolean test over the fields of a joined record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Equals { field: String, value: Literal },
    FieldsEqual { left: String, right: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Number(f64),
    Text(String),
}

impl Literal {
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Self::Int(n) => Scalar::Int(*n),
            Self::Number(n) => Scalar::number(*n),
            Self::Text(s) => Scalar::text(s.clone()),
        }
    }
}

impl Predicate {
    /// Every field name the predicate reads.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::All(items) | Self::Any(items) => {
                for p in items {
                    p.collect_fields(out);
                }
            }
            Self::Not(inner) => inner.collect_fields(out),
            Self::Equals { field, .. } => out.push(field),
            Self::FieldsEqual { left, right } => {
                out.push(left);
                out.push(right);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReportError> {
        let config: ReportConfig = toml::from_str(input)
            .map_err(|e| ReportError::Config(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Canonical field names produced by ingestion, in declaration order.
    pub fn input_fields(&self) -> Vec<&str> {
        self.input_columns.iter().map(|c| c.field.as_str()).collect()
    }

    pub fn input_column(&self, field: &str) -> Option<&InputColumn> {
        self.input_columns.iter().find(|c| c.field == field)
    }

    pub fn label_for(&self, field: &str) -> Option<&str> {
        self.labels.get(field).map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        let invalid = |msg: String| ReportError::Config(format!("'{}': {msg}", self.name));

        if self.name.trim().is_empty() {
            return Err(ReportError::Config("config name must not be empty".into()));
        }
        if self.output_name.trim().is_empty() {
            return Err(invalid("output_name must not be empty".into()));
        }
        if self.input_columns.is_empty() {
            return Err(invalid("at least one input column is required".into()));
        }

        let mut seen_fields = HashSet::new();
        let mut seen_sources = HashSet::new();
        for col in &self.input_columns {
            if !seen_fields.insert(col.field.as_str()) {
                return Err(invalid(format!("canonical field '{}' declared twice", col.field)));
            }
            if !seen_sources.insert(col.source.as_str()) {
                return Err(invalid(format!("source column '{}' mapped twice", col.source)));
            }
        }

        // Labels must round-trip: one label per field, no label reused
        let mut seen_labels = HashSet::new();
        for (field, label) in &self.labels {
            if !seen_labels.insert(label.as_str()) {
                return Err(invalid(format!("label '{label}' is used by more than one field (last: '{field}')")));
            }
        }

        match &self.strategy {
            Strategy::JoinClassify(jc) => self.validate_join_classify(jc).map_err(invalid),
            Strategy::SetReconcile(sr) => self.validate_set_reconcile(sr).map_err(invalid),
        }
    }

    fn validate_join_classify(&self, jc: &JoinClassifyConfig) -> Result<(), String> {
        let input: BTreeSet<&str> = self.input_fields().into_iter().collect();
        let store: BTreeSet<&str> = jc.store_fields.iter().map(String::as_str).collect();
        let known = |f: &str| input.contains(f) || store.contains(f);

        if jc.query.trim().is_empty() {
            return Err("query must not be empty".into());
        }
        if !input.contains(jc.join_key.as_str()) {
            return Err(format!("join key '{}' is not an input field", jc.join_key));
        }
        if !store.contains(jc.join_key.as_str()) {
            return Err(format!("join key '{}' is not a store field", jc.join_key));
        }
        if !known(&jc.display_key) {
            return Err(format!("display key '{}' is not a known field", jc.display_key));
        }
        for field in jc.classify.fields() {
            if !known(field) {
                return Err(format!("predicate field '{field}' is not a known field"));
            }
        }
        for operand in [&jc.measure.left, &jc.measure.right] {
            if !known(operand) {
                return Err(format!("measure operand '{operand}' is not a known field"));
            }
        }
        if known(&jc.measure.name) || jc.measure.name == RECORD_COUNT {
            return Err(format!("measure name '{}' collides with an existing field", jc.measure.name));
        }
        if jc.group_by.is_empty() {
            return Err("group_by must name at least one field".into());
        }
        for field in &jc.group_by {
            if !known(field) {
                return Err(format!("group_by field '{field}' is not a known field"));
            }
        }

        for column in &jc.matched_sheet.columns {
            if !known(column) {
                return Err(format!(
                    "sheet '{}': column '{column}' is not a known field",
                    jc.matched_sheet.name
                ));
            }
        }
        for column in &jc.remainder_sheet.columns {
            let aggregated = jc.group_by.contains(column)
                || *column == jc.measure.name
                || column == RECORD_COUNT;
            if !aggregated {
                return Err(format!(
                    "sheet '{}': column '{column}' is neither grouped nor aggregated",
                    jc.remainder_sheet.name
                ));
            }
        }

        validate_sheet_names(&[jc.matched_sheet.name.as_str(), jc.remainder_sheet.name.as_str()])?;

        for layout in [&jc.matched_sheet, &jc.remainder_sheet] {
            self.require_labels(&layout.name, &layout.columns)?;
        }
        Ok(())
    }

    fn validate_set_reconcile(&self, sr: &SetReconcileConfig) -> Result<(), String> {
        if self.input_column(&sr.key_field).is_none() {
            return Err(format!("key field '{}' is not an input field", sr.key_field));
        }
        validate_identifier(&sr.table, true)?;
        validate_identifier(&sr.key_column, false)?;
        validate_identifier(&sr.label_column, false)?;
        self.require_labels("matched", &[sr.key_field.clone(), sr.label_column.clone()])
    }

    fn require_labels(&self, sheet: &str, columns: &[String]) -> Result<(), String> {
        for column in columns {
            if !self.labels.contains_key(column) {
                return Err(format!("sheet '{sheet}': column '{column}' has no display label"));
            }
        }
        Ok(())
    }
}

fn validate_sheet_names(names: &[&str]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err("sheet names must not be empty".into());
        }
        if name.chars().count() > MAX_SHEET_NAME {
            return Err(format!("sheet name '{name}' exceeds {MAX_SHEET_NAME} characters"));
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
            return Err(format!("sheet name '{name}' contains '{c}'"));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(format!("sheet name '{name}' must not start or end with an apostrophe"));
        }
        if !seen.insert(*name) {
            return Err(format!("sheet name '{name}' used twice"));
        }
    }
    Ok(())
}

/// Store identifiers are spliced into SQL, so only plain names pass.
fn validate_identifier(ident: &str, allow_schema: bool) -> Result<(), String> {
    let parts: Vec<&str> = ident.split('.').collect();
    if parts.len() > 2 || (parts.len() == 2 && !allow_schema) {
        return Err(format!("invalid identifier '{ident}'"));
    }
    for part in parts {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid identifier '{ident}'"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

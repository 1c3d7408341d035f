//! Ordered in-memory tables.
//!
//! Every pipeline stage consumes a `Table` and produces a new one; nothing is
//! mutated in place once handed on.

use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Null,
    Text(String),
    Int(i64),
    Number(OrderedFloat<f64>),
}

impl Scalar {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Number(n) => Some(n.0),
            _ => None,
        }
    }

    /// Normalized text used to compare keys across sources.
    ///
    /// `Int(10)`, `Number(10.0)` and `Text(" 10 ")` all yield `"10"`.
    /// Null and blank text have no key.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            other => Some(other.to_string()),
        }
    }

    /// Equality used by classification predicates: numbers compare by value
    /// regardless of int/float representation, null never equals anything.
    pub fn loose_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Product of two numeric values. Null or text operands give `Null`.
    pub fn mul(&self, other: &Scalar) -> Scalar {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => match a.checked_mul(*b) {
                Some(n) => Self::Int(n),
                None => Self::number(*a as f64 * *b as f64),
            },
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Self::number(a * b),
                _ => Self::Null,
            },
        }
    }

    /// Sum that skips nulls: `acc + Null == acc`.
    pub fn add(&self, other: &Scalar) -> Scalar {
        match (self, other) {
            (a, Self::Null) => a.clone(),
            (Self::Null, b) => b.clone(),
            (Self::Int(a), Self::Int(b)) => match a.checked_add(*b) {
                Some(n) => Self::Int(n),
                None => Self::number(*a as f64 + *b as f64),
            },
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Self::number(a + b),
                _ => Self::Null,
            },
        }
    }

    /// Display ordering: numbers numerically, everything else by its text,
    /// nulls last.
    pub fn display_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.to_string().cmp(&other.to_string()),
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            // Integral floats print without a fraction
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", n.0 as i64),
            Self::Number(n) => write!(f, "{}", n.0),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Named columns plus an ordered sequence of rows of equal width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

/// Borrowed view of one row with by-name field access.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Scalar],
}

impl<'a> Record<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Scalar> {
        self.columns
            .iter()
            .position(|c| c == field)
            .map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Scalar] {
        self.values
    }
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from literal rows. Short rows are padded with nulls,
    /// long rows truncated to the column count.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Scalar>>,
    ) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Scalar>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Vec<Scalar>) {
        row.resize(self.columns.len(), Scalar::Null);
        self.rows.push(row);
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Names from `wanted` that are not columns of this table, in order.
    pub fn missing_columns<S: AsRef<str>>(&self, wanted: &[S]) -> Vec<String> {
        wanted
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .map(str::to_string)
            .collect()
    }

    /// Project onto `columns` in the given order.
    ///
    /// Returns the list of absent names as the error.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table, Vec<String>> {
        let missing = self.missing_columns(columns);
        if !missing.is_empty() {
            return Err(missing);
        }
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c.as_ref()))
            .collect();
        Ok(Table {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Rename columns through `mapping`; unmapped columns keep their name.
    pub fn rename(mut self, mapping: impl Fn(&str) -> Option<String>) -> Table {
        for column in &mut self.columns {
            if let Some(renamed) = mapping(column) {
                *column = renamed;
            }
        }
        self
    }

    /// Keep rows for which `keep` returns true, preserving order.
    pub fn filter(&self, mut keep: impl FnMut(Record<'_>) -> bool) -> Table {
        let rows = self
            .records()
            .filter(|r| keep(*r))
            .map(|r| r.values.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Append a column computed from each row.
    pub fn with_column(&self, name: &str, mut compute: impl FnMut(Record<'_>) -> Scalar) -> Table {
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = self
            .records()
            .map(|r| {
                let mut row = r.values.to_vec();
                row.push(compute(r));
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Stable sort by one column using display ordering. Unknown columns
    /// leave the order unchanged.
    pub fn sorted_by(&self, column: &str) -> Table {
        let mut rows = self.rows.clone();
        if let Some(idx) = self.column_index(column) {
            rows.sort_by(|a, b| a[idx].display_cmp(&b[idx]));
        }
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["tea_id", "tea_name", "weight_g"],
            vec![
                vec![Scalar::Int(2), "Sencha".into(), Scalar::Int(50)],
                vec![Scalar::Int(1), "Assam".into(), Scalar::Int(100)],
                vec![Scalar::Int(3), "Assam".into(), Scalar::Null],
            ],
        )
    }

    #[test]
    fn select_reorders_and_reports_missing() {
        let t = sample();
        let picked = t.select(&["weight_g", "tea_id"]).unwrap();
        assert_eq!(picked.columns(), ["weight_g", "tea_id"]);
        assert_eq!(picked.rows()[0], vec![Scalar::Int(50), Scalar::Int(2)]);

        let err = t.select(&["tea_id", "category", "jar"]).unwrap_err();
        assert_eq!(err, vec!["category", "jar"]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let sorted = sample().sorted_by("tea_name");
        let ids: Vec<&Scalar> = sorted.rows().iter().map(|r| &r[0]).collect();
        assert_eq!(ids, vec![&Scalar::Int(1), &Scalar::Int(3), &Scalar::Int(2)]);
    }

    #[test]
    fn sort_puts_nulls_last() {
        let sorted = sample().sorted_by("weight_g");
        assert!(sorted.rows()[2][2].is_null());
        assert_eq!(sorted.rows()[0][2], Scalar::Int(50));
    }

    #[test]
    fn filter_and_with_column_leave_source_untouched() {
        let t = sample();
        let heavy = t.filter(|r| r.get("weight_g").and_then(Scalar::as_f64).unwrap_or(0.0) >= 100.0);
        assert_eq!(heavy.len(), 1);
        assert_eq!(t.len(), 3);

        let doubled = t.with_column("double", |r| r.get("weight_g").unwrap().mul(&Scalar::Int(2)));
        assert_eq!(doubled.columns().len(), 4);
        assert_eq!(doubled.rows()[1][3], Scalar::Int(200));
        assert!(doubled.rows()[2][3].is_null());
    }

    #[test]
    fn key_text_normalizes_representations() {
        assert_eq!(Scalar::Int(10).key_text().as_deref(), Some("10"));
        assert_eq!(Scalar::number(10.0).key_text().as_deref(), Some("10"));
        assert_eq!(Scalar::text(" 10 ").key_text().as_deref(), Some("10"));
        assert_eq!(Scalar::text("   ").key_text(), None);
        assert_eq!(Scalar::Null.key_text(), None);
    }

    #[test]
    fn loose_eq_crosses_numeric_types_but_not_null() {
        assert!(Scalar::Int(100).loose_eq(&Scalar::number(100.0)));
        assert!(!Scalar::Int(100).loose_eq(&Scalar::text("100")));
        assert!(!Scalar::Null.loose_eq(&Scalar::Null));
    }

    #[test]
    fn arithmetic_skips_nulls_in_sums() {
        assert_eq!(Scalar::Int(3).mul(&Scalar::Int(100)), Scalar::Int(300));
        assert!(Scalar::Int(3).mul(&Scalar::Null).is_null());
        assert_eq!(Scalar::Int(300).add(&Scalar::Null), Scalar::Int(300));
        assert_eq!(Scalar::Int(1).add(&Scalar::number(0.5)), Scalar::number(1.5));
    }

    #[test]
    fn push_row_pads_short_rows() {
        let mut t = Table::new(["a", "b"]);
        t.push_row(vec![Scalar::Int(1)]);
        assert_eq!(t.rows()[0], vec![Scalar::Int(1), Scalar::Null]);
    }
}

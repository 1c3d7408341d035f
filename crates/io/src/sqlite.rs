// SQLite-backed report data source

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use steep_recon::{DataSource, ReportError, Scalar, Table};
use tracing::debug;

/// Read-only SQLite store. A connection is opened for each fetch and closed
/// when it returns, so no handle outlives a report run.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, ReportError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ReportError::DataSource(format!("cannot open {}: {e}", self.path.display())))
    }
}

impl DataSource for SqliteSource {
    fn fetch(&self, statement: &str) -> Result<Table, ReportError> {
        let conn = self.connect()?;
        let query_err = |e: rusqlite::Error| ReportError::DataSource(format!("query failed: {e}"));

        let mut stmt = conn.prepare(statement).map_err(query_err)?;
        if !stmt.readonly() {
            return Err(ReportError::DataSource("refusing to run a statement that writes".into()));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();
        let mut table = Table::new(columns);

        let mut rows = stmt.query([]).map_err(query_err)?;
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(query_err)?;
                values.push(value_to_scalar(value));
            }
            table.push_row(values);
        }

        debug!(rows = table.len(), path = %self.path.display(), "sqlite fetch");
        Ok(table)
    }
}

fn value_to_scalar(value: ValueRef<'_>) -> Scalar {
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(n) => Scalar::Int(n),
        ValueRef::Real(n) => Scalar::number(n),
        ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Scalar::Text(format!("<blob {} bytes>", bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> PathBuf {
        let path = dir.join("store.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE tea_catalog (code TEXT, tea_name TEXT, grams REAL);
            INSERT INTO tea_catalog VALUES ('A', 'Assam', 100.0);
            INSERT INTO tea_catalog VALUES ('B', NULL, 2.5);
            INSERT INTO tea_catalog VALUES (7, 'Seven', NULL);
            "#,
        )
        .unwrap();
        path
    }

    #[test]
    fn fetch_maps_sqlite_types() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteSource::new(store(dir.path()));
        let table = source
            .fetch("SELECT code, tea_name, grams FROM tea_catalog ORDER BY rowid")
            .unwrap();

        assert_eq!(table.columns(), ["code", "tea_name", "grams"]);
        assert_eq!(
            table.rows(),
            &[
                vec![Scalar::text("A"), Scalar::text("Assam"), Scalar::number(100.0)],
                vec![Scalar::text("B"), Scalar::Null, Scalar::number(2.5)],
                vec![Scalar::Int(7), Scalar::text("Seven"), Scalar::Null],
            ]
        );
    }

    #[test]
    fn writes_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteSource::new(store(dir.path()));
        let err = source.fetch("DELETE FROM tea_catalog").unwrap_err();
        assert!(matches!(err, ReportError::DataSource(_)));
    }

    #[test]
    fn bad_query_and_missing_db_are_data_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteSource::new(store(dir.path()));
        let err = source.fetch("SELECT nope FROM tea_catalog").unwrap_err();
        assert!(err.to_string().starts_with("data source error: query failed"));

        let missing = SqliteSource::new(dir.path().join("absent.sqlite"));
        let err = missing.fetch("SELECT 1").unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }
}

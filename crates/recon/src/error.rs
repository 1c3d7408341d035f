use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    /// TOML parse, validation, or registry lookup failure.
    Config(String),
    /// Input file is unreadable or has an unsupported extension.
    Input(String),
    /// Required columns are absent from a source (`input` or `store`).
    Schema { source: String, columns: Vec<String> },
    /// A key field value has no usable key form.
    KeyParse { field: String, value: String },
    /// Connection or query failure against the relational store.
    DataSource(String),
    /// Output artifact cannot be created or written.
    Export(String),
}

impl ReportError {
    pub fn missing_columns(source: &str, columns: Vec<String>) -> Self {
        Self::Schema { source: source.into(), columns }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Input(msg) => write!(f, "input error: {msg}"),
            Self::Schema { source, columns } => {
                let quoted: Vec<String> = columns.iter().map(|c| format!("'{c}'")).collect();
                write!(f, "{source}: missing column(s) {}", quoted.join(", "))
            }
            Self::KeyParse { field, value } => {
                write!(f, "field '{field}': cannot parse key from '{value}'")
            }
            Self::DataSource(msg) => write!(f, "data source error: {msg}"),
            Self::Export(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for ReportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_column() {
        let err = ReportError::missing_columns("input", vec!["Product SKU".into(), "Option 1".into()]);
        assert_eq!(
            err.to_string(),
            "input: missing column(s) 'Product SKU', 'Option 1'"
        );
    }
}

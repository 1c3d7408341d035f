//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract: scripts branch on them.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad args, no config selected)        |
//! | 3    | Config error (parse, validation, unknown name)    |
//! | 4    | Schema error (required columns missing)           |
//! | 5    | Key parse error (composite key without a number)  |
//! | 6    | Data source error (store unreachable, bad query)  |
//! | 7    | Export error (report file cannot be written)      |
//! | 8    | Input error (unreadable or non-Excel input file)  |

use steep_recon::ReportError;

pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

pub const EXIT_USAGE: u8 = 2;

pub const EXIT_CONFIG: u8 = 3;

pub const EXIT_SCHEMA: u8 = 4;

pub const EXIT_KEY_PARSE: u8 = 5;

pub const EXIT_DATA_SOURCE: u8 = 6;

pub const EXIT_EXPORT: u8 = 7;

pub const EXIT_INPUT: u8 = 8;

/// Map a `ReportError` to its exit code.
pub fn report_exit_code(err: &ReportError) -> u8 {
    match err {
        ReportError::Config(_) => EXIT_CONFIG,
        ReportError::Input(_) => EXIT_INPUT,
        ReportError::Schema { .. } => EXIT_SCHEMA,
        ReportError::KeyParse { .. } => EXIT_KEY_PARSE,
        ReportError::DataSource(_) => EXIT_DATA_SOURCE,
        ReportError::Export(_) => EXIT_EXPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_class_has_its_own_code() {
        let errors = [
            ReportError::Config("x".into()),
            ReportError::Input("x".into()),
            ReportError::missing_columns("input", vec!["a".into()]),
            ReportError::KeyParse {
                field: "f".into(),
                value: "v".into(),
            },
            ReportError::DataSource("x".into()),
            ReportError::Export("x".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(report_exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes, [3, 4, 5, 6, 7, 8]);
        assert!(!codes.contains(&EXIT_ERROR));
        assert!(!codes.contains(&EXIT_USAGE));
    }
}

// File and store IO around the report engine

pub mod report;
pub mod sqlite;
pub mod xlsx;

pub use report::generate_report;
pub use sqlite::SqliteSource;
pub use xlsx::{read_first_sheet, write_workbook};

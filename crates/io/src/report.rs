// End-to-end report generation: Excel in, store query, Excel out

use std::path::{Path, PathBuf};

use steep_recon::{DataSource, ReportBook, ReportConfig, ReportError};
use tracing::info;

use crate::xlsx::{read_first_sheet, write_workbook};

/// Read `input`, run `config` against `source` and write the workbook into
/// `out_dir`. Returns the written path together with the in-memory report.
///
/// Nothing is written unless every earlier stage succeeded.
pub fn generate_report(
    input: &Path,
    out_dir: &Path,
    config: &ReportConfig,
    source: &dyn DataSource,
) -> Result<(PathBuf, ReportBook), ReportError> {
    let raw = read_first_sheet(input)?;
    let book = steep_recon::run(config, &raw, source)?;
    let path = write_workbook(&book.sheets, out_dir, &book.meta.output_name)?;
    info!(config = %config.name, path = %path.display(), "report generated");
    Ok((path, book))
}

// Excel import (uploaded sales sheet) and export (report workbook)

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};
use steep_recon::model::ReportSheet;
use steep_recon::{ReportError, Scalar, Table};
use tracing::{info, warn};

/// Upload formats accepted for the input sheet.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["xlsx", "xlsm", "xls"];

/// Reject anything that is not an Excel workbook before touching the file.
pub fn check_extension(path: &Path) -> Result<(), ReportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ReportError::Input(format!(
            "{}: expected an Excel file (.xlsx/.xlsm/.xls)",
            path.display()
        )))
    }
}

/// Read the first worksheet. Row 1 supplies the column names; fully blank
/// rows are skipped.
pub fn read_first_sheet(path: &Path) -> Result<Table, ReportError> {
    check_extension(path)?;

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| ReportError::Input(format!("failed to open {}: {e}", path.display())))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::Input(format!("{} contains no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ReportError::Input(format!("failed to read sheet '{first}': {e}")))?;

    // The range starts at the first non-empty cell; a blank row 1 means no header
    if range.start().is_some_and(|(row, _)| row != 0) {
        warn!(sheet = %first, "row 1 is blank; input has no header row");
        return Ok(Table::default());
    }

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        info!(sheet = %first, "input sheet is empty");
        return Ok(Table::default());
    };

    let columns: Vec<String> = header.iter().map(|cell| cell_to_scalar(cell).to_string()).collect();
    let mut table = Table::new(columns);
    for row in rows {
        let values: Vec<Scalar> = row.iter().map(cell_to_scalar).collect();
        if values.iter().all(is_blank) {
            continue;
        }
        table.push_row(values);
    }

    info!(sheet = %first, rows = table.len(), "read input sheet");
    Ok(table)
}

fn cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty => Scalar::Null,
        Data::String(s) => Scalar::Text(s.clone()),
        Data::Float(n) => Scalar::number(*n),
        Data::Int(n) => Scalar::Int(*n),
        // Stored as TRUE/FALSE text, matching how Excel displays them
        Data::Bool(b) => Scalar::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Scalar::Text(format!("#{:?}", e)),
        // Serial number; the 1900 date system is assumed
        Data::DateTime(dt) => Scalar::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Scalar::Text(s.clone()),
    }
}

fn is_blank(value: &Scalar) -> bool {
    match value {
        Scalar::Null => true,
        Scalar::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Excel keeps 15 significant digits; larger integers are written as text.
fn exceeds_excel_precision(n: f64) -> bool {
    n.is_finite() && n.trunc().abs() >= 1e15
}

/// Write `sheets` into `<out_dir>/<output_name>.xlsx`, one worksheet each,
/// bold header row first and columns sized to their content.
///
/// The workbook is rendered in memory and moved into place only once fully
/// written, so a failure never leaves a partial artifact behind.
pub fn write_workbook(
    sheets: &[ReportSheet],
    out_dir: &Path,
    output_name: &str,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| ReportError::Export(format!("cannot create {}: {e}", out_dir.display())))?;

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_border_bottom(FormatBorder::Thin);

    for sheet in sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| ReportError::Export(format!("failed to create sheet '{}': {e}", sheet.name)))?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|e| ReportError::Export(format!("failed to render workbook: {e}")))?;

    let path = out_dir.join(format!("{output_name}.xlsx"));
    let partial = out_dir.join(format!(".{output_name}.xlsx.part"));
    let written = std::fs::write(&partial, &buffer).and_then(|()| std::fs::rename(&partial, &path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(ReportError::Export(format!("cannot write {}: {e}", path.display())));
    }

    info!(path = %path.display(), sheets = sheets.len(), "wrote report workbook");
    Ok(path)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ReportSheet, header_format: &Format) -> Result<(), ReportError> {
    let cell_err = |row: u32, col: u16, e: rust_xlsxwriter::XlsxError| {
        ReportError::Export(format!("sheet '{}', cell ({row}, {col}): {e}", sheet.name))
    };

    for (col, header) in sheet.headers.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, header, header_format)
            .map_err(|e| cell_err(0, col, e))?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let row32 = row_idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            let written = match value {
                Scalar::Null => continue,
                Scalar::Text(s) => worksheet.write_string(row32, col16, s),
                Scalar::Int(n) if exceeds_excel_precision(*n as f64) => {
                    worksheet.write_string(row32, col16, n.to_string())
                }
                Scalar::Int(n) => worksheet.write_number(row32, col16, *n as f64),
                Scalar::Number(n) if n.is_finite() && !exceeds_excel_precision(n.0) => {
                    worksheet.write_number(row32, col16, n.0)
                }
                Scalar::Number(_) => worksheet.write_string(row32, col16, value.to_string()),
            };
            written.map_err(|e| cell_err(row32, col16, e))?;
        }
    }

    for (col, width) in sheet.column_widths().into_iter().enumerate() {
        worksheet
            .set_column_width(col as u16, width as f64)
            .map_err(|e| cell_err(0, col as u16, e))?;
    }
    Ok(())
}

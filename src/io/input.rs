use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::models::{CellValue, Table};

/// Load the first sheet of a spreadsheet (xlsx, xls, xlsb, ods) as a table.
///
/// The first row becomes the header. Trailing blank rows are dropped.
pub fn read_table(path: &Path, name: &str) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::Spreadsheet {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::EmptyWorkbook(path.to_path_buf()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReportError::Spreadsheet {
            path: path.to_path_buf(),
            reason: format!("sheet '{}': {}", sheet_name, e),
        })?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| cell_value(c).display().trim().to_string()).collect())
        .unwrap_or_default();

    let mut table = Table::new(name, headers);
    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(cell_value).collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(cells);
    }

    debug!(
        "Loaded {} rows x {} columns from {:?} (sheet '{}')",
        table.len(),
        table.headers.len(),
        path,
        sheet_name
    );

    Ok(table)
}

/// Convert a calamine cell into a pipeline cell
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(_) => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::models::{CellValue, Table};

/// Column that holds the position code in every report
pub const POSITION_CODE_COLUMN: u16 = 1;

/// Extra width added to the longest value of each column
const COLUMN_PADDING: usize = 2;

/// Write a table as the only sheet of a new workbook, replacing any existing file.
///
/// The header row is bold and bordered, every column is sized to its longest
/// rendered value, and the position-code column is stored as text.
pub fn write_table(table: &Table, sheet_name: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let wrap = |source: XlsxError| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name(sheet_name).map_err(wrap)?;
    fill_worksheet(worksheet, table).map_err(wrap)?;
    workbook.save(path).map_err(wrap)?;
    Ok(())
}

fn fill_worksheet(worksheet: &mut Worksheet, table: &Table) -> std::result::Result<(), XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let text_format = Format::new().set_num_format("@");

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            if col16 == POSITION_CODE_COLUMN {
                worksheet.write_string_with_format(row32, col16, cell.display(), &text_format)?;
                continue;
            }
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
            }
        }
    }

    for (col, width) in column_widths(table).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// Width of each column: longest rendered cell or header, in characters, plus padding
pub fn column_widths(table: &Table) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let longest_cell = table
                .rows
                .iter()
                .map(|row| table.cell(row, col).display().chars().count())
                .max()
                .unwrap_or(0);
            longest_cell.max(header.chars().count()) + COLUMN_PADDING
        })
        .collect()
}

/// Whether a stage produced its output in this run or reused an earlier file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Computed,
    Reused,
}

/// Per-stage entry of the run summary
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub status: StageStatus,
    pub output: PathBuf,
    /// Data rows in the output sheet
    pub rows: usize,
}

/// Machine-readable record of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub stages: Vec<StageSummary>,
}

impl RunSummary {
    pub fn new(stages: Vec<StageSummary>) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            stages,
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::columns::*;
use crate::models::{CellValue, PostingKey, Table};

/// One row of the score comparison report
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComparisonRow {
    pub key: PostingKey,
    pub department: CellValue,
    pub title: CellValue,
    pub original_count: usize,
    pub original_score: CellValue,
    pub backfill_count: usize,
    /// Placeholder text when the posting had no backfill
    pub backfill_score: CellValue,
    /// Signed three-decimal delta, or the placeholder
    pub delta: String,
}

impl ScoreComparisonRow {
    pub const HEADERS: [&'static str; 9] = [
        AUTHORITY,
        POSITION_CODE,
        DEPARTMENT,
        POSITION_TITLE,
        ORIGINAL_COUNT,
        MIN_INTERVIEW_SCORE,
        BACKFILL_COUNT,
        BACKFILL_MIN_SCORE,
        SCORE_DELTA,
    ];

    pub fn to_cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.key.authority),
            CellValue::text(&self.key.code),
            self.department.clone(),
            self.title.clone(),
            self.original_count.into(),
            self.original_score.clone(),
            self.backfill_count.into(),
            self.backfill_score.clone(),
            CellValue::text(&self.delta),
        ]
    }

    /// Cells used for a posting that only appears in the admission report
    fn placeholder_cells(key: &PostingKey) -> Vec<CellValue> {
        vec![
            CellValue::text(&key.authority),
            CellValue::text(&key.code),
            PLACEHOLDER.into(),
            PLACEHOLDER.into(),
            0usize.into(),
            PLACEHOLDER.into(),
            0usize.into(),
            PLACEHOLDER.into(),
            PLACEHOLDER.into(),
        ]
    }
}

/// One row of the backfill admission report
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRow {
    pub key: PostingKey,
    pub department: CellValue,
    pub recruiting_title: CellValue,
    pub hired_count: usize,
    /// Names joined with [`NAME_DELIMITER`] in encounter order
    pub hired_names: String,
}

impl AdmissionRow {
    pub const HEADERS: [&'static str; 6] = [
        AUTHORITY,
        POSITION_CODE,
        DEPARTMENT,
        RECRUITING_TITLE,
        HIRED_COUNT,
        HIRED_NAMES,
    ];

    pub fn to_cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.key.authority),
            CellValue::text(&self.key.code),
            self.department.clone(),
            self.recruiting_title.clone(),
            self.hired_count.into(),
            CellValue::text(&self.hired_names),
        ]
    }
}

/// One row of the consolidated cross analysis
#[derive(Debug, Clone, PartialEq)]
pub struct CrossRow {
    pub key: PostingKey,
    /// `None` when the posting only appears in the admission report
    pub score: Option<ScoreComparisonRow>,
    /// Zero when the posting only appears in the score report
    pub hired_count: usize,
    pub hired_names: Option<String>,
}

impl CrossRow {
    pub const HEADERS: [&'static str; 11] = [
        AUTHORITY,
        POSITION_CODE,
        DEPARTMENT,
        POSITION_TITLE,
        ORIGINAL_COUNT,
        MIN_INTERVIEW_SCORE,
        BACKFILL_COUNT,
        BACKFILL_MIN_SCORE,
        SCORE_DELTA,
        HIRED_COUNT,
        HIRED_NAMES,
    ];

    /// Cells in header order. Blank cells, matched or not, become the placeholder.
    pub fn to_cells(&self) -> Vec<CellValue> {
        let mut cells = match &self.score {
            Some(score) => score.to_cells(),
            None => ScoreComparisonRow::placeholder_cells(&self.key),
        };
        cells.push(self.hired_count.into());
        cells.push(CellValue::text(
            self.hired_names.as_deref().unwrap_or(PLACEHOLDER),
        ));

        for cell in &mut cells {
            if cell.is_empty() {
                *cell = CellValue::text(PLACEHOLDER);
            }
        }
        cells
    }
}

/// Build an output table from report rows
pub fn to_table<R>(
    name: &str,
    headers: &[&str],
    rows: &[R],
    to_cells: impl Fn(&R) -> Vec<CellValue>,
) -> Table {
    let mut table = Table::with_headers(name, headers);
    for row in rows {
        table.push_row(to_cells(row));
    }
    table
}

/// Read a persisted score comparison report back into rows, keyed by posting
pub fn score_rows_from_table(table: &Table) -> Result<BTreeMap<PostingKey, ScoreComparisonRow>> {
    let [authority, code, department, title, original_count, original_score, backfill_count, backfill_score, delta] =
        column_indices(table, &ScoreComparisonRow::HEADERS)?;

    let mut rows = BTreeMap::new();
    for row in &table.rows {
        let key = PostingKey::new(
            table.cell(row, authority).display(),
            table.cell(row, code).display(),
        );
        let parsed = ScoreComparisonRow {
            key: key.clone(),
            department: table.cell(row, department).clone(),
            title: table.cell(row, title).clone(),
            original_count: table.cell(row, original_count).as_count().unwrap_or(0),
            original_score: table.cell(row, original_score).clone(),
            backfill_count: table.cell(row, backfill_count).as_count().unwrap_or(0),
            backfill_score: table.cell(row, backfill_score).clone(),
            delta: table.cell(row, delta).display(),
        };
        rows.entry(key).or_insert(parsed);
    }
    Ok(rows)
}

/// Read a persisted admission report back into (hired count, hired names) per posting
pub fn hired_from_table(table: &Table) -> Result<BTreeMap<PostingKey, (usize, String)>> {
    let authority = table.column(AUTHORITY)?;
    let code = table.column(POSITION_CODE)?;
    let count = table.column(HIRED_COUNT)?;
    let names = table.column(HIRED_NAMES)?;

    let mut hired = BTreeMap::new();
    for row in &table.rows {
        let key = PostingKey::new(
            table.cell(row, authority).display(),
            table.cell(row, code).display(),
        );
        let entry = (
            table.cell(row, count).as_count().unwrap_or(0),
            table.cell(row, names).display(),
        );
        hired.entry(key).or_insert(entry);
    }
    Ok(hired)
}

fn column_indices<const N: usize>(table: &Table, headers: &[&str; N]) -> Result<[usize; N]> {
    let mut indices = [0usize; N];
    for (slot, header) in indices.iter_mut().zip(headers.iter()) {
        *slot = table.column(header)?;
    }
    Ok(indices)
}

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::columns::*;
use crate::models::{CellValue, PostingKey, ScoreComparisonRow, Table};

/// Configuration for Stage 1 score comparison
#[derive(Debug, Clone)]
pub struct Stage1Config {
    /// Original-roster rows are kept only when their department contains this marker
    pub authority_marker: String,
}

impl Default for Stage1Config {
    fn default() -> Self {
        Self {
            authority_marker: "国家金融监督管理".to_string(),
        }
    }
}

/// Result of Stage 1 score comparison
#[derive(Debug)]
pub struct Stage1Result {
    /// One row per original posting, ordered by posting key
    pub rows: Vec<ScoreComparisonRow>,
    /// Original-roster rows that passed the authority filter
    pub original_rows_kept: usize,
    /// Postings with at least one backfill candidate
    pub postings_with_backfill: usize,
    /// Rows of either roster skipped for a blank authority or position code
    pub rows_without_key: usize,
}

/// First non-empty metadata of an original posting plus its candidate count
#[derive(Debug, Default)]
struct OriginalPosting {
    department: CellValue,
    title: CellValue,
    min_score: CellValue,
    count: usize,
}

/// Backfill candidate count and first non-empty backfill score of a posting
#[derive(Debug, Default)]
struct BackfillPosting {
    min_score: CellValue,
    count: usize,
}

/// Execute Stage 1: Score comparison
///
/// 1. Filters the original roster to the configured authority
/// 2. Groups both rosters by posting key, taking the first non-empty value of
///    each metadata column and skipping rows with a blank key
/// 3. Left-joins backfill counts and scores onto every original posting
/// 4. Computes the signed score delta
pub fn execute_stage1(
    original: &Table,
    backfill: &Table,
    config: &Stage1Config,
) -> Result<Stage1Result> {
    let (originals, original_rows_kept, original_without_key) = group_original(original, config)?;
    let (backfills, backfill_without_key) = group_backfill(backfill)?;

    let rows_without_key = original_without_key + backfill_without_key;
    if rows_without_key > 0 {
        warn!(
            "Stage 1: skipped {} original and {} backfill rows with a blank authority or position code",
            original_without_key, backfill_without_key
        );
    }

    debug!(
        "Stage 1: {} original postings, {} backfill postings",
        originals.len(),
        backfills.len()
    );

    let mut postings_with_backfill = 0;
    let rows: Vec<ScoreComparisonRow> = originals
        .into_iter()
        .map(|(key, posting)| {
            let (backfill_count, backfill_score) = match backfills.get(&key) {
                Some(b) => {
                    postings_with_backfill += 1;
                    (b.count, b.min_score.clone())
                }
                None => (0, CellValue::text(PLACEHOLDER)),
            };
            let delta = score_delta(&posting.min_score, &backfill_score);

            ScoreComparisonRow {
                key,
                department: posting.department,
                title: posting.title,
                original_count: posting.count,
                original_score: posting.min_score,
                backfill_count,
                backfill_score,
                delta,
            }
        })
        .collect();

    info!(
        "Stage 1: {} postings compared ({} with backfill) from {} original rows",
        rows.len(),
        postings_with_backfill,
        original_rows_kept
    );

    Ok(Stage1Result {
        rows,
        original_rows_kept,
        postings_with_backfill,
        rows_without_key,
    })
}

/// Group the filtered original roster by posting key.
///
/// Returns the postings, the rows that passed the filter, and how many of
/// those had no usable key.
fn group_original(
    table: &Table,
    config: &Stage1Config,
) -> Result<(BTreeMap<PostingKey, OriginalPosting>, usize, usize)> {
    let authority = table.column(AUTHORITY)?;
    let code = table.column(POSITION_CODE)?;
    let department = table.column(DEPARTMENT)?;
    let title = table.column(POSITION_TITLE)?;
    let min_score = table.column(MIN_INTERVIEW_SCORE)?;

    let mut postings: BTreeMap<PostingKey, OriginalPosting> = BTreeMap::new();
    let mut kept = 0;
    let mut without_key = 0;

    for row in &table.rows {
        let dept = table.cell(row, department);
        if !dept.display().contains(config.authority_marker.as_str()) {
            continue;
        }
        kept += 1;

        let Some(key) = PostingKey::from_cells(table.cell(row, authority), table.cell(row, code))
        else {
            without_key += 1;
            continue;
        };

        let posting = postings.entry(key).or_default();
        posting.count += 1;
        posting.department.fill_from(dept);
        posting.title.fill_from(table.cell(row, title));
        posting.min_score.fill_from(table.cell(row, min_score));
    }

    Ok((postings, kept, without_key))
}

/// Group the backfill roster by posting key, its department name standing in for the authority
fn group_backfill(table: &Table) -> Result<(BTreeMap<PostingKey, BackfillPosting>, usize)> {
    let authority = table.column(BACKFILL_AUTHORITY)?;
    let code = table.column(POSITION_CODE)?;
    let min_score = table.column(BACKFILL_MIN_SCORE)?;

    let mut postings: BTreeMap<PostingKey, BackfillPosting> = BTreeMap::new();
    let mut without_key = 0;
    for row in &table.rows {
        let Some(key) = PostingKey::from_cells(table.cell(row, authority), table.cell(row, code))
        else {
            without_key += 1;
            continue;
        };

        let posting = postings.entry(key).or_default();
        posting.count += 1;
        posting.min_score.fill_from(table.cell(row, min_score));
    }

    Ok((postings, without_key))
}

/// Signed backfill-minus-original delta with three decimals, or the placeholder
pub fn score_delta(original: &CellValue, backfill: &CellValue) -> String {
    match (original.as_number(), backfill.as_number()) {
        (Some(original), Some(backfill)) => format!("{:+.3}", backfill - original),
        _ => PLACEHOLDER.to_string(),
    }
}

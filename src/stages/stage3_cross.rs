use std::collections::BTreeSet;

use tracing::info;

use crate::error::Result;
use crate::models::{hired_from_table, score_rows_from_table, CrossRow, Table};

/// Result of Stage 3 cross analysis
#[derive(Debug)]
pub struct Stage3Result {
    /// One row per posting present in either report, ordered by posting key
    pub rows: Vec<CrossRow>,
    /// Postings present in both reports
    pub matched: usize,
    pub score_only: usize,
    pub admission_only: usize,
}

/// Execute Stage 3: Cross analysis
///
/// Full outer join of the persisted score comparison report with the hired
/// count and names of the persisted admission report. Postings missing from
/// the admission report get a zero hired count.
pub fn execute_stage3(score_report: &Table, admission_report: &Table) -> Result<Stage3Result> {
    let mut scores = score_rows_from_table(score_report)?;
    let mut hired = hired_from_table(admission_report)?;

    let keys: BTreeSet<_> = scores.keys().chain(hired.keys()).cloned().collect();

    let mut matched = 0;
    let mut score_only = 0;
    let mut admission_only = 0;

    let rows: Vec<CrossRow> = keys
        .into_iter()
        .map(|key| {
            let score = scores.remove(&key);
            let hires = hired.remove(&key);
            match (&score, &hires) {
                (Some(_), Some(_)) => matched += 1,
                (Some(_), None) => score_only += 1,
                _ => admission_only += 1,
            }
            let (hired_count, hired_names) = match hires {
                Some((count, names)) => (count, Some(names)),
                None => (0, None),
            };
            CrossRow {
                key,
                score,
                hired_count,
                hired_names,
            }
        })
        .collect();

    info!(
        "Stage 3: {} postings ({} in both reports, {} score only, {} admission only)",
        rows.len(),
        matched,
        score_only,
        admission_only
    );

    Ok(Stage3Result {
        rows,
        matched,
        score_only,
        admission_only,
    })
}

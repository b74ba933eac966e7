use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::io::{read_table, write_table, RunSummary, StageStatus, StageSummary};
use crate::models::columns::{BACKFILL_AUTHORITY, POSITION_CODE};
use crate::models::{to_table, AdmissionRow, CrossRow, PostingKey, ScoreComparisonRow, Table};
use crate::stages::{execute_stage1, execute_stage2, execute_stage3, Stage1Config};

const ORIGINAL_ROSTER: &str = "original roster";
const BACKFILL_ROSTER: &str = "backfill roster";
const ADMISSION_ROSTER: &str = "admission roster";
const SCORE_REPORT: &str = "score comparison report";
const ADMISSION_REPORT: &str = "admission report";
const CROSS_REPORT: &str = "cross analysis report";

/// What to do with a stage output that already exists on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    /// Keep an existing output file and skip the stage
    #[default]
    Reuse,
    /// Always regenerate
    Recompute,
}

/// Input rosters, output locations and stage settings for one run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub original_path: PathBuf,
    pub backfill_path: PathBuf,
    pub admission_path: PathBuf,
    /// Created if missing
    pub output_dir: PathBuf,
    pub score_report_file: String,
    pub admission_report_file: String,
    pub cross_report_file: String,
    /// Applies to the score comparison and admission reports; the cross
    /// analysis is always regenerated
    pub reuse: ReusePolicy,
    pub summary_path: Option<PathBuf>,
    pub stage1: Stage1Config,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            original_path: PathBuf::from("2024全国进面名单.xlsx"),
            backfill_path: PathBuf::from("2024递补面试名单.xls"),
            admission_path: PathBuf::from("2024录用名单.xls"),
            output_dir: PathBuf::from("result"),
            score_report_file: "2024年分数线对比结果.xlsx".to_string(),
            admission_report_file: "2024年递补录用情况.xlsx".to_string(),
            cross_report_file: "2024年递补分析汇总.xlsx".to_string(),
            reuse: ReusePolicy::default(),
            summary_path: None,
            stage1: Stage1Config::default(),
        }
    }
}

impl PipelineConfig {
    pub fn score_report_path(&self) -> PathBuf {
        self.output_dir.join(&self.score_report_file)
    }

    pub fn admission_report_path(&self) -> PathBuf {
        self.output_dir.join(&self.admission_report_file)
    }

    pub fn cross_report_path(&self) -> PathBuf {
        self.output_dir.join(&self.cross_report_file)
    }
}

/// Sheet names of the three reports
pub const SCORE_SHEET: &str = "进面分数线情况";
pub const ADMISSION_SHEET: &str = "递补录用情况";
pub const CROSS_SHEET: &str = "递补分析汇总";

/// Outcome of a pipeline run
#[derive(Debug)]
pub struct PipelineResult {
    pub stages: Vec<StageSummary>,
    /// Rows of the final cross analysis
    pub cross_rows: Vec<CrossRow>,
}

/// Run all three stages.
///
/// The score comparison and admission reports are skipped when they already
/// exist and the policy is [`ReusePolicy::Reuse`]. The cross analysis always
/// reads both reports back from disk and is always rewritten.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineResult> {
    std::fs::create_dir_all(&config.output_dir)?;

    let mut backfill: Option<Table> = None;
    let mut stages = Vec::with_capacity(3);

    // Stage 1: score comparison
    let score_path = config.score_report_path();
    let stage1 = if let Some(summary) = try_reuse("score_comparison", &score_path, config.reuse)? {
        summary
    } else {
        info!("Stage 1: Comparing interview score thresholds...");
        let original = read_table(&config.original_path, ORIGINAL_ROSTER)?;
        let backfill = cached(&mut backfill, &config.backfill_path, BACKFILL_ROSTER)?;
        let result = execute_stage1(&original, backfill, &config.stage1)?;
        let table = to_table(SCORE_REPORT, &ScoreComparisonRow::HEADERS, &result.rows, |r| {
            r.to_cells()
        });
        write_table(&table, SCORE_SHEET, &score_path)?;
        info!("Score comparison written to {:?}", score_path);
        computed("score_comparison", &score_path, result.rows.len())
    };
    stages.push(stage1);

    // Stage 2: backfill admission matching
    let admission_path = config.admission_report_path();
    let stage2 = if let Some(summary) = try_reuse("backfill_admission", &admission_path, config.reuse)? {
        summary
    } else {
        info!("Stage 2: Matching backfill candidates against admissions...");
        let backfill = cached(&mut backfill, &config.backfill_path, BACKFILL_ROSTER)?;
        let admission = read_table(&config.admission_path, ADMISSION_ROSTER)?;
        let result = execute_stage2(backfill, &admission)?;
        let table = to_table(ADMISSION_REPORT, &AdmissionRow::HEADERS, &result.rows, |r| {
            r.to_cells()
        });
        write_table(&table, ADMISSION_SHEET, &admission_path)?;
        info!("Admission report written to {:?}", admission_path);
        computed("backfill_admission", &admission_path, result.rows.len())
    };
    stages.push(stage2);

    // Stage 3: cross analysis over the persisted reports
    info!("Stage 3: Cross-analyzing reports...");
    let score_report = read_table(&score_path, SCORE_REPORT)?;
    let admission_report = read_table(&admission_path, ADMISSION_REPORT)?;
    let result = execute_stage3(&score_report, &admission_report)?;
    let cross_path = config.cross_report_path();
    let table = to_table(CROSS_REPORT, &CrossRow::HEADERS, &result.rows, |r| r.to_cells());
    write_table(&table, CROSS_SHEET, &cross_path)?;
    info!("Cross analysis written to {:?}", cross_path);
    stages.push(computed("cross_analysis", &cross_path, result.rows.len()));

    if let Some(path) = &config.summary_path {
        RunSummary::new(stages.clone()).write_json(path)?;
        info!("Run summary written to {:?}", path);
    }

    Ok(PipelineResult {
        stages,
        cross_rows: result.rows,
    })
}

/// Summary for a reused output, or `None` when the stage has to run
fn try_reuse(stage: &str, path: &Path, policy: ReusePolicy) -> Result<Option<StageSummary>> {
    if policy == ReusePolicy::Recompute || !path.exists() {
        return Ok(None);
    }
    let rows = read_table(path, stage)?.len();
    warn!(
        "Reusing existing {} output {:?} ({} rows); pass --recompute to regenerate",
        stage, path, rows
    );
    Ok(Some(StageSummary {
        stage: stage.to_string(),
        status: StageStatus::Reused,
        output: path.to_path_buf(),
        rows,
    }))
}

fn computed(stage: &str, path: &Path, rows: usize) -> StageSummary {
    StageSummary {
        stage: stage.to_string(),
        status: StageStatus::Computed,
        output: path.to_path_buf(),
        rows,
    }
}

/// Load a roster once and hand out the cached copy afterwards
fn cached<'a>(slot: &'a mut Option<Table>, path: &Path, name: &str) -> Result<&'a Table> {
    let table = match slot.take() {
        Some(table) => table,
        None => read_table(path, name)?,
    };
    Ok(slot.insert(table))
}

/// Read-only statistics over the three input rosters
#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub original_rows: usize,
    /// Original rows passing the authority filter
    pub original_rows_kept: usize,
    pub original_postings: usize,
    pub backfill_rows: usize,
    pub backfill_postings: usize,
    /// Compared postings that received backfill candidates
    pub postings_with_backfill: usize,
    pub admission_rows: usize,
    pub admission_rows_without_code: usize,
    pub hired_backfill_postings: usize,
    pub hired_backfill_candidates: usize,
}

/// Gather statistics about the input rosters without writing anything
pub fn inspect(
    original_path: &Path,
    backfill_path: &Path,
    admission_path: &Path,
    stage1: &Stage1Config,
) -> Result<InspectReport> {
    let original = read_table(original_path, ORIGINAL_ROSTER)?;
    let backfill = read_table(backfill_path, BACKFILL_ROSTER)?;
    let admission = read_table(admission_path, ADMISSION_ROSTER)?;

    let compared = execute_stage1(&original, &backfill, stage1)?;
    let matched = execute_stage2(&backfill, &admission)?;

    let bf_authority = backfill.column(BACKFILL_AUTHORITY)?;
    let bf_code = backfill.column(POSITION_CODE)?;
    let backfill_postings: BTreeSet<PostingKey> = backfill
        .rows
        .iter()
        .filter_map(|row| {
            PostingKey::from_cells(backfill.cell(row, bf_authority), backfill.cell(row, bf_code))
        })
        .collect();

    Ok(InspectReport {
        original_rows: original.len(),
        original_rows_kept: compared.original_rows_kept,
        original_postings: compared.rows.len(),
        backfill_rows: backfill.len(),
        backfill_postings: backfill_postings.len(),
        postings_with_backfill: compared.postings_with_backfill,
        admission_rows: admission.len(),
        admission_rows_without_code: matched.admission_rows_without_code,
        hired_backfill_postings: matched.rows.len(),
        hired_backfill_candidates: matched.matched_candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns::*;
    use crate::models::CellValue;
    use rust_xlsxwriter::Workbook;

    const AUTHORITY_A: &str = "国家金融监督管理总局北京监管局";

    fn write_xlsx(path: &Path, headers: &[&str], rows: &[Vec<CellValue>]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(s) => {
                        sheet.write_string(r as u32 + 1, c as u16, s).unwrap();
                    }
                    CellValue::Number(n) => {
                        sheet.write_number(r as u32 + 1, c as u16, *n).unwrap();
                    }
                }
            }
        }
        workbook.save(path).unwrap();
    }

    /// Two compared postings (one with backfill), one backfill-only posting,
    /// and admissions hiring one backfill candidate in each backfill posting.
    fn write_inputs(dir: &Path) -> PipelineConfig {
        let config = PipelineConfig {
            original_path: dir.join("original.xlsx"),
            backfill_path: dir.join("backfill.xlsx"),
            admission_path: dir.join("admission.xlsx"),
            output_dir: dir.join("result"),
            ..Default::default()
        };

        write_xlsx(
            &config.original_path,
            &[AUTHORITY, POSITION_CODE, DEPARTMENT, POSITION_TITLE, NAME, MIN_INTERVIEW_SCORE],
            &[
                vec![
                    AUTHORITY_A.into(),
                    "410100100001".into(),
                    AUTHORITY_A.into(),
                    "一级主任科员".into(),
                    "甲".into(),
                    CellValue::Number(82.5),
                ],
                vec![
                    AUTHORITY_A.into(),
                    "410100100001".into(),
                    AUTHORITY_A.into(),
                    "一级主任科员".into(),
                    "乙".into(),
                    CellValue::Number(82.5),
                ],
                vec![
                    AUTHORITY_A.into(),
                    "010100100002".into(),
                    AUTHORITY_A.into(),
                    "科员".into(),
                    "丙".into(),
                    CellValue::Number(70.0),
                ],
                vec![
                    "海关总署".into(),
                    "510100100001".into(),
                    "海关总署办公厅".into(),
                    "科员".into(),
                    "丁".into(),
                    CellValue::Number(60.0),
                ],
            ],
        );

        write_xlsx(
            &config.backfill_path,
            &[BACKFILL_AUTHORITY, DEPARTMENT, RECRUITING_TITLE, POSITION_CODE, NAME, BACKFILL_MIN_SCORE],
            &[
                vec![
                    AUTHORITY_A.into(),
                    "办公室".into(),
                    "一级主任科员".into(),
                    "410100100001".into(),
                    "张三".into(),
                    CellValue::Number(83.0),
                ],
                vec![
                    AUTHORITY_A.into(),
                    "办公室".into(),
                    "科员".into(),
                    "410100109999".into(),
                    "李四".into(),
                    CellValue::Number(65.0),
                ],
            ],
        );

        write_xlsx(
            &config.admission_path,
            &[AUTHORITY, PROPOSED_POSITION, NAME],
            &[
                vec![AUTHORITY_A.into(), "一级主任科员410100100001".into(), "张三".into()],
                vec![AUTHORITY_A.into(), "科员410100109999".into(), "李四".into()],
                vec![AUTHORITY_A.into(), "科员".into(), "王五".into()],
            ],
        );

        config
    }

    #[test]
    fn test_run_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.summary_path = Some(dir.path().join("summary.json"));

        let result = run_pipeline(&config).unwrap();

        assert!(result.stages.iter().all(|s| s.status == StageStatus::Computed));

        let score = read_table(&config.score_report_path(), "score").unwrap();
        assert_eq!(score.headers, ScoreComparisonRow::HEADERS);
        assert_eq!(score.len(), 2);
        // Sorted by key: "010100100002" before "410100100001"
        assert_eq!(score.rows[0][1], CellValue::text("010100100002"));
        assert_eq!(score.rows[0][8], CellValue::text(PLACEHOLDER));
        assert_eq!(score.rows[1][4], CellValue::Number(2.0));
        assert_eq!(score.rows[1][8], CellValue::text("+0.500"));

        let admission = read_table(&config.admission_report_path(), "admission").unwrap();
        assert_eq!(admission.headers, AdmissionRow::HEADERS);
        assert_eq!(admission.len(), 2);

        let cross = read_table(&config.cross_report_path(), "cross").unwrap();
        assert_eq!(cross.headers, CrossRow::HEADERS);
        assert_eq!(cross.len(), 3);
        for row in &cross.rows {
            assert!(row[9].as_count().is_some());
        }

        // The backfill-only posting only reaches the report through its hire
        let backfill_only = result
            .cross_rows
            .iter()
            .find(|r| r.key.code == "410100109999")
            .unwrap();
        assert!(backfill_only.score.is_none());
        assert_eq!(backfill_only.hired_names.as_deref(), Some("李四"));

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["stages"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_existing_reports_are_reused_unless_recompute() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());

        run_pipeline(&config).unwrap();

        // Inputs disappear; reuse must not touch them
        std::fs::remove_file(&config.original_path).unwrap();
        let reused = run_pipeline(&config).unwrap();
        assert_eq!(reused.stages[0].status, StageStatus::Reused);
        assert_eq!(reused.stages[1].status, StageStatus::Reused);
        assert_eq!(reused.stages[2].status, StageStatus::Computed);
        assert_eq!(reused.cross_rows.len(), 3);

        config.reuse = ReusePolicy::Recompute;
        assert!(run_pipeline(&config).is_err());
    }

    #[test]
    fn test_inspect_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());

        let report = inspect(
            &config.original_path,
            &config.backfill_path,
            &config.admission_path,
            &config.stage1,
        )
        .unwrap();

        assert_eq!(
            report,
            InspectReport {
                original_rows: 4,
                original_rows_kept: 3,
                original_postings: 2,
                backfill_rows: 2,
                backfill_postings: 2,
                postings_with_backfill: 1,
                admission_rows: 3,
                admission_rows_without_code: 1,
                hired_backfill_postings: 2,
                hired_backfill_candidates: 2,
            }
        );
        assert!(!config.output_dir.exists());
    }
}

pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod stages;

pub use error::{ReportError, Result};
pub use io::{read_table, write_table, RunSummary, StageStatus, StageSummary};
pub use models::{
    extract_position_code, AdmissionRow, CellValue, CrossRow, PostingKey, ScoreComparisonRow,
    Table,
};
pub use pipeline::{inspect, run_pipeline, InspectReport, PipelineConfig, PipelineResult, ReusePolicy};
pub use stages::{
    execute_stage1, execute_stage2, execute_stage3, Stage1Config, Stage1Result, Stage2Result,
    Stage3Result,
};

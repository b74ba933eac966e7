use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading rosters or writing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read spreadsheet {path:?}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },
    #[error("spreadsheet {0:?} contains no sheets")]
    EmptyWorkbook(PathBuf),
    #[error("{table}: missing column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("failed to write spreadsheet {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("failed to write run summary: {0}")]
    Summary(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

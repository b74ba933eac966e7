use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use backfill_report::{inspect, run_pipeline, PipelineConfig, ReusePolicy, Stage1Config, StageStatus};

#[derive(Parser)]
#[command(name = "backfill-report")]
#[command(author, version, about = "Interview score and backfill admission reconciliation", long_about = None)]
struct Cli {
    /// Defaults to `run` with the default file names
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the score comparison, backfill admission and cross analysis reports
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Directory for the generated reports (created if missing)
        #[arg(long, default_value = "result")]
        output_dir: PathBuf,

        /// Regenerate reports even if they already exist
        #[arg(long)]
        recompute: bool,

        /// Write a JSON run summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print statistics about the input rosters without writing reports
    Inspect {
        #[command(flatten)]
        inputs: InputArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Original interview roster
    #[arg(long, default_value = "2024全国进面名单.xlsx")]
    original: PathBuf,

    /// Backfill interview roster
    #[arg(long, default_value = "2024递补面试名单.xls")]
    backfill: PathBuf,

    /// Final admission roster
    #[arg(long, default_value = "2024录用名单.xls")]
    admission: PathBuf,

    /// Only original-roster departments containing this text are compared
    #[arg(long, default_value = "国家金融监督管理")]
    authority_marker: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            setup_logging(false);
            run_reports(PipelineConfig::default())
        }
        Some(Commands::Run {
            inputs,
            output_dir,
            recompute,
            summary,
            verbose,
        }) => {
            setup_logging(verbose);
            let config = PipelineConfig {
                original_path: inputs.original,
                backfill_path: inputs.backfill,
                admission_path: inputs.admission,
                output_dir,
                reuse: if recompute {
                    ReusePolicy::Recompute
                } else {
                    ReusePolicy::Reuse
                },
                summary_path: summary,
                stage1: Stage1Config {
                    authority_marker: inputs.authority_marker,
                },
                ..Default::default()
            };
            run_reports(config)
        }
        Some(Commands::Inspect { inputs, verbose }) => {
            setup_logging(verbose);
            inspect_rosters(inputs)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn run_reports(config: PipelineConfig) -> Result<()> {
    info!("Output directory: {:?}", config.output_dir);

    let result = run_pipeline(&config).context("Failed to build reports")?;

    for stage in &result.stages {
        let status = match stage.status {
            StageStatus::Computed => "computed",
            StageStatus::Reused => "reused",
        };
        info!(
            "{}: {} ({} rows) -> {:?}",
            stage.stage, status, stage.rows, stage.output
        );
    }

    let hired: usize = result.cross_rows.iter().map(|r| r.hired_count).sum();
    info!(
        "Complete: {} postings, {} hired backfill candidates",
        result.cross_rows.len(),
        hired
    );

    Ok(())
}

fn inspect_rosters(inputs: InputArgs) -> Result<()> {
    let stage1 = Stage1Config {
        authority_marker: inputs.authority_marker,
    };
    let report = inspect(&inputs.original, &inputs.backfill, &inputs.admission, &stage1)
        .context("Failed to inspect input rosters")?;

    println!("Roster Inspection");
    println!("=================");
    println!("Original roster: {:?}", inputs.original);
    println!("  Rows: {}", report.original_rows);
    println!(
        "  Rows matching '{}': {}",
        stage1.authority_marker, report.original_rows_kept
    );
    println!("  Postings compared: {}", report.original_postings);
    println!(
        "  Postings with backfill: {}",
        report.postings_with_backfill
    );
    println!();

    println!("Backfill roster: {:?}", inputs.backfill);
    println!("  Rows: {}", report.backfill_rows);
    println!("  Postings: {}", report.backfill_postings);
    println!();

    println!("Admission roster: {:?}", inputs.admission);
    println!("  Rows: {}", report.admission_rows);
    println!(
        "  Rows without position code: {}",
        report.admission_rows_without_code
    );
    println!();

    println!("Backfill Admissions");
    println!("-------------------");
    println!("Postings with hires: {}", report.hired_backfill_postings);
    println!("Hired backfill candidates: {}", report.hired_backfill_candidates);

    Ok(())
}

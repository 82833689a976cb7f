//! CLI entry point for gtimeline.
//!
//! Converts a location history JSON export into a human-readable CSV table.

use anyhow::Result;
use clap::{ArgGroup, Parser};
use gtimeline::config::{Mode, RunConfig, TimeZone};
use gtimeline::logging::{self, LogConfig};
use gtimeline::output::Layout;
use gtimeline::HistoryError;
use gtimeline::pipeline::{RunReport, run};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gtimeline")]
#[command(
    about = "Parse a location history json file into a more human readable csv file",
    long_about = None
)]
#[command(group(ArgGroup::new("mode").args(["translate", "summary"]).multiple(false)))]
struct Cli {
    /// Path to the location history json file
    #[arg(short = 'f', long = "file", value_name = "JSON_FILE")]
    input: PathBuf,

    /// Path of the csv file to write
    #[arg(short, long, value_name = "CSV_FILE")]
    output: PathBuf,

    /// Confidence threshold (accepted, not applied)
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    confidence: u8,

    /// Also emit a row for locations without activity data
    #[arg(long)]
    include_no_activity: bool,

    /// Write one row per activity sample (default)
    #[arg(short, long)]
    translate: bool,

    /// Summarize travelled time per activity (not implemented)
    #[arg(short, long)]
    summary: bool,

    /// Column ordering of the csv file
    #[arg(long, value_enum, default_value_t = Layout::Translate)]
    layout: Layout,

    /// Render dates in UTC instead of the local time zone
    #[arg(long)]
    utc: bool,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let mode = if self.summary {
            Mode::Summary
        } else {
            Mode::Translate
        };

        RunConfig {
            input_path: self.input,
            output_path: self.output,
            confidence_threshold: self.confidence,
            include_no_activity: self.include_no_activity,
            mode,
            layout: self.layout,
            time_zone: if self.utc {
                TimeZone::Utc
            } else {
                TimeZone::Local
            },
        }
    }
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let _log_guard = logging::init(&LogConfig::from_env())?;

    let config = cli.into_config();
    Ok(finish(run(&config)))
}

/// Logs the outcome of a run and maps it to the process exit status.
fn finish(result: Result<RunReport, HistoryError>) -> ExitCode {
    match result {
        Ok(report) => {
            info!(
                total_locations = report.total_locations,
                rows = report.rows_written,
                "Total locations: {}",
                report.total_locations
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            // reported once, through both log sinks
            error!(error = %e, "Conversion failed");
            ExitCode::FAILURE
        }
    }
}

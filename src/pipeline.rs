//! One conversion run: load, transform, write.

use tracing::{debug, info};

use crate::config::{Mode, RunConfig};
use crate::error::HistoryError;
use crate::history::LocationHistory;
use crate::output::write_csv;
use crate::transform::transform;

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub total_locations: usize,
    pub rows_written: usize,
    pub sentinel_rows: usize,
}

/// Runs one conversion described by `config`.
///
/// The input is fully decoded and validated before the output file is
/// created, so a missing input or a schema error leaves no output behind.
#[tracing::instrument(
    skip(config),
    fields(input = %config.input_path.display(), output = %config.output_path.display())
)]
pub fn run(config: &RunConfig) -> Result<RunReport, HistoryError> {
    info!("Loading json data");
    let history = LocationHistory::load(&config.input_path)?;
    info!(locations = history.locations.len(), "History loaded");

    if config.mode == Mode::Summary {
        return Err(HistoryError::NotImplemented("summary"));
    }

    let options = config.transform_options();
    if options.confidence_threshold > 0 {
        debug!(
            threshold = options.confidence_threshold,
            "Confidence threshold accepted but not applied"
        );
    }

    info!(
        include_no_activity = options.include_no_activity,
        layout = ?config.layout,
        "Processing locations"
    );
    let (rows, total_locations) = transform(&history, &options);
    let summary = write_csv(&config.output_path, rows, config.layout)?;

    info!(
        total_locations,
        rows = summary.rows,
        sentinel_rows = summary.sentinel_rows,
        "Finished processing"
    );

    Ok(RunReport {
        total_locations,
        rows_written: summary.rows,
        sentinel_rows: summary.sentinel_rows,
    })
}

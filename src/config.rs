//! Run configuration, built by the CLI and validated before the pipeline runs.

use std::path::PathBuf;

use crate::output::Layout;
use crate::transform::TransformOptions;

/// What a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// One CSV row per activity sample (or sentinel row).
    #[default]
    Translate,
    /// Travelled-time summary. Not implemented.
    Summary,
}

/// Time zone used to render row dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZone {
    /// The system's local time zone.
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Accepted for compatibility; rows are never filtered on it.
    pub confidence_threshold: u8,
    pub include_no_activity: bool,
    pub mode: Mode,
    pub layout: Layout,
    pub time_zone: TimeZone,
}

impl RunConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            confidence_threshold: 0,
            include_no_activity: false,
            mode: Mode::default(),
            layout: Layout::default(),
            time_zone: TimeZone::default(),
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            include_no_activity: self.include_no_activity,
            confidence_threshold: self.confidence_threshold,
            time_zone: self.time_zone,
        }
    }
}

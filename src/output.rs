//! CSV emission of transformed rows.
//!
//! Header row first, then one line per row. Fields are quoted only when
//! they need it. Degrees are written in shortest round-trip form with a
//! fractional part (`10.0`, `40.7128`), switching to exponent notation for
//! very small magnitudes (`1e-7`).

use clap::ValueEnum;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::error::HistoryError;
use crate::transform::OutputRow;

/// Column ordering of the emitted table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// `Date,Latitude,Longitude,Activity,Confidence`
    #[default]
    Translate,
    /// `Latitude,Longitude,Activity,Confidence,Date`
    Table,
}

impl Layout {
    pub fn header(&self) -> [&'static str; 5] {
        match self {
            Layout::Translate => ["Date", "Latitude", "Longitude", "Activity", "Confidence"],
            Layout::Table => ["Latitude", "Longitude", "Activity", "Confidence", "Date"],
        }
    }
}

#[derive(Serialize)]
struct TranslateRecord<'a> {
    date: &'a str,
    latitude: f64,
    longitude: f64,
    activity: &'a str,
    confidence: u8,
}

#[derive(Serialize)]
struct TableRecord<'a> {
    latitude: f64,
    longitude: f64,
    activity: &'a str,
    confidence: u8,
    date: &'a str,
}

fn serialize_row<W: Write>(
    writer: &mut csv::Writer<W>,
    row: &OutputRow,
    layout: Layout,
) -> csv::Result<()> {
    match layout {
        Layout::Translate => writer.serialize(TranslateRecord {
            date: &row.date,
            latitude: row.latitude,
            longitude: row.longitude,
            activity: &row.activity,
            confidence: row.confidence,
        }),
        Layout::Table => writer.serialize(TableRecord {
            latitude: row.latitude,
            longitude: row.longitude,
            activity: &row.activity,
            confidence: row.confidence,
            date: &row.date,
        }),
    }
}

/// Counts of what [`write_rows`] emitted, header excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows: usize,
    pub sentinel_rows: usize,
}

/// Writes the header and every row to `writer`.
///
/// Stops at the first row error; rows already written stay written.
pub fn write_rows<W, I>(writer: W, rows: I, layout: Layout) -> Result<WriteSummary, HistoryError>
where
    W: Write,
    I: IntoIterator<Item = Result<OutputRow, HistoryError>>,
{
    // header is written explicitly so an empty table still has one
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(layout.header())?;

    let mut summary = WriteSummary::default();
    for row in rows {
        let row = row?;
        serialize_row(&mut writer, &row, layout)?;

        summary.rows += 1;
        if row.sentinel {
            summary.sentinel_rows += 1;
        }
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(summary)
}

/// Creates (or truncates) `path` and writes the table into it.
pub fn write_csv<I>(path: &Path, rows: I, layout: Layout) -> Result<WriteSummary, HistoryError>
where
    I: IntoIterator<Item = Result<OutputRow, HistoryError>>,
{
    debug!(path = %path.display(), ?layout, "Writing CSV");
    let file = File::create(path).map_err(csv::Error::from)?;
    write_rows(file, rows, layout)
}

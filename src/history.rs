//! Data model and decoder for location history exports.
//!
//! An export is a JSON object whose `locations` array holds one record per
//! recorded position:
//!
//! ```json
//! {
//!   "locations": [{
//!     "timestampMs": "1578234600000",
//!     "latitudeE7": 407128000,
//!     "longitudeE7": -740060000,
//!     "activity": [{
//!       "timestampMs": "1578234601000",
//!       "activity": [{ "type": "WALKING", "confidence": 80 }]
//!     }]
//!   }]
//! }
//! ```
//!
//! Keys not listed above (`accuracy`, `altitude`, `velocity`, ...) are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::HistoryError;

/// Fixed-point scale of `latitudeE7` / `longitudeE7`.
pub const E7_SCALE: f64 = 1e7;

pub const MAX_LATITUDE_E7: i64 = 900_000_000;
pub const MAX_LONGITUDE_E7: i64 = 1_800_000_000;
pub const MAX_CONFIDENCE: u8 = 100;

/// Converts an E7 fixed-point coordinate into degrees.
pub fn e7_to_degrees(value: i64) -> f64 {
    value as f64 / E7_SCALE
}

/// Epoch milliseconds. The export encodes them as strings; plain integers
/// are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawTimestamp")]
pub struct TimestampMs(pub i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(i64),
}

impl TimestampMs {
    /// The instant this timestamp denotes, if chrono can represent it.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    fn validate(self) -> Result<(), String> {
        if self.0 <= 0 {
            return Err(format!("timestampMs {} is not positive", self.0));
        }
        if self.to_datetime().is_none() {
            return Err(format!("timestampMs {} out of range", self.0));
        }
        Ok(())
    }
}

impl TryFrom<RawTimestamp> for TimestampMs {
    type Error = String;

    fn try_from(raw: RawTimestamp) -> Result<Self, Self::Error> {
        match raw {
            RawTimestamp::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(TimestampMs)
                .map_err(|_| format!("timestampMs {s:?} is not an integer")),
            RawTimestamp::Number(n) => Ok(TimestampMs(n)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationHistory {
    pub locations: Vec<LocationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub timestamp_ms: TimestampMs,
    #[serde(rename = "latitudeE7")]
    pub latitude_e7: i64,
    #[serde(rename = "longitudeE7")]
    pub longitude_e7: i64,
    /// `None` only when the key is absent; an explicit `null` is rejected.
    #[serde(default, deserialize_with = "present_activity")]
    pub activity: Option<Vec<ActivitySample>>,
}

fn present_activity<'de, D>(deserializer: D) -> Result<Option<Vec<ActivitySample>>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    pub timestamp_ms: TimestampMs,
    pub activity: Vec<ActivityGuess>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityGuess {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: u8,
}

impl LocationHistory {
    /// Decodes and validates an export held in memory.
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        let history: LocationHistory = serde_json::from_str(json)?;
        history.validate()?;
        Ok(history)
    }

    /// Decodes and validates an export from any reader. The whole document is
    /// materialized before returning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HistoryError> {
        let history: LocationHistory = serde_json::from_reader(reader)?;
        history.validate()?;
        Ok(history)
    }

    /// Opens `path` and decodes it.
    ///
    /// # Errors
    ///
    /// [`HistoryError::InputNotFound`] when `path` is not an existing file.
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        if !path.is_file() {
            return Err(HistoryError::InputNotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "Opening history file");
        let file = File::open(path).map_err(HistoryError::InputRead)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Checks record invariants, reporting the first offending location.
    pub fn validate(&self) -> Result<(), HistoryError> {
        for (index, location) in self.locations.iter().enumerate() {
            location
                .validate()
                .map_err(|msg| HistoryError::Schema(format!("location {index}: {msg}")))?;
        }
        Ok(())
    }
}

impl LocationRecord {
    pub fn latitude(&self) -> f64 {
        e7_to_degrees(self.latitude_e7)
    }

    pub fn longitude(&self) -> f64 {
        e7_to_degrees(self.longitude_e7)
    }

    fn validate(&self) -> Result<(), String> {
        self.timestamp_ms.validate()?;
        if !(-MAX_LATITUDE_E7..=MAX_LATITUDE_E7).contains(&self.latitude_e7) {
            return Err(format!("latitudeE7 {} out of range", self.latitude_e7));
        }
        if !(-MAX_LONGITUDE_E7..=MAX_LONGITUDE_E7).contains(&self.longitude_e7) {
            return Err(format!("longitudeE7 {} out of range", self.longitude_e7));
        }

        for (index, sample) in self.activity.iter().flatten().enumerate() {
            sample
                .validate()
                .map_err(|msg| format!("activity {index}: {msg}"))?;
        }
        Ok(())
    }
}

impl ActivitySample {
    /// Highest-confidence guess; the earliest one wins a tie.
    pub fn best_guess(&self) -> Option<&ActivityGuess> {
        // min_by_key keeps the first of equal elements
        self.activity.iter().min_by_key(|g| Reverse(g.confidence))
    }

    fn validate(&self) -> Result<(), String> {
        self.timestamp_ms.validate()?;
        if self.activity.is_empty() {
            return Err("no activity guesses".to_string());
        }
        if let Some(guess) = self.activity.iter().find(|g| g.confidence > MAX_CONFIDENCE) {
            return Err(format!(
                "confidence {} of {} exceeds {MAX_CONFIDENCE}",
                guess.confidence, guess.kind
            ));
        }
        Ok(())
    }
}

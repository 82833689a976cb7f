//! Flattens a decoded location history into output rows.

use chrono::Local;
use std::slice;

use crate::config::TimeZone;
use crate::error::HistoryError;
use crate::history::{ActivitySample, LocationHistory, LocationRecord, TimestampMs};

/// asctime layout, e.g. `Sun Jan  5 14:30:00 2020`.
pub const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Activity label of a location without activity data.
pub const NO_ACTIVITY: &str = "none";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Emit a sentinel row for locations that carry no `activity` key.
    pub include_no_activity: bool,
    /// Carried through unchanged; does not filter rows.
    pub confidence_threshold: u8,
    pub time_zone: TimeZone,
}

/// One flattened output record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub activity: String,
    pub confidence: u8,
    /// Stands in for a location without activity data.
    pub sentinel: bool,
}

/// Renders epoch milliseconds with [`DATE_FORMAT`]. Sub-second precision is
/// dropped by the format.
pub fn format_timestamp(ts: TimestampMs, time_zone: TimeZone) -> Result<String, HistoryError> {
    let utc = ts
        .to_datetime()
        .ok_or_else(|| HistoryError::Schema(format!("timestampMs {} out of range", ts.0)))?;

    Ok(match time_zone {
        TimeZone::Utc => utc.format(DATE_FORMAT).to_string(),
        TimeZone::Local => utc.with_timezone(&Local).format(DATE_FORMAT).to_string(),
    })
}

/// Starts a single pass over `history`.
///
/// Returns the lazy row sequence and the number of input locations, which is
/// independent of filtering.
pub fn transform<'a>(history: &'a LocationHistory, options: &TransformOptions) -> (Rows<'a>, usize) {
    let rows = Rows {
        locations: history.locations.iter(),
        current: None,
        options: *options,
    };
    (rows, history.locations.len())
}

/// Lazy, order-preserving row sequence produced by [`transform`].
pub struct Rows<'a> {
    locations: slice::Iter<'a, LocationRecord>,
    current: Option<(&'a LocationRecord, slice::Iter<'a, ActivitySample>)>,
    options: TransformOptions,
}

fn sample_row(
    options: &TransformOptions,
    location: &LocationRecord,
    sample: &ActivitySample,
) -> Result<OutputRow, HistoryError> {
    let guess = sample.best_guess().ok_or_else(|| {
        HistoryError::Schema(format!(
            "activity sample at {} has no guesses",
            sample.timestamp_ms.0
        ))
    })?;

    Ok(OutputRow {
        date: format_timestamp(sample.timestamp_ms, options.time_zone)?,
        latitude: location.latitude(),
        longitude: location.longitude(),
        activity: guess.kind.clone(),
        confidence: guess.confidence,
        sentinel: false,
    })
}

fn sentinel_row(
    options: &TransformOptions,
    location: &LocationRecord,
) -> Result<OutputRow, HistoryError> {
    Ok(OutputRow {
        date: format_timestamp(location.timestamp_ms, options.time_zone)?,
        latitude: location.latitude(),
        longitude: location.longitude(),
        activity: NO_ACTIVITY.to_string(),
        confidence: 0,
        sentinel: true,
    })
}

impl<'a> Iterator for Rows<'a> {
    type Item = Result<OutputRow, HistoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((location, samples)) = &mut self.current {
                if let Some(sample) = samples.next() {
                    return Some(sample_row(&self.options, location, sample));
                }
                self.current = None;
            }

            let location = self.locations.next()?;
            match &location.activity {
                Some(samples) => self.current = Some((location, samples.iter())),
                None if self.options.include_no_activity => {
                    return Some(sentinel_row(&self.options, location));
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(include_no_activity: bool) -> TransformOptions {
        TransformOptions {
            include_no_activity,
            confidence_threshold: 0,
            time_zone: TimeZone::Utc,
        }
    }

    fn collect(history: &LocationHistory, options: &TransformOptions) -> (Vec<OutputRow>, usize) {
        let (rows, total) = transform(history, options);
        (rows.collect::<Result<Vec<_>, _>>().unwrap(), total)
    }

    const MIXED: &str = r#"{"locations":[
        {"timestampMs":"1000","latitudeE7":407128000,"longitudeE7":-740060000,
         "activity":[{"timestampMs":"1000","activity":[{"type":"WALKING","confidence":80}]}]},
        {"timestampMs":"2000","latitudeE7":515073000,"longitudeE7":-1276000},
        {"timestampMs":"3000","latitudeE7":100000000,"longitudeE7":200000000,
         "activity":[
            {"timestampMs":"4000","activity":[{"type":"STILL","confidence":30},{"type":"IN_VEHICLE","confidence":70}]},
            {"timestampMs":"5000","activity":[{"type":"ON_FOOT","confidence":55}]},
            {"timestampMs":"6000","activity":[{"type":"WALKING","confidence":50},{"type":"RUNNING","confidence":90},{"type":"STILL","confidence":90}]}]}
    ]}"#;

    #[test]
    fn test_format_timestamp_utc() {
        assert_eq!(
            format_timestamp(TimestampMs(1000), TimeZone::Utc).unwrap(),
            "Thu Jan  1 00:00:01 1970"
        );
        assert_eq!(
            format_timestamp(TimestampMs(1578234600999), TimeZone::Utc).unwrap(),
            "Sun Jan  5 14:30:00 2020"
        );
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        let result = format_timestamp(TimestampMs(i64::MAX), TimeZone::Utc);
        assert!(matches!(result, Err(HistoryError::Schema(_))));
    }

    #[test]
    fn test_single_location_with_activity() {
        let history = LocationHistory::from_json(
            r#"{"locations":[{"timestampMs":"1000","latitudeE7":407128000,"longitudeE7":-740060000,"activity":[{"timestampMs":"1000","activity":[{"type":"WALKING","confidence":80}]}]}]}"#,
        )
        .unwrap();

        let (rows, total) = collect(&history, &options(false));
        assert_eq!(total, 1);
        assert_eq!(
            rows,
            vec![OutputRow {
                date: "Thu Jan  1 00:00:01 1970".to_string(),
                latitude: 40.7128,
                longitude: -74.006,
                activity: "WALKING".to_string(),
                confidence: 80,
                sentinel: false,
            }]
        );
    }

    #[test]
    fn test_locations_without_activity_skipped_by_default() {
        let history = LocationHistory::from_json(MIXED).unwrap();
        let (rows, total) = collect(&history, &options(false));

        assert_eq!(total, 3);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| !r.sentinel));
    }

    #[test]
    fn test_sentinel_row_in_input_order() {
        let history = LocationHistory::from_json(MIXED).unwrap();
        let (rows, total) = collect(&history, &options(true));

        assert_eq!(total, 3);
        assert_eq!(rows.len(), 5);
        let sentinel = &rows[1];
        assert!(sentinel.sentinel);
        assert_eq!(sentinel.activity, NO_ACTIVITY);
        assert_eq!(sentinel.confidence, 0);
        assert_eq!(sentinel.date, "Thu Jan  1 00:00:02 1970");
        assert_eq!(sentinel.latitude, 51.5073);
        assert_eq!(sentinel.longitude, -0.1276);
    }

    #[test]
    fn test_one_row_per_sample_with_own_timestamp() {
        let history = LocationHistory::from_json(MIXED).unwrap();
        let (rows, _) = collect(&history, &options(true));

        let tail: Vec<_> = rows[2..]
            .iter()
            .map(|r| (r.date.as_str(), r.activity.as_str(), r.confidence))
            .collect();
        assert_eq!(
            tail,
            vec![
                ("Thu Jan  1 00:00:04 1970", "IN_VEHICLE", 70),
                ("Thu Jan  1 00:00:05 1970", "ON_FOOT", 55),
                ("Thu Jan  1 00:00:06 1970", "RUNNING", 90),
            ]
        );
        assert!(rows[2..].iter().all(|r| r.latitude == 10.0 && r.longitude == 20.0));
    }

    #[test]
    fn test_guess_labelled_none_is_not_a_sentinel() {
        let history = LocationHistory::from_json(
            r#"{"locations":[{"timestampMs":"1000","latitudeE7":1,"longitudeE7":2,
                "activity":[{"timestampMs":"1000","activity":[{"type":"none","confidence":0}]}]}]}"#,
        )
        .unwrap();
        let (rows, _) = collect(&history, &options(true));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].activity, "none");
        assert!(!rows[0].sentinel);
    }

    #[test]
    fn test_confidence_threshold_does_not_filter() {
        let history = LocationHistory::from_json(MIXED).unwrap();
        let mut strict = options(true);
        strict.confidence_threshold = 100;

        let (baseline, _) = collect(&history, &options(true));
        let (thresholded, _) = collect(&history, &strict);
        assert_eq!(baseline, thresholded);
    }

    #[test]
    fn test_empty_locations() {
        let history = LocationHistory::from_json(r#"{"locations":[]}"#).unwrap();
        let (rows, total) = collect(&history, &options(true));
        assert_eq!(total, 0);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_activity_list_emits_nothing() {
        let history = LocationHistory::from_json(
            r#"{"locations":[{"timestampMs":"1000","latitudeE7":1,"longitudeE7":2,"activity":[]}]}"#,
        )
        .unwrap();
        let (rows, total) = collect(&history, &options(true));
        assert_eq!(total, 1);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unvalidated_empty_guesses_yield_schema_error() {
        let mut history = LocationHistory::from_json(
            r#"{"locations":[{"timestampMs":"1000","latitudeE7":1,"longitudeE7":2,
                "activity":[{"timestampMs":"1000","activity":[{"type":"STILL","confidence":100}]}]}]}"#,
        )
        .unwrap();
        history.locations[0].activity.as_mut().unwrap()[0].activity.clear();

        let (mut rows, _) = transform(&history, &options(false));
        assert!(matches!(rows.next(), Some(Err(HistoryError::Schema(_)))));
    }

    #[test]
    fn test_rows_are_single_pass() {
        let history = LocationHistory::from_json(MIXED).unwrap();
        let (mut rows, _) = transform(&history, &options(false));
        assert_eq!(rows.by_ref().count(), 4);
        assert!(rows.next().is_none());
    }
}

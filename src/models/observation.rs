use crate::error::{AnalysisError, Result};
use crate::models::{StationMetadata, TimeWindow};
use crate::utils::constants::MISSING_VALUE;
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single raw measurement as delivered by the station archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub station_id: u32,
    pub time: NaiveDateTime,
    pub speed: f64,
    pub direction: Option<f64>,
}

impl ObservationRecord {
    pub fn new(station_id: u32, time: NaiveDateTime, speed: f64, direction: Option<f64>) -> Self {
        Self {
            station_id,
            time,
            speed,
            direction,
        }
    }

    /// Speed with the archive's missing-value sentinel mapped to NaN
    pub fn speed_or_nan(&self) -> f64 {
        if self.speed == MISSING_VALUE {
            f64::NAN
        } else {
            self.speed
        }
    }
}

/// Hourly scalar series of one station.
///
/// The index is contiguous: every hour between the first and last
/// observation is present, with NaN where nothing finite was measured.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    pub station_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    values: Vec<(NaiveDateTime, f64)>,
}

impl StationSeries {
    /// Build a series from already hourly, time-sorted values
    pub fn new(
        station_id: u32,
        latitude: f64,
        longitude: f64,
        mut values: Vec<(NaiveDateTime, f64)>,
    ) -> Self {
        values.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, value) in values.iter_mut() {
            if *value == MISSING_VALUE {
                *value = f64::NAN;
            }
        }

        Self {
            station_id,
            latitude,
            longitude,
            values,
        }
    }

    /// Resample raw records to one mean value per hour
    pub fn from_records(station: &StationMetadata, records: &[ObservationRecord]) -> Result<Self> {
        let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();

        for record in records {
            if record.station_id != station.station_id {
                return Err(AnalysisError::InvalidFormat(format!(
                    "Record of station {} passed to series of station {}",
                    record.station_id, station.station_id
                )));
            }

            let hour = floor_to_hour(record.time);
            let entry = buckets.entry(hour).or_insert((0.0, 0));
            let speed = record.speed_or_nan();
            if speed.is_finite() {
                entry.0 += speed;
                entry.1 += 1;
            }
        }

        let mut values = Vec::new();
        if let (Some(first), Some(last)) = (
            buckets.keys().next().copied(),
            buckets.keys().next_back().copied(),
        ) {
            let mut hour = first;
            while hour <= last {
                let value = match buckets.get(&hour) {
                    Some(&(sum, count)) if count > 0 => sum / count as f64,
                    _ => f64::NAN,
                };
                values.push((hour, value));
                hour += Duration::hours(1);
            }
        }

        Ok(Self {
            station_id: station.station_id,
            latitude: station.latitude,
            longitude: station.longitude,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[(NaiveDateTime, f64)] {
        &self.values
    }

    /// Observations falling inside `[window.start, window.stop)`
    pub fn slice(&self, window: &TimeWindow) -> &[(NaiveDateTime, f64)] {
        let lo = self.values.partition_point(|(t, _)| *t < window.start);
        let hi = self.values.partition_point(|(t, _)| *t < window.stop);
        &self.values[lo..hi.max(lo)]
    }
}

fn floor_to_hour(time: NaiveDateTime) -> NaiveDateTime {
    time.date()
        .and_hms_opt(time.hour(), 0, 0)
        .unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn station() -> StationMetadata {
        StationMetadata::new(
            44,
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            44,
            52.93,
            8.237,
            "Grossenkneten".to_string(),
            "Niedersachsen".to_string(),
        )
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_hourly_resampling_skips_sentinel() {
        let records = vec![
            ObservationRecord::new(44, at(1, 0, 0), 2.0, None),
            ObservationRecord::new(44, at(1, 0, 10), 4.0, None),
            ObservationRecord::new(44, at(1, 0, 20), MISSING_VALUE, None),
            ObservationRecord::new(44, at(1, 2, 0), 6.0, None),
        ];

        let series = StationSeries::from_records(&station(), &records).unwrap();
        let values = series.values();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0], (at(1, 0, 0), 3.0));
        assert_eq!(values[1].0, at(1, 1, 0));
        assert!(values[1].1.is_nan());
        assert_eq!(values[2], (at(1, 2, 0), 6.0));
    }

    #[test]
    fn test_hour_with_only_sentinels_is_nan() {
        let records = vec![
            ObservationRecord::new(44, at(1, 5, 0), MISSING_VALUE, None),
            ObservationRecord::new(44, at(1, 5, 10), MISSING_VALUE, None),
        ];

        let series = StationSeries::from_records(&station(), &records).unwrap();
        assert_eq!(series.len(), 1);
        assert!(series.values()[0].1.is_nan());
    }

    #[test]
    fn test_foreign_station_rejected() {
        let records = vec![ObservationRecord::new(45, at(1, 0, 0), 2.0, None)];
        assert!(StationSeries::from_records(&station(), &records).is_err());
    }

    #[test]
    fn test_slice_is_half_open() {
        let values = (0..6).map(|h| (at(1, h, 0), h as f64)).collect();
        let series = StationSeries::new(44, 52.93, 8.237, values);

        let window = TimeWindow::new(at(1, 2, 0), at(1, 4, 0));
        let slice = series.slice(&window);

        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].1, 2.0);
        assert_eq!(slice[1].1, 3.0);
    }

    #[test]
    fn test_new_maps_sentinel() {
        let series = StationSeries::new(44, 0.0, 0.0, vec![(at(1, 0, 0), MISSING_VALUE)]);
        assert!(series.values()[0].1.is_nan());
    }
}

use crate::error::{AnalysisError, Result};
use crate::models::StationMetadata;
use chrono::NaiveDate;
use encoding_rs::WINDOWS_1252;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;
use validator::Validate;

/// Reader for the fixed-width station description file
pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Read station metadata; the file is UTF-8 or ISO-8859-1
    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationMetadata>> {
        let bytes = std::fs::read(path)?;
        let content = decode(&bytes);
        let mut stations = Vec::new();

        for (line_number, line) in content.lines().enumerate() {
            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            // Header and separator lines do not start with a station ID
            if !line
                .trim_start()
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
            {
                continue;
            }

            match self.parse_station_line(line)? {
                Some(station) => stations.push(station),
                None => warn!(line = line_number + 1, "Skipping malformed station line"),
            }
        }

        Ok(stations)
    }

    /// Parse one line:
    /// `id from to` in characters 0..24, `height lat lon` in 24..60, then
    /// name and state separated by runs of at least two spaces
    fn parse_station_line(&self, line: &str) -> Result<Option<StationMetadata>> {
        let (Some(ids), Some(location), Some(rest)) = (line.get(..24), line.get(24..60), line.get(60..))
        else {
            return Ok(None);
        };

        let ids: Vec<&str> = ids.split_whitespace().collect();
        let location: Vec<&str> = location.split_whitespace().collect();
        if ids.len() != 3 || location.len() != 3 {
            return Ok(None);
        }

        let station_id = ids[0].parse::<u32>().map_err(|_| {
            AnalysisError::InvalidFormat(format!("Invalid station ID: '{}'", ids[0]))
        })?;
        let from_date = NaiveDate::parse_from_str(ids[1], "%Y%m%d")?;
        let to_date = NaiveDate::parse_from_str(ids[2], "%Y%m%d")?;

        let height = location[0].parse::<i32>().map_err(|_| {
            AnalysisError::InvalidFormat(format!("Invalid station height: '{}'", location[0]))
        })?;
        let latitude = parse_degrees(location[1])?;
        let longitude = parse_degrees(location[2])?;

        let mut names = rest
            .split("  ")
            .map(str::trim)
            .filter(|part| !part.is_empty());
        let Some(name) = names.next() else {
            return Ok(None);
        };
        let state = names.next().unwrap_or_default();

        let station = StationMetadata::new(
            station_id,
            from_date,
            to_date,
            height,
            latitude,
            longitude,
            name.to_string(),
            state.to_string(),
        );
        station.validate()?;

        Ok(Some(station))
    }

    /// Read station metadata keyed by station ID
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<u32, StationMetadata>> {
        let stations = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            map.insert(station.station_id, station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

fn parse_degrees(value: &str) -> Result<f64> {
    value.parse::<f64>().map_err(|_| {
        AnalysisError::InvalidFormat(format!("Invalid coordinate value: '{}'", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Stations_id von_datum bis_datum Stationshoehe geoBreite geoLaenge Stationsname Bundesland";
    const SEPARATOR: &str = "----------- --------- --------- ------------- --------- --------- ----------------------------------------- ----------";
    const AACHEN: &str = "00003 19370101 20110331            202     50.7827    6.0941 Aachen                                   Nordrhein-Westfalen";
    const BAD_HOMBURG: &str = "00044 20070401 20240101             44     52.9336    8.2370 Bad Homburg v.d. Höhe                    Hessen                      ";

    #[test]
    fn test_parse_station_line() {
        let reader = StationReader::new();
        let station = reader.parse_station_line(AACHEN).unwrap().unwrap();

        assert_eq!(station.station_id, 3);
        assert_eq!(station.from_date, NaiveDate::from_ymd_opt(1937, 1, 1).unwrap());
        assert_eq!(station.to_date, NaiveDate::from_ymd_opt(2011, 3, 31).unwrap());
        assert_eq!(station.height, 202);
        assert!((station.latitude - 50.7827).abs() < 1e-9);
        assert!((station.longitude - 6.0941).abs() < 1e-9);
        assert_eq!(station.name, "Aachen");
        assert_eq!(station.state, "Nordrhein-Westfalen");
    }

    #[test]
    fn test_name_with_single_spaces() {
        let reader = StationReader::new();
        let station = reader.parse_station_line(BAD_HOMBURG).unwrap().unwrap();
        assert_eq!(station.name, "Bad Homburg v.d. Höhe");
        assert_eq!(station.state, "Hessen");
    }

    #[test]
    fn test_short_line_is_skipped() {
        let reader = StationReader::new();
        assert!(reader.parse_station_line("00003 19370101").unwrap().is_none());
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let reader = StationReader::new();
        let line = AACHEN.replace("50.7827", "95.7827");
        assert!(reader.parse_station_line(&line).is_err());
    }

    #[test]
    fn test_read_latin1_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "{}", HEADER)?;
        writeln!(temp_file, "{}", SEPARATOR)?;
        writeln!(temp_file, "{}", AACHEN)?;
        // "Höhe" encoded as ISO-8859-1
        let (latin1, _, _) = WINDOWS_1252.encode(BAD_HOMBURG);
        temp_file.write_all(&latin1)?;
        writeln!(temp_file)?;

        let reader = StationReader::new();
        let stations = reader.read_stations_map(temp_file.path())?;

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[&3].name, "Aachen");
        assert_eq!(stations[&44].name, "Bad Homburg v.d. Höhe");

        Ok(())
    }
}

use crate::error::{AnalysisError, Result};
use crate::models::ObservationRecord;
use crate::utils::constants::{
    COLUMN_DIRECTION, COLUMN_SPEED, COLUMN_STATION_ID, COLUMN_TIME, DEFAULT_BUFFER_SIZE,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reader for `;`-separated station observation files, plain or zipped
pub struct ObservationReader {
    delimiter: u8,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self { delimiter: b';' }
    }

    /// Read a plain file, or the single member of a `.zip` archive
    pub fn read_observations(&self, path: &Path) -> Result<Vec<ObservationRecord>> {
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("zip"));

        if is_zip {
            self.read_zip(path)
        } else {
            let file = File::open(path)?;
            self.read_from(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))
        }
    }

    fn read_zip(&self, path: &Path) -> Result<Vec<ObservationRecord>> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

        if archive.len() != 1 {
            return Err(AnalysisError::InvalidFormat(format!(
                "Expected exactly one member in {}, found {}",
                path.display(),
                archive.len()
            )));
        }

        let member = archive.by_index(0)?;
        self.read_from(member)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<ObservationRecord>> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let station_column = column_index(&headers, COLUMN_STATION_ID)?;
        let time_column = column_index(&headers, COLUMN_TIME)?;
        let speed_column = column_index(&headers, COLUMN_SPEED)?;
        let direction_column = column_index(&headers, COLUMN_DIRECTION).ok();

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;

            let station_id = parse_field::<u32>(&row, station_column, COLUMN_STATION_ID)?;
            let time = parse_timestamp(field(&row, time_column, COLUMN_TIME)?)?;
            let speed = parse_field::<f64>(&row, speed_column, COLUMN_SPEED)?;
            let direction = match direction_column {
                Some(column) => Some(parse_field::<f64>(&row, column, COLUMN_DIRECTION)?),
                None => None,
            };

            records.push(ObservationRecord::new(station_id, time, speed, direction));
        }

        Ok(records)
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| AnalysisError::MissingData(format!("Column '{}' not found", name)))
}

fn field<'r>(row: &'r StringRecord, column: usize, name: &str) -> Result<&'r str> {
    row.get(column).ok_or_else(|| {
        AnalysisError::InvalidFormat(format!("Row is missing column '{}': {:?}", name, row))
    })
}

fn parse_field<T: std::str::FromStr>(row: &StringRecord, column: usize, name: &str) -> Result<T> {
    let value = field(row, column, name)?;
    value.parse::<T>().map_err(|_| {
        AnalysisError::InvalidFormat(format!("Invalid {} value: '{}'", name, value))
    })
}

/// `YYYYMMDD` (midnight) or `YYYYMMDDHHMM`
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    match value.len() {
        8 => Ok(NaiveDate::parse_from_str(value, "%Y%m%d")?.and_time(chrono::NaiveTime::MIN)),
        12 => Ok(NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M")?),
        _ => Err(AnalysisError::InvalidFormat(format!(
            "Invalid timestamp: '{}'",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::MISSING_VALUE;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const CONTENT: &str = "STATIONS_ID;MESS_DATUM;  QN;FF_10;DD_10;eor
         44;201501010000;    3;   4.1;  230;eor
         44;201501010010;    3;-999.0;-999;eor
         44;201501010020;    3;   3.9;  240;eor
";

    #[test]
    fn test_read_plain_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "{}", CONTENT)?;

        let records = ObservationReader::new().read_observations(temp_file.path())?;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].station_id, 44);
        assert_eq!(records[0].time, parse_timestamp("201501010000")?);
        assert_eq!(records[0].speed, 4.1);
        assert_eq!(records[0].direction, Some(230.0));
        assert_eq!(records[1].speed, MISSING_VALUE);
        assert!(records[1].speed_or_nan().is_nan());

        Ok(())
    }

    #[test]
    fn test_read_zip_archive() -> Result<()> {
        let temp_file = Builder::new().suffix(".zip").tempfile()?;
        {
            let mut zip = zip::ZipWriter::new(temp_file.reopen()?);
            zip.start_file("produkt_zehn_min_ff_00044.txt", zip::write::FileOptions::default())?;
            zip.write_all(CONTENT.as_bytes())?;
            zip.finish()?;
        }

        let records = ObservationReader::new().read_observations(temp_file.path())?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].speed, 3.9);

        Ok(())
    }

    #[test]
    fn test_zip_with_several_members_rejected() -> Result<()> {
        let temp_file = Builder::new().suffix(".zip").tempfile()?;
        {
            let mut zip = zip::ZipWriter::new(temp_file.reopen()?);
            for name in ["a.txt", "b.txt"] {
                zip.start_file(name, zip::write::FileOptions::default())?;
                zip.write_all(CONTENT.as_bytes())?;
            }
            zip.finish()?;
        }

        let result = ObservationReader::new().read_observations(temp_file.path());
        assert!(matches!(result, Err(AnalysisError::InvalidFormat(_))));

        Ok(())
    }

    #[test]
    fn test_missing_column() {
        let result = ObservationReader::new().read_from("STATIONS_ID;MESS_DATUM\n44;20150101\n".as_bytes());
        assert!(matches!(result, Err(AnalysisError::MissingData(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("20150102").unwrap(),
            NaiveDate::from_ymd_opt(2015, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("2015010212").is_err());
        assert!(parse_timestamp("201513010000").is_err());
    }
}

use crate::error::{AnalysisError, Result};
use crate::models::StationResult;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, INDEX_COLUMN,
};
use crate::writers::ResultSink;
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const STATION_ID_KEY: &str = "station_id";
const PERIOD_KEY: &str = "period";

pub struct ParquetResultWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetResultWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(AnalysisError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write one station table: `index` followed by one column per metric
    pub fn write_result(&self, result: &StationResult, path: &Path) -> Result<()> {
        let schema = self.create_schema(result);
        let batch = self.result_to_batch(result, schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_key_value_metadata(Some(vec![
                KeyValue::new(STATION_ID_KEY.to_string(), result.station_id.to_string()),
                KeyValue::new(PERIOD_KEY.to_string(), result.period.clone()),
            ]))
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self, result: &StationResult) -> Arc<Schema> {
        let mut fields = vec![Field::new(INDEX_COLUMN, DataType::Float64, false)];
        fields.extend(
            result
                .columns
                .iter()
                .map(|column| Field::new(column.name.as_str(), DataType::Float64, false)),
        );

        Arc::new(Schema::new(fields))
    }

    fn result_to_batch(&self, result: &StationResult, schema: Arc<Schema>) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(result.index.clone()))];
        for column in &result.columns {
            if column.values.len() != result.index.len() {
                return Err(AnalysisError::shape_mismatch(
                    &format!("column {}", column.name),
                    &[result.index.len()],
                    &[column.values.len()],
                ));
            }
            arrays.push(Arc::new(Float64Array::from(column.values.clone())));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Read a station table written by [`ParquetResultWriter::write_result`]
    pub fn read_station_result(&self, path: &Path) -> Result<StationResult> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let metadata = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        let lookup = |key: &str| {
            metadata
                .iter()
                .find(|kv| kv.key == key)
                .and_then(|kv| kv.value.clone())
        };
        let station_id = lookup(STATION_ID_KEY)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                AnalysisError::MissingData(format!("No station id in {}", path.display()))
            })?;
        let period = lookup(PERIOD_KEY).unwrap_or_default();

        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); schema.fields().len()];
        for batch in reader {
            let batch = batch?;
            for (i, values) in columns.iter_mut().enumerate() {
                let array = batch
                    .column(i)
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        AnalysisError::InvalidFormat(format!(
                            "Column '{}' is not Float64",
                            schema.field(i).name()
                        ))
                    })?;
                values.extend(array.values().iter().copied());
            }
        }

        let mut columns = schema.fields().iter().zip(columns);
        let index = match columns.next() {
            Some((field, values)) if field.name() == INDEX_COLUMN => values,
            _ => {
                return Err(AnalysisError::MissingData(format!(
                    "No '{}' column in {}",
                    INDEX_COLUMN,
                    path.display()
                )))
            }
        };

        let mut result = StationResult::new(station_id, period, index);
        for (field, values) in columns {
            result.push_column(field.name(), values);
        }

        Ok(result)
    }

    pub fn file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let columns = file_metadata.schema_descr().num_columns();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            columns,
            row_groups: row_groups as i32,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetResultWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub columns: usize,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Rings (rows): {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.columns,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}

/// Writes every station table to its own file under a result directory.
///
/// Files are named `station_{id:05}_{YYYYMM}.parquet` so that several
/// stations and reference months never overwrite each other.
pub struct ParquetResultSink {
    writer: ParquetResultWriter,
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl ParquetResultSink {
    pub fn new(writer: ParquetResultWriter, directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(directory)?;
        Ok(Self {
            writer,
            directory: directory.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn path_for(&self, result: &StationResult) -> PathBuf {
        self.directory.join(format!(
            "station_{:05}_{}.parquet",
            result.station_id, result.period
        ))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ResultSink for ParquetResultSink {
    fn write(&mut self, result: &StationResult) -> Result<()> {
        let path = self.path_for(result);
        self.writer.write_result(result, &path)?;
        debug!(path = %path.display(), "Wrote station table");
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::{NamedTempFile, TempDir};

    fn sample_result() -> StationResult {
        let mut result = StationResult::new(44, "201501".to_string(), vec![10.0, 20.0, 30.0]);
        result.push_column("MAE", vec![0.5, 0.75, 1.0]);
        result.push_column("median_RMSE", vec![0.1, f64::NAN, 0.3]);
        result
    }

    #[test]
    fn test_write_and_read_result() -> Result<()> {
        let writer = ParquetResultWriter::new();
        let temp_file = NamedTempFile::new()?;

        let result = sample_result();
        writer.write_result(&result, temp_file.path())?;
        let read = writer.read_station_result(temp_file.path())?;

        assert_eq!(read.station_id, 44);
        assert_eq!(read.period, "201501");
        assert_eq!(read.index, vec![10.0, 20.0, 30.0]);
        assert_eq!(read.column("MAE"), Some(&[0.5, 0.75, 1.0][..]));
        assert!(read.column("median_RMSE").unwrap()[1].is_nan());

        let info = writer.file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 3);
        assert_eq!(info.columns, 3);

        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetResultWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_result(&sample_result(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetResultWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }

    #[test]
    fn test_ragged_column_rejected() {
        let mut result = sample_result();
        result.push_column("MSE", vec![1.0]);
        let temp_file = NamedTempFile::new().unwrap();

        assert!(ParquetResultWriter::new().write_result(&result, temp_file.path()).is_err());
    }

    #[test]
    fn test_sink_names_files_per_station_and_period() -> Result<()> {
        let dir = TempDir::new()?;
        let mut sink = ParquetResultSink::new(ParquetResultWriter::new(), &dir.path().join("out"))?;

        let first = sample_result();
        let mut second = sample_result();
        second.station_id = 3;
        let mut third = sample_result();
        third.period = "201502".to_string();

        for result in [&first, &second, &third] {
            sink.write(result)?;
        }

        assert_eq!(sink.written().len(), 3);
        assert!(dir.path().join("out/station_00044_201501.parquet").exists());
        assert!(dir.path().join("out/station_00003_201501.parquet").exists());
        assert!(dir.path().join("out/station_00044_201502.parquet").exists());

        Ok(())
    }
}

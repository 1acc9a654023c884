use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unsupported metric '{name}': {reason}")]
    UnsupportedMetric { name: String, reason: String },

    #[error("Shape mismatch in {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Station {station_id} not found")]
    StationNotFound { station_id: u32 },

    #[error("Ring {ring} aggregation failed: {message}")]
    RingWorker { ring: usize, message: String },

    #[error("Processing of reference file '{file}' failed: {source}")]
    ReferenceFile {
        file: String,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl From<::config::ConfigError> for AnalysisError {
    fn from(error: ::config::ConfigError) -> Self {
        AnalysisError::Config(error.to_string())
    }
}

impl AnalysisError {
    pub fn unsupported_metric(name: &str, reason: impl Into<String>) -> Self {
        AnalysisError::UnsupportedMetric {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(what: &str, expected: &[usize], found: &[usize]) -> Self {
        AnalysisError::ShapeMismatch {
            what: what.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Wrap an error raised while processing one reference file
    pub fn in_reference_file(self, file: &str) -> Self {
        AnalysisError::ReferenceFile {
            file: file.to_string(),
            source: Box::new(self),
        }
    }
}

pub mod parquet_writer;

pub use parquet_writer::{ParquetFileInfo, ParquetResultSink, ParquetResultWriter};

use crate::error::Result;
use crate::models::StationResult;

/// Destination of finished station tables
pub trait ResultSink {
    fn write(&mut self, result: &StationResult) -> Result<()>;
}

impl ResultSink for Vec<StationResult> {
    fn write(&mut self, result: &StationResult) -> Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

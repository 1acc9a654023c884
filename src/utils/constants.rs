/// Missing-value sentinel used by the station archive
pub const MISSING_VALUE: f64 = -999.0;

/// Station observation file columns
pub const COLUMN_STATION_ID: &str = "STATIONS_ID";
pub const COLUMN_TIME: &str = "MESS_DATUM";
pub const COLUMN_SPEED: &str = "FF_10";
pub const COLUMN_DIRECTION: &str = "DD_10";

/// Output table index column
pub const INDEX_COLUMN: &str = "index";

/// Processing defaults
pub const DEFAULT_THREAD_COUNT: usize = 8;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Prefix of environment overrides for the analysis configuration
pub const ENV_PREFIX: &str = "RING";

/// Parquet compression options
pub const DEFAULT_COMPRESSION: &str = COMPRESSION_SNAPPY;
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

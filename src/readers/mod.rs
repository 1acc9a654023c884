pub mod grid_reader;
pub mod observation_reader;
pub mod station_reader;

pub use grid_reader::{discover_reference_files, GridLoader, JsonGridLoader};
pub use observation_reader::ObservationReader;
pub use station_reader::StationReader;

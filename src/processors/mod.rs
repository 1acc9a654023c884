pub mod analysis;
pub mod deviation;
pub mod grid_projector;
pub mod result_accumulator;
pub mod ring_aggregator;
pub mod station_runner;

pub use analysis::{RingAnalysis, StationGeometry, WindowAnalysis};
pub use deviation::DeviationFields;
pub use grid_projector::{GridProjector, StationPosition};
pub use result_accumulator::ResultAccumulator;
pub use ring_aggregator::RingAggregator;
pub use station_runner::{RunSummary, StationAnalysisRunner};

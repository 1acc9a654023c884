pub mod grid;
pub mod metric;
pub mod observation;
pub mod result;
pub mod ring;
pub mod station;
pub mod window;

pub use grid::GridField;
pub use metric::{DeviationKind, MetricFamily, MetricSet, MetricSpec, OuterStatistic, Reduction};
pub use observation::{ObservationRecord, StationSeries};
pub use result::{MetricColumn, StationResult, WindowRingValues};
pub use ring::{generate_rings, Ring};
pub use station::StationMetadata;
pub use window::{ReferencePeriod, TimeWindow, TimeWindows};

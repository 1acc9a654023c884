use crate::error::Result;
use crate::models::{
    GridField, MetricSet, ReferencePeriod, Ring, StationResult, StationSeries, TimeWindow,
    WindowRingValues,
};
use crate::processors::{
    DeviationFields, GridProjector, ResultAccumulator, RingAggregator, StationPosition,
};
use chrono::NaiveDateTime;
use ndarray::Array2;
use tracing::debug;

/// Grid geometry of one station, computed once per station and reference grid
#[derive(Debug, Clone)]
pub struct StationGeometry {
    pub position: StationPosition,
    /// Disk of the outermost radius; bounds the projected field
    pub extent: Array2<bool>,
    /// One mask per ring, in ring order
    pub ring_masks: Vec<Array2<bool>>,
}

/// Per-window computation and per-station reduction injected into the runner
pub trait WindowAnalysis {
    fn metrics(&self) -> &MetricSet;

    fn rings(&self) -> &[Ring];

    fn prepare_station(&self, grid: &GridField, station: &StationSeries) -> Result<StationGeometry>;

    fn compute_window(
        &self,
        geometry: &StationGeometry,
        grid: &GridField,
        observations: &[(NaiveDateTime, f64)],
        window: &TimeWindow,
    ) -> Result<WindowRingValues>;

    fn finalize(
        &self,
        accumulator: &mut ResultAccumulator,
        station: &StationSeries,
        period: &ReferencePeriod,
    ) -> Result<StationResult> {
        accumulator.finalize(
            self.metrics(),
            self.rings(),
            station.station_id,
            &period.label(),
        )
    }
}

/// Distance-binned comparison of a station against the reference grid
pub struct RingAnalysis {
    metrics: MetricSet,
    rings: Vec<Ring>,
    aggregator: RingAggregator,
}

impl RingAnalysis {
    pub fn new(metrics: MetricSet, rings: Vec<Ring>, aggregator: RingAggregator) -> Self {
        Self {
            metrics,
            rings,
            aggregator,
        }
    }

    fn outer_radius(&self) -> f64 {
        self.rings.iter().map(|r| r.outer).fold(0.0, f64::max)
    }
}

impl WindowAnalysis for RingAnalysis {
    fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    fn rings(&self) -> &[Ring] {
        &self.rings
    }

    fn prepare_station(&self, grid: &GridField, station: &StationSeries) -> Result<StationGeometry> {
        let position = GridProjector::locate(grid, station.latitude, station.longitude)?;
        debug!(
            station_id = station.station_id,
            row = position.row,
            column = position.column,
            "Located station on grid"
        );

        let extent = GridProjector::distance_mask(grid, &position, self.outer_radius());
        let ring_masks = self
            .rings
            .iter()
            .map(|ring| GridProjector::ring_mask(grid, &position, ring))
            .collect();

        Ok(StationGeometry {
            position,
            extent,
            ring_masks,
        })
    }

    fn compute_window(
        &self,
        geometry: &StationGeometry,
        grid: &GridField,
        observations: &[(NaiveDateTime, f64)],
        window: &TimeWindow,
    ) -> Result<WindowRingValues> {
        let projected = GridProjector::project(observations, grid, window, Some(&geometry.extent))?;
        let fields = DeviationFields::compute(
            projected.view(),
            grid.window_values(window),
            &self.metrics.deviations(),
        )?;

        self.aggregator
            .aggregate(&fields, &self.metrics, &geometry.ring_masks)
    }
}

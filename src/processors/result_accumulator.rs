use crate::error::{AnalysisError, Result};
use crate::models::{DeviationKind, MetricSet, Ring, StationResult, WindowRingValues};

/// Running per-kind, per-ring value arrays of the station being processed.
///
/// Metrics sharing a deviation kind share one array. Windows must be fed in
/// chronological order; values are appended so the arrays stay in temporal
/// order.
#[derive(Debug, Clone)]
pub struct ResultAccumulator {
    kinds: Vec<DeviationKind>,
    ring_count: usize,
    /// Indexed `[kind][ring]`
    values: Vec<Vec<Vec<f64>>>,
    windows: usize,
}

impl ResultAccumulator {
    pub fn new(kinds: Vec<DeviationKind>, ring_count: usize) -> Self {
        let values = vec![vec![Vec::new(); ring_count]; kinds.len()];
        Self {
            kinds,
            ring_count,
            values,
            windows: 0,
        }
    }

    /// Layout matching what [`crate::processors::RingAggregator`] produces for `metrics`
    pub fn for_metrics(metrics: &MetricSet, ring_count: usize) -> Self {
        Self::new(metrics.deviations(), ring_count)
    }

    /// Append one window's `[ring][kind]` values
    pub fn accumulate(&mut self, window: WindowRingValues) -> Result<()> {
        if window.len() != self.ring_count {
            return Err(AnalysisError::shape_mismatch(
                "window ring results",
                &[self.ring_count],
                &[window.len()],
            ));
        }
        if let Some(ring) = window.iter().find(|ring| ring.len() != self.kinds.len()) {
            return Err(AnalysisError::shape_mismatch(
                "window deviation results",
                &[self.kinds.len()],
                &[ring.len()],
            ));
        }

        for (ring_index, ring) in window.into_iter().enumerate() {
            for (kind_index, mut values) in ring.into_iter().enumerate() {
                self.values[kind_index][ring_index].append(&mut values);
            }
        }
        self.windows += 1;

        Ok(())
    }

    pub fn windows(&self) -> usize {
        self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows == 0
    }

    pub fn ring_values(&self, kind: DeviationKind, ring_index: usize) -> Option<&[f64]> {
        let kind_index = self.kinds.iter().position(|k| *k == kind)?;
        self.values[kind_index].get(ring_index).map(|v| v.as_slice())
    }

    /// Reduce every `(metric, ring)` pair to a scalar and reset the state.
    ///
    /// Each ring is reduced on its own; arrays are never merged across rings.
    pub fn finalize(
        &mut self,
        metrics: &MetricSet,
        rings: &[Ring],
        station_id: u32,
        period: &str,
    ) -> Result<StationResult> {
        if rings.len() != self.ring_count {
            return Err(AnalysisError::shape_mismatch(
                "accumulator rings",
                &[self.ring_count],
                &[rings.len()],
            ));
        }

        let index = rings.iter().map(|ring| ring.outer).collect();
        let mut result = StationResult::new(station_id, period.to_string(), index);

        for metric in metrics.iter() {
            let kind_index = self
                .kinds
                .iter()
                .position(|k| *k == metric.deviation())
                .ok_or_else(|| {
                    AnalysisError::MissingData(format!(
                        "No {:?} values accumulated for metric {}",
                        metric.deviation(),
                        metric.name
                    ))
                })?;
            let column = self.values[kind_index]
                .iter()
                .map(|values| metric.reduce(values))
                .collect();
            result.push_column(&metric.name, column);
        }

        self.reset();
        Ok(result)
    }

    pub fn reset(&mut self) {
        for per_ring in self.values.iter_mut() {
            for values in per_ring.iter_mut() {
                values.clear();
            }
        }
        self.windows = 0;
    }
}

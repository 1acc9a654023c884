use crate::error::{AnalysisError, Result};
use crate::models::{MetricSet, WindowRingValues};
use crate::processors::DeviationFields;
use crossbeam::channel;
use ndarray::Array2;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Collects the finite deviation values under each ring mask.
///
/// With more than one thread the rings are spread over a bounded worker
/// pool. Each worker tags its result with the ring's position, so the
/// assembled output follows ring order regardless of completion order.
pub struct RingAggregator {
    thread_count: usize,
    pool: Option<rayon::ThreadPool>,
}

impl RingAggregator {
    pub fn new(thread_count: usize) -> Result<Self> {
        if thread_count == 0 {
            return Err(AnalysisError::Config(
                "thread_count must be at least 1".to_string(),
            ));
        }

        let pool = if thread_count > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(thread_count)
                    .thread_name(|i| format!("ring-worker-{}", i))
                    .build()
                    .map_err(|e| AnalysisError::Config(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Self { thread_count, pool })
    }

    pub fn sequential() -> Self {
        Self {
            thread_count: 1,
            pool: None,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Per-ring finite deviation values, indexed `[ring][kind]` in
    /// [`MetricSet::deviations`] order
    pub fn aggregate(
        &self,
        fields: &DeviationFields,
        metrics: &MetricSet,
        ring_masks: &[Array2<bool>],
    ) -> Result<WindowRingValues> {
        match &self.pool {
            Some(pool) => Self::aggregate_pooled(pool, fields, metrics, ring_masks),
            None => ring_masks
                .iter()
                .enumerate()
                .map(|(index, mask)| aggregate_ring(index, mask, fields, metrics))
                .collect(),
        }
    }

    fn aggregate_pooled(
        pool: &rayon::ThreadPool,
        fields: &DeviationFields,
        metrics: &MetricSet,
        ring_masks: &[Array2<bool>],
    ) -> Result<WindowRingValues> {
        let (sender, receiver) = channel::unbounded();

        pool.scope(|scope| {
            for (index, mask) in ring_masks.iter().enumerate() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        aggregate_ring(index, mask, fields, metrics)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(AnalysisError::RingWorker {
                            ring: index,
                            message: panic_message(payload.as_ref()),
                        })
                    });
                    // The receiver outlives the scope
                    let _ = sender.send((index, result));
                });
            }
        });
        drop(sender);

        let mut slots: Vec<Option<Vec<Vec<f64>>>> = vec![None; ring_masks.len()];
        let mut failure: Option<(usize, AnalysisError)> = None;

        for (index, result) in receiver.iter() {
            match result {
                Ok(values) => slots[index] = Some(values),
                Err(e) => {
                    debug!(ring = index, error = %e, "Ring worker failed");
                    // Report the lowest failing ring so the error is deterministic
                    if failure.as_ref().map_or(true, |(first, _)| index < *first) {
                        failure = Some((index, e));
                    }
                }
            }
        }

        if let Some((_, e)) = failure {
            return Err(e);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| AnalysisError::RingWorker {
                    ring: index,
                    message: "worker finished without a result".to_string(),
                })
            })
            .collect()
    }
}

/// Finite values under one ring mask, one array per deviation kind of the set
fn aggregate_ring(
    index: usize,
    mask: &Array2<bool>,
    fields: &DeviationFields,
    metrics: &MetricSet,
) -> Result<Vec<Vec<f64>>> {
    metrics
        .deviations()
        .into_iter()
        .map(|kind| {
            let field = fields.get(kind)?;
            let (_, ny, nx) = field.dim();
            if mask.dim() != (ny, nx) {
                return Err(AnalysisError::RingWorker {
                    ring: index,
                    message: AnalysisError::shape_mismatch("ring mask", &[ny, nx], mask.shape())
                        .to_string(),
                });
            }

            let mut values = Vec::new();
            for plane in field.outer_iter() {
                values.extend(
                    plane
                        .iter()
                        .zip(mask.iter())
                        .filter(|(v, inside)| **inside && v.is_finite())
                        .map(|(v, _)| *v),
                );
            }
            Ok(values)
        })
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "ring worker panicked".to_string()
    }
}

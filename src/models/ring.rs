use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Annulus `inner <= d < outer` around a station; `inner == 0` is a filled disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub inner: f64,
    pub outer: f64,
}

impl Ring {
    pub fn new(inner: f64, outer: f64) -> Result<Self> {
        if !(inner >= 0.0 && outer > inner) {
            return Err(AnalysisError::Config(format!(
                "Invalid ring ({}, {}): radii must satisfy 0 <= inner < outer",
                inner, outer
            )));
        }
        Ok(Self { inner, outer })
    }

    pub fn is_disk(&self) -> bool {
        self.inner <= 0.0
    }
}

/// Rings from consecutive pairs of `start, start + step, ..., end`
pub fn generate_rings(start: f64, end: f64, step: f64) -> Result<Vec<Ring>> {
    if !(step > 0.0) || !(start >= 0.0) || !(end > start) {
        return Err(AnalysisError::Config(format!(
            "Invalid radius range start={} end={} step={}",
            start, end, step
        )));
    }

    // Tolerate float noise so that e.g. (0, 0.3, 0.1) gives three rings
    let count = ((end - start) / step + 1e-9).floor() as usize;
    if count == 0 {
        return Err(AnalysisError::Config(format!(
            "Radius step {} is larger than the range {}..{}",
            step, start, end
        )));
    }

    (0..count)
        .map(|k| {
            let inner = start + k as f64 * step;
            let outer = start + (k + 1) as f64 * step;
            Ring::new(inner, outer)
        })
        .collect()
}

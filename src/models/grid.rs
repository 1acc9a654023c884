use crate::error::{AnalysisError, Result};
use crate::models::TimeWindow;
use chrono::NaiveDateTime;
use ndarray::{s, Array1, Array2, Array3, ArrayView3};

/// Reference scalar field over `(time, Y, X)` with projected axes and
/// geographic coordinates per cell
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    /// Latitude per cell, shape `(Y, X)`
    pub lat: Array2<f64>,
    /// Longitude per cell, shape `(Y, X)`
    pub lon: Array2<f64>,
    /// Sorted ascending
    pub times: Vec<NaiveDateTime>,
    /// Shape `(time, Y, X)`
    pub values: Array3<f64>,
}

impl GridField {
    pub fn new(
        x: Array1<f64>,
        y: Array1<f64>,
        lat: Array2<f64>,
        lon: Array2<f64>,
        times: Vec<NaiveDateTime>,
        values: Array3<f64>,
    ) -> Result<Self> {
        let plane = [y.len(), x.len()];

        if lat.shape() != plane {
            return Err(AnalysisError::shape_mismatch("lat", &plane, lat.shape()));
        }
        if lon.shape() != plane {
            return Err(AnalysisError::shape_mismatch("lon", &plane, lon.shape()));
        }

        let expected = [times.len(), y.len(), x.len()];
        if values.shape() != expected {
            return Err(AnalysisError::shape_mismatch(
                "values",
                &expected,
                values.shape(),
            ));
        }

        if times.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(AnalysisError::InvalidFormat(
                "Grid time axis must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            x,
            y,
            lat,
            lon,
            times,
            values,
        })
    }

    /// `(Y, X)` extent of one time step
    pub fn plane_shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Index range of grid time steps inside `window`
    pub fn time_range(&self, window: &TimeWindow) -> std::ops::Range<usize> {
        let lo = self.times.partition_point(|t| *t < window.start);
        let hi = self.times.partition_point(|t| *t < window.stop);
        lo..hi.max(lo)
    }

    pub fn window_times(&self, window: &TimeWindow) -> &[NaiveDateTime] {
        &self.times[self.time_range(window)]
    }

    pub fn window_values(&self, window: &TimeWindow) -> ArrayView3<'_, f64> {
        let range = self.time_range(window);
        self.values.slice(s![range, .., ..])
    }
}

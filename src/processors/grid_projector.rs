use crate::error::{AnalysisError, Result};
use crate::models::{GridField, Ring, TimeWindow};
use chrono::NaiveDateTime;
use ndarray::{Array2, Array3, Zip};

/// Station location on the grid's projected axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationPosition {
    /// Row (Y) index whose latitude is closest to the station's
    pub row: usize,
    /// Column (X) index whose longitude is closest to the station's
    pub column: usize,
    pub x: f64,
    pub y: f64,
}

pub struct GridProjector;

impl GridProjector {
    /// Locate a station by two independent per-axis searches: the row comes
    /// from the closest latitude, the column from the closest longitude.
    pub fn locate(grid: &GridField, latitude: f64, longitude: f64) -> Result<StationPosition> {
        let (lat_row, _) = argmin_distance(&grid.lat, latitude).ok_or_else(|| {
            AnalysisError::MissingData("Grid has no finite latitude values".to_string())
        })?;
        let (_, lon_column) = argmin_distance(&grid.lon, longitude).ok_or_else(|| {
            AnalysisError::MissingData("Grid has no finite longitude values".to_string())
        })?;

        Ok(StationPosition {
            row: lat_row,
            column: lon_column,
            x: grid.x[lon_column],
            y: grid.y[lat_row],
        })
    }

    /// Cells whose Euclidean distance to the station position is `< radius`
    pub fn distance_mask(grid: &GridField, position: &StationPosition, radius: f64) -> Array2<bool> {
        let (ny, nx) = grid.plane_shape();
        Array2::from_shape_fn((ny, nx), |(j, i)| {
            let dx = grid.x[i] - position.x;
            let dy = grid.y[j] - position.y;
            (dx * dx + dy * dy).sqrt() < radius
        })
    }

    pub fn mask(grid: &GridField, latitude: f64, longitude: f64, radius: f64) -> Result<Array2<bool>> {
        let position = Self::locate(grid, latitude, longitude)?;
        Ok(Self::distance_mask(grid, &position, radius))
    }

    /// Outer disk minus inner disk; the innermost ring is a filled disk
    pub fn ring_mask(grid: &GridField, position: &StationPosition, ring: &Ring) -> Array2<bool> {
        let outer = Self::distance_mask(grid, position, ring.outer);
        if ring.is_disk() {
            return outer;
        }

        let inner = Self::distance_mask(grid, position, ring.inner);
        Zip::from(&outer)
            .and(&inner)
            .map_collect(|&outer, &inner| outer && !inner)
    }

    /// Broadcast the station's value at each grid time step of `window`
    /// across the grid plane. Cells outside `extent` (when given) and time
    /// steps without an observation are NaN.
    pub fn project(
        observations: &[(NaiveDateTime, f64)],
        grid: &GridField,
        window: &TimeWindow,
        extent: Option<&Array2<bool>>,
    ) -> Result<Array3<f64>> {
        let (ny, nx) = grid.plane_shape();
        if let Some(extent) = extent {
            if extent.dim() != (ny, nx) {
                return Err(AnalysisError::shape_mismatch(
                    "projection extent",
                    &[ny, nx],
                    extent.shape(),
                ));
            }
        }

        let times = grid.window_times(window);
        let mut projected = Array3::from_elem((times.len(), ny, nx), f64::NAN);

        for (mut plane, time) in projected.outer_iter_mut().zip(times) {
            let value = match observations.binary_search_by(|(t, _)| t.cmp(time)) {
                Ok(found) => observations[found].1,
                Err(_) => continue,
            };

            match extent {
                Some(extent) => Zip::from(&mut plane).and(extent).for_each(|cell, &inside| {
                    if inside {
                        *cell = value;
                    }
                }),
                None => plane.fill(value),
            }
        }

        Ok(projected)
    }
}

/// `(row, column)` of the finite cell closest to `target`
fn argmin_distance(field: &Array2<f64>, target: f64) -> Option<(usize, usize)> {
    field
        .indexed_iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(index, v)| (index, (v - target).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generate_rings;
    use crate::models::grid::testing::{constant_grid, hour};

    #[test]
    fn test_locate_is_independent_per_axis() {
        let grid = constant_grid(10, 12, 1, 0.0);
        // lat = 50 + row, lon = 10 + column
        let position = GridProjector::locate(&grid, 53.2, 17.9).unwrap();

        assert_eq!(position.row, 3);
        assert_eq!(position.column, 8);
        assert_eq!(position.x, 8.0);
        assert_eq!(position.y, 3.0);
    }

    #[test]
    fn test_distance_mask_is_strict() {
        let grid = constant_grid(11, 11, 1, 0.0);
        let position = GridProjector::locate(&grid, 55.0, 15.0).unwrap();
        let mask = GridProjector::distance_mask(&grid, &position, 1.0);

        // Only the centre cell lies strictly within distance 1
        assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
        assert!(mask[[5, 5]]);

        let mask = GridProjector::distance_mask(&grid, &position, 1.5);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 9);
    }

    #[test]
    fn test_rings_partition_the_outer_disk() {
        let grid = constant_grid(81, 81, 1, 0.0);
        let position = GridProjector::locate(&grid, 90.0, 50.0).unwrap();
        let rings = generate_rings(0.0, 30.0, 10.0).unwrap();

        let masks: Vec<Array2<bool>> = rings
            .iter()
            .map(|ring| GridProjector::ring_mask(&grid, &position, ring))
            .collect();
        let full = GridProjector::distance_mask(&grid, &position, 30.0);

        for (index, inside) in full.indexed_iter() {
            let hits = masks.iter().filter(|m| m[index]).count();
            if *inside {
                assert_eq!(hits, 1, "cell {:?} must be in exactly one ring", index);
            } else {
                assert_eq!(hits, 0, "cell {:?} lies outside every ring", index);
            }
        }
    }

    #[test]
    fn test_project_broadcasts_per_time_step() {
        let grid = constant_grid(3, 3, 4, 0.0);
        let observations = vec![(hour(0), 1.5), (hour(1), 2.5), (hour(3), 4.5)];
        let window = TimeWindow::new(hour(0), hour(4));

        let projected = GridProjector::project(&observations, &grid, &window, None).unwrap();

        assert_eq!(projected.dim(), (4, 3, 3));
        assert!(projected.index_axis(ndarray::Axis(0), 0).iter().all(|&v| v == 1.5));
        assert!(projected.index_axis(ndarray::Axis(0), 1).iter().all(|&v| v == 2.5));
        assert!(projected.index_axis(ndarray::Axis(0), 2).iter().all(|v| v.is_nan()));
        assert!(projected.index_axis(ndarray::Axis(0), 3).iter().all(|&v| v == 4.5));
    }

    #[test]
    fn test_project_respects_extent() {
        let grid = constant_grid(5, 5, 1, 0.0);
        let position = GridProjector::locate(&grid, 52.0, 12.0).unwrap();
        let extent = GridProjector::distance_mask(&grid, &position, 1.5);
        let window = TimeWindow::new(hour(0), hour(1));

        let projected =
            GridProjector::project(&[(hour(0), 3.0)], &grid, &window, Some(&extent)).unwrap();

        assert_eq!(projected.iter().filter(|v| v.is_finite()).count(), 9);
        assert!(projected[[0, 0, 0]].is_nan());
        assert_eq!(projected[[0, 2, 2]], 3.0);

        let wrong = Array2::from_elem((4, 4), true);
        assert!(GridProjector::project(&[], &grid, &window, Some(&wrong)).is_err());
    }
}

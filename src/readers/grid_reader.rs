use crate::error::{AnalysisError, Result};
use crate::models::{GridField, ReferencePeriod};
use chrono::NaiveDateTime;
use memmap2::Mmap;
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of reference grids, one per file
pub trait GridLoader {
    fn load(&self, path: &Path) -> Result<GridField>;
}

impl<F> GridLoader for F
where
    F: Fn(&Path) -> Result<GridField>,
{
    fn load(&self, path: &Path) -> Result<GridField> {
        self(path)
    }
}

/// On-disk layout read by [`JsonGridLoader`]
#[derive(Debug, Serialize, Deserialize)]
struct GridDocument {
    x: Vec<f64>,
    y: Vec<f64>,
    /// `[Y][X]`
    lat: Vec<Vec<f64>>,
    /// `[Y][X]`
    lon: Vec<Vec<f64>>,
    time: Vec<NaiveDateTime>,
    /// `[time][Y][X]`, null for undefined cells
    values: Vec<Vec<Vec<Option<f64>>>>,
}

/// Loads reference grids stored as JSON documents
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonGridLoader;

impl JsonGridLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn save(&self, grid: &GridField, path: &Path) -> Result<()> {
        let document = GridDocument {
            x: grid.x.to_vec(),
            y: grid.y.to_vec(),
            lat: grid.lat.outer_iter().map(|row| row.to_vec()).collect(),
            lon: grid.lon.outer_iter().map(|row| row.to_vec()).collect(),
            time: grid.times.clone(),
            values: grid
                .values
                .outer_iter()
                .map(|plane| {
                    plane
                        .outer_iter()
                        .map(|row| row.iter().map(|v| v.is_finite().then_some(*v)).collect())
                        .collect()
                })
                .collect(),
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &document)?;
        Ok(())
    }
}

impl GridLoader for JsonGridLoader {
    fn load(&self, path: &Path) -> Result<GridField> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let document: GridDocument = serde_json::from_slice(&mmap)?;

        let (nt, ny, nx) = (document.time.len(), document.y.len(), document.x.len());
        debug!(path = %path.display(), nt, ny, nx, "Parsed reference grid");

        let lat = to_array2(document.lat, "lat", ny, nx)?;
        let lon = to_array2(document.lon, "lon", ny, nx)?;

        if document.values.len() != nt {
            return Err(AnalysisError::shape_mismatch(
                "values",
                &[nt],
                &[document.values.len()],
            ));
        }
        let mut flat = Vec::with_capacity(nt * ny * nx);
        for plane in document.values {
            let plane = to_array2(plane, "values", ny, nx)?;
            flat.extend(plane.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        let values = Array3::from_shape_vec((nt, ny, nx), flat)?;

        GridField::new(
            Array1::from(document.x),
            Array1::from(document.y),
            lat,
            lon,
            document.time,
            values,
        )
    }
}

fn to_array2<T: Clone>(rows: Vec<Vec<T>>, what: &str, ny: usize, nx: usize) -> Result<Array2<T>> {
    if rows.len() != ny {
        return Err(AnalysisError::shape_mismatch(what, &[ny, nx], &[rows.len()]));
    }
    if let Some(row) = rows.iter().find(|row| row.len() != nx) {
        return Err(AnalysisError::shape_mismatch(what, &[ny, nx], &[ny, row.len()]));
    }

    let flat: Vec<T> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((ny, nx), flat)?)
}

/// Reference files in `dir`, sorted by name, whose names carry a `YYYYMM` period
pub fn discover_reference_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AnalysisError::Config(format!(
            "Reference path is not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if ReferencePeriod::from_file_name(name).is_ok() {
            files.push(path);
        } else {
            debug!(file = name, "Ignoring file without reference period");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::testing::constant_grid;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("FF_201501.json");

        let mut grid = constant_grid(3, 4, 2, 7.5);
        grid.values[[1, 2, 3]] = f64::NAN;

        let loader = JsonGridLoader::new();
        loader.save(&grid, &path)?;
        let loaded = loader.load(&path)?;

        assert_eq!(loaded.plane_shape(), (3, 4));
        assert_eq!(loaded.times, grid.times);
        assert_eq!(loaded.lat, grid.lat);
        assert_eq!(loaded.values[[0, 0, 0]], 7.5);
        assert!(loaded.values[[1, 2, 3]].is_nan());

        Ok(())
    }

    #[test]
    fn test_ragged_rows_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("FF_201501.json");
        fs::write(
            &path,
            r#"{"x":[0,1],"y":[0],"lat":[[50,50]],"lon":[[10]],"time":["2015-01-01T00:00:00"],"values":[[[1,2]]]}"#,
        )?;

        let result = JsonGridLoader::new().load(&path);
        assert!(matches!(result, Err(AnalysisError::ShapeMismatch { .. })));

        Ok(())
    }

    #[test]
    fn test_discover_reference_files() -> Result<()> {
        let dir = TempDir::new()?;
        for name in ["FF_201502.json", "FF_201501.json", "notes.txt", "FF_20.json"] {
            fs::write(dir.path().join(name), "{}")?;
        }
        fs::create_dir(dir.path().join("FF_201503"))?;

        let files = discover_reference_files(dir.path())?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["FF_201501.json", "FF_201502.json"]);
        assert!(discover_reference_files(&dir.path().join("missing")).is_err());

        Ok(())
    }
}

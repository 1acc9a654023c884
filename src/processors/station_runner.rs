use crate::error::{AnalysisError, Result};
use crate::models::{GridField, ReferencePeriod, StationResult, StationSeries};
use crate::processors::{ResultAccumulator, WindowAnalysis};
use crate::readers::GridLoader;
use crate::utils::progress::ProgressReporter;
use crate::writers::ResultSink;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub stations_written: usize,
    pub windows_processed: usize,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "Reference files: {} processed, {} failed\nStation tables written: {}\nTime windows processed: {}",
            self.files_processed, self.files_failed, self.stations_written, self.windows_processed
        )
    }
}

/// Drives reference files x stations x time windows on the calling thread.
///
/// A failure inside one reference file abandons that file only; the run
/// continues with the next file.
pub struct StationAnalysisRunner<A, L> {
    analysis: A,
    loader: L,
    max_days: u32,
}

impl<A: WindowAnalysis, L: GridLoader> StationAnalysisRunner<A, L> {
    pub fn new(analysis: A, loader: L, max_days: u32) -> Result<Self> {
        if max_days == 0 {
            return Err(AnalysisError::Config(
                "max_days must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            analysis,
            loader,
            max_days,
        })
    }

    pub fn run<S: ResultSink>(
        &self,
        reference_files: &[PathBuf],
        stations: &[StationSeries],
        sink: &mut S,
        progress: Option<&ProgressReporter>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(
            files = reference_files.len(),
            stations = stations.len(),
            metrics = ?self.analysis.metrics().names(),
            rings = self.analysis.rings().len(),
            "Starting station analysis"
        );

        for (count, path) in reference_files.iter().enumerate() {
            let file_name = display_name(path);
            if let Some(p) = progress {
                p.set_message(&format!("Processing {}", file_name));
            }

            match self.process_reference_file(path, stations, sink, &mut summary) {
                Ok(written) => {
                    summary.files_processed += 1;
                    info!(file = %file_name, stations_written = written, "Reference file complete");
                }
                Err(e) => {
                    summary.files_failed += 1;
                    let e = e.in_reference_file(&file_name);
                    error!(file = %file_name, error = %e, "Skipping reference file");
                }
            }

            if let Some(p) = progress {
                p.update((count + 1) as u64);
            }
        }

        if let Some(p) = progress {
            p.finish_with_message("Analysis complete");
        }
        info!(?summary, "Station analysis finished");
        summary
    }

    fn process_reference_file<S: ResultSink>(
        &self,
        path: &Path,
        stations: &[StationSeries],
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<usize> {
        let file_name = display_name(path);
        let period = ReferencePeriod::from_file_name(&file_name)?;

        debug!(file = %file_name, "Loading reference grid");
        let grid = self.loader.load(path)?;

        let mut written = 0;
        for station in stations {
            let (result, windows) = self.process_station(&grid, station, &period)?;
            summary.windows_processed += windows;

            match result {
                Some(result) => {
                    sink.write(&result)?;
                    summary.stations_written += 1;
                    written += 1;
                }
                None => warn!(
                    station_id = station.station_id,
                    period = %period.label(),
                    "No observations at the start of the reference period"
                ),
            }
        }

        Ok(written)
    }

    /// Window loop of one station; `None` when not a single window had data
    pub fn process_station(
        &self,
        grid: &GridField,
        station: &StationSeries,
        period: &ReferencePeriod,
    ) -> Result<(Option<StationResult>, usize)> {
        let geometry = self.analysis.prepare_station(grid, station)?;
        let mut accumulator =
            ResultAccumulator::for_metrics(self.analysis.metrics(), self.analysis.rings().len());

        for window in period.windows(self.max_days)? {
            let observations = station.slice(&window);
            if observations.is_empty() {
                break;
            }

            debug!(
                station_id = station.station_id,
                start = %window.start,
                stop = %window.stop,
                observations = observations.len(),
                "Processing window"
            );
            let values = self
                .analysis
                .compute_window(&geometry, grid, observations, &window)?;
            accumulator.accumulate(values)?;
        }

        let windows = accumulator.windows();
        if accumulator.is_empty() {
            return Ok((None, 0));
        }

        let result = self.analysis.finalize(&mut accumulator, station, period)?;
        Ok((Some(result), windows))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

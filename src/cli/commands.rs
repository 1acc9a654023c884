use crate::cli::args::{Cli, Commands};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::models::StationSeries;
use crate::processors::{RingAggregator, RingAnalysis, RunSummary, StationAnalysisRunner};
use crate::readers::{discover_reference_files, JsonGridLoader, ObservationReader, StationReader};
use crate::utils::progress::ProgressReporter;
use crate::writers::{ParquetResultSink, ParquetResultWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run { config, threads } => {
            let mut config = AnalysisConfig::from_file(&config)?;
            if let Some(threads) = threads {
                config.thread_count = threads;
                config.check()?;
            }

            let summary = run_analysis(&config, cli.quiet)?;
            println!("\n{}", summary.summary());
        }

        Commands::Info { file } => {
            println!("Reading station table: {}", file.display());

            let writer = ParquetResultWriter::new();
            let result = writer.read_station_result(&file)?;
            let file_info = writer.file_info(&file)?;

            println!("\n{}", result.summary());
            println!("\nFile Details:");
            println!("{}", file_info.summary());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
                .with_target(true)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    installed.map_err(|e| AnalysisError::Config(format!("Failed to install logger: {}", e)))
}

/// Full run: stations, reference files, per-station tables under `result_path`
pub fn run_analysis(config: &AnalysisConfig, quiet: bool) -> Result<RunSummary> {
    let metrics = config.metric_set()?;
    let rings = config.rings()?;
    info!(
        metrics = ?metrics.names(),
        rings = rings.len(),
        threads = config.thread_count,
        max_days = config.max_days,
        "Loaded configuration"
    );

    let loading = ProgressReporter::new_spinner("Loading station observations...", quiet);
    let stations = load_stations(&config.station_description, &config.station_files)?;
    loading.finish_with_message(&format!("Loaded {} stations", stations.len()));

    let reference_files = discover_reference_files(&config.reference_path)?;
    if reference_files.is_empty() {
        warn!(path = %config.reference_path.display(), "No reference files found");
    }

    let aggregator = RingAggregator::new(config.thread_count)?;
    let analysis = RingAnalysis::new(metrics, rings, aggregator);
    let runner = StationAnalysisRunner::new(analysis, JsonGridLoader::new(), config.max_days)?;

    let writer = ParquetResultWriter::new().with_compression(&config.compression)?;
    let mut sink = ParquetResultSink::new(writer, &config.result_path)?;

    let progress = ProgressReporter::new(
        reference_files.len() as u64,
        "Processing reference files...",
        quiet,
    );
    Ok(runner.run(&reference_files, &stations, &mut sink, Some(&progress)))
}

/// Read the station description once and build an hourly series per observation file
pub fn load_stations(description: &Path, station_files: &[PathBuf]) -> Result<Vec<StationSeries>> {
    let metadata = StationReader::new().read_stations_map(description)?;
    let reader = ObservationReader::new();

    let mut stations = Vec::with_capacity(station_files.len());
    for path in station_files {
        let records = reader.read_observations(path)?;
        let Some(first) = records.first() else {
            warn!(file = %path.display(), "Observation file has no records");
            continue;
        };

        let station = metadata
            .get(&first.station_id)
            .ok_or(AnalysisError::StationNotFound {
                station_id: first.station_id,
            })?;
        let series = StationSeries::from_records(station, &records)?;
        info!(
            station_id = station.station_id,
            name = %station.name,
            hours = series.len(),
            "Loaded station observations"
        );
        stations.push(series);
    }

    Ok(stations)
}

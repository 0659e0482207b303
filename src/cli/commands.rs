use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use crate::cli::args::{Cli, Commands};
use crate::detection::EpisodeScanner;
use crate::ingest::{self, read_response, ForecastRequest};
use crate::models::CalimaEpisode;
use crate::storage::{MemoryStore, ModifyRepository, ReadRepository};
use crate::utils::constants::CANARY_LOCATIONS;
use crate::utils::logging::{init_logging, resolve_level};
use crate::utils::progress::ProgressReporter;
use crate::utils::Settings;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    init_logging(
        resolve_level(cli.verbose, &settings.log_level),
        cli.log_file.as_deref(),
    )?;

    let store_path = cli.store.unwrap_or(settings.store_path);
    let store = MemoryStore::load(&store_path)
        .with_context(|| format!("loading store from {}", store_path.display()))?;

    match cli.command {
        Commands::Init => {
            let mut created = 0;
            for (name, latitude, longitude) in CANARY_LOCATIONS {
                if store.get_location(name)?.is_some() {
                    continue;
                }
                store.add_location(name, latitude, longitude)?;
                created += 1;
            }
            println!("Registered {} new location(s)", created);
            save(&store, &store_path)?;
        }

        Commands::AddLocation {
            name,
            latitude,
            longitude,
        } => {
            let location = store.add_location(&name, latitude, longitude)?;
            println!(
                "Location '{}' created at ({:.4}, {:.4})",
                location.name, location.latitude, location.longitude
            );
            save(&store, &store_path)?;
        }

        Commands::RemoveLocation { name } => match store.delete_location(&name)? {
            Some(report) => {
                println!(
                    "Deleted '{}' with {} measurement(s) and {} episode(s)",
                    name, report.readings, report.episodes
                );
                save(&store, &store_path)?;
            }
            None => bail!("unknown location '{}'", name),
        },

        Commands::Import {
            location,
            input_file,
        } => {
            if store.get_location(&location)?.is_none() {
                bail!("unknown location '{}'", location);
            }

            let series = read_response(&input_file)
                .with_context(|| format!("reading {}", input_file.display()))?;
            let total = series.len();
            let inserted = store.bulk_add_measurements(&location, series.to_measurements())?;

            println!(
                "Imported {} of {} hourly measurement(s) for '{}'",
                inserted, total, location
            );
            save(&store, &store_path)?;
        }

        Commands::Fetch { location, days } => {
            let site = store
                .get_location(&location)?
                .with_context(|| format!("unknown location '{}'", location))?;
            let request = match days {
                Some(days) => ForecastRequest::history_at(site.latitude, site.longitude, days)?,
                None => ForecastRequest::update_at(site.latitude, site.longitude)?,
            };

            let client = ingest::client()?;
            let series = ingest::fetch(&client, &request)
                .with_context(|| format!("fetching {}", request.url()))?;
            let total = series.len();
            let inserted = store.bulk_add_measurements(&location, series.to_measurements())?;

            println!(
                "Fetched {} new of {} hourly measurement(s) for '{}'",
                inserted, total, location
            );
            save(&store, &store_path)?;
        }

        Commands::Detect {
            location,
            max_workers,
        } => {
            let locations: Vec<String> = match location {
                Some(name) => vec![name],
                None => store
                    .list_locations()?
                    .into_iter()
                    .map(|l| l.name)
                    .collect(),
            };

            let workers = max_workers.unwrap_or(settings.max_workers).max(1);
            let outcomes = detect_all(&store, &locations, workers)?;
            report_detection(&store, &store_path, outcomes)?;
        }

        Commands::Events { location, min_pm10 } => {
            let episodes = match min_pm10 {
                Some(pm10_min) => store.get_events_over_threshold(&location, pm10_min)?,
                None => store.get_calima_events(&location)?,
            };

            if episodes.is_empty() {
                println!("No calima episodes stored for '{}'", location);
            }
            for episode in &episodes {
                println!("{}", describe_episode(episode));
            }
        }

        Commands::Daily { location, max } => {
            let summaries = if max {
                store.get_daily_max(&location)?
            } else {
                store.get_daily_avg(&location)?
            };

            println!(
                "Daily {} for '{}' ({} day(s))",
                if max { "maxima" } else { "averages" },
                location,
                summaries.len()
            );
            for summary in &summaries {
                println!("  {}", summary.summary_line());
            }
        }

        Commands::Current {
            location,
            input_file,
            at,
        } => {
            let at = match at {
                Some(value) => DateTime::parse_from_rfc3339(&value)
                    .with_context(|| format!("invalid instant '{}'", value))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let series = read_response(&input_file)
                .with_context(|| format!("reading {}", input_file.display()))?;
            match series.current_point(&location, at) {
                Some(point) => println!(
                    "{} at {}: pm10={:?} pm2.5={:?} dust={:?} aod={:?} calima={}",
                    point.location,
                    point.time,
                    point.pm10,
                    point.pm25,
                    point.dust,
                    point.aod,
                    point.is_calima
                ),
                None => bail!("{} contains no hourly data", input_file.display()),
            }
        }
    }

    Ok(())
}

type DetectionOutcome = (String, crate::error::Result<Vec<CalimaEpisode>>);

/// Run detection for each location on its own worker. Each location is scanned
/// by exactly one worker.
fn detect_all(
    store: &MemoryStore,
    locations: &[String],
    workers: usize,
) -> anyhow::Result<Vec<DetectionOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building detection worker pool")?;

    let progress = ProgressReporter::new(
        locations.len() as u64,
        "Detecting calima episodes...",
        locations.len() <= 1,
    );
    let scanner = EpisodeScanner::new(store, store);

    let outcomes: Vec<_> = pool.install(|| {
        locations
            .par_iter()
            .map(|name| {
                let result = scanner.detect_events(name);
                progress.increment(1);
                (name.clone(), result)
            })
            .collect()
    });
    progress.finish_with_message("Detection complete");

    Ok(outcomes)
}

/// Print the per-location results and save the store. Episodes committed for
/// the locations that succeeded are saved even when another location failed.
fn report_detection(
    store: &MemoryStore,
    store_path: &Path,
    outcomes: Vec<DetectionOutcome>,
) -> anyhow::Result<()> {
    let mut failures = Vec::new();

    for (name, outcome) in outcomes {
        match outcome {
            Ok(episodes) => {
                info!(location = %name, count = episodes.len(), "detection finished");
                println!("{}: {} new episode(s)", name, episodes.len());
                for episode in &episodes {
                    println!("  {}", describe_episode(episode));
                }
            }
            Err(e) => {
                warn!(location = %name, error = %e, "detection failed");
                failures.push(format!("'{}': {}", name, e));
            }
        }
    }

    save(store, store_path)?;

    if !failures.is_empty() {
        bail!(
            "detection failed for {} location(s): {}",
            failures.len(),
            failures.join("; ")
        );
    }
    Ok(())
}

fn describe_episode(episode: &CalimaEpisode) -> String {
    format!(
        "{} -> {} ({}h): peak pm10={:.1} dust={:.1} aod={:.2}",
        episode.start_time.format("%Y-%m-%d %H:%M"),
        episode.end_time.format("%Y-%m-%d %H:%M"),
        episode.duration_hours(),
        episode.peak_pm10,
        episode.peak_dust,
        episode.peak_aod
    )
}

fn save(store: &MemoryStore, path: &Path) -> anyhow::Result<()> {
    store
        .save(path)
        .with_context(|| format!("saving store to {}", path.display()))
}

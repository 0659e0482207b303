use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info, warn};

use crate::analyzers::{daily_averages, daily_maxima};
use crate::error::{CalimaError, Result};
use crate::models::{
    AirQualityData, CalimaEpisode, DailySummary, EpisodePeaks, HourlyReading, Location,
    MeasurementUpdate,
};
use crate::storage::repository::{CascadeReport, ModifyRepository, ReadRepository};
use crate::utils::constants::MIN_EPISODE_HOURS;

/// An episode spans `start..=end` and covers at least `MIN_EPISODE_HOURS` hours.
fn check_episode_span(location: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(CalimaError::InvalidEpisodeRange {
            location: location.to_string(),
            start,
            end,
        });
    }

    let hours = (end - start).num_hours() + 1;
    if hours < MIN_EPISODE_HOURS as i64 {
        return Err(CalimaError::EpisodeTooShort {
            location: location.to_string(),
            hours,
            min: MIN_EPISODE_HOURS,
        });
    }
    Ok(())
}

/// On-disk representation of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    locations: Vec<Location>,
    readings: Vec<HourlyReading>,
    episodes: Vec<CalimaEpisode>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    locations: BTreeMap<String, Location>,
    /// Keyed by location then timestamp; the inner key is the uniqueness index.
    readings: HashMap<String, BTreeMap<DateTime<Utc>, HourlyReading>>,
    reading_ids: HashMap<u64, (String, DateTime<Utc>)>,
    episodes: HashMap<String, Vec<CalimaEpisode>>,
}

impl StoreState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn series(&self, location: &str) -> impl Iterator<Item = &HourlyReading> {
        self.readings.get(location).into_iter().flat_map(|s| s.values())
    }

    /// Insert a reading for a known location. Returns `None` when the
    /// timestamp is already stored.
    fn insert_reading(&mut self, location: &str, data: AirQualityData) -> Option<HourlyReading> {
        let timestamp = data.timestamp;
        if self
            .readings
            .get(location)
            .is_some_and(|s| s.contains_key(&timestamp))
        {
            return None;
        }

        let reading = HourlyReading {
            id: self.allocate_id(),
            location: location.to_string(),
            data,
        };
        self.reading_ids
            .insert(reading.id, (location.to_string(), timestamp));
        self.readings
            .entry(location.to_string())
            .or_default()
            .insert(timestamp, reading.clone());
        Some(reading)
    }

    fn remove_readings(&mut self, location: &str) -> usize {
        let Some(series) = self.readings.remove(location) else {
            return 0;
        };
        for reading in series.values() {
            self.reading_ids.remove(&reading.id);
        }
        series.len()
    }

    fn episodes_newest_first(&self, location: &str) -> Vec<CalimaEpisode> {
        let mut episodes = self.episodes.get(location).cloned().unwrap_or_default();
        episodes.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        episodes
    }

    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut state = StoreState {
            next_id: snapshot.next_id,
            ..Default::default()
        };

        for location in snapshot.locations {
            state.locations.insert(location.name.clone(), location);
        }

        for reading in snapshot.readings {
            let timestamp = reading.timestamp();
            if !state.locations.contains_key(&reading.location) {
                return Err(CalimaError::CorruptSnapshot(format!(
                    "reading {} references unknown location '{}'",
                    reading.id, reading.location
                )));
            }
            state.next_id = state.next_id.max(reading.id);
            if state
                .reading_ids
                .insert(reading.id, (reading.location.clone(), timestamp))
                .is_some()
            {
                return Err(CalimaError::CorruptSnapshot(format!(
                    "reading id {} is used more than once",
                    reading.id
                )));
            }
            let series = state.readings.entry(reading.location.clone()).or_default();
            if series.insert(timestamp, reading.clone()).is_some() {
                return Err(CalimaError::CorruptSnapshot(format!(
                    "two readings for '{}' at {}",
                    reading.location, timestamp
                )));
            }
        }

        let mut episode_ids = HashSet::new();
        for episode in snapshot.episodes {
            if !state.locations.contains_key(&episode.location) {
                return Err(CalimaError::CorruptSnapshot(format!(
                    "episode {} references unknown location '{}'",
                    episode.id, episode.location
                )));
            }
            if !episode_ids.insert(episode.id) {
                return Err(CalimaError::CorruptSnapshot(format!(
                    "episode id {} is used more than once",
                    episode.id
                )));
            }
            check_episode_span(&episode.location, episode.start_time, episode.end_time)
                .map_err(|e| CalimaError::CorruptSnapshot(format!("episode {}: {}", episode.id, e)))?;

            state.next_id = state.next_id.max(episode.id);
            state
                .episodes
                .entry(episode.location.clone())
                .or_default()
                .push(episode);
        }

        Ok(state)
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut episodes: Vec<CalimaEpisode> = self.episodes.values().flatten().cloned().collect();
        episodes.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.start_time.cmp(&b.start_time))
        });

        Snapshot {
            next_id: self.next_id,
            locations: self.locations.values().cloned().collect(),
            readings: self
                .locations
                .keys()
                .flat_map(|name| self.series(name).cloned())
                .collect(),
            episodes,
        }
    }
}

/// Thread-safe in-memory store implementing both repository sides.
///
/// Persisted as a JSON snapshot with `load` / `save`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, or start empty when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no snapshot found, starting with an empty store");
            return Ok(Self::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        let state = StoreState::from_snapshot(snapshot)?;

        info!(
            path = %path.display(),
            locations = state.locations.len(),
            "store loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write the current state to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.read()?.to_snapshot();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target first so a failed write keeps the old file
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;

        info!(
            path = %path.display(),
            readings = snapshot.readings.len(),
            episodes = snapshot.episodes.len(),
            "store saved"
        );
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| CalimaError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| CalimaError::LockPoisoned)
    }
}

impl ReadRepository for MemoryStore {
    fn get_location(&self, name: &str) -> Result<Option<Location>> {
        Ok(self.read()?.locations.get(name).cloned())
    }

    fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(self.read()?.locations.values().cloned().collect())
    }

    fn get_measurements(&self, location: &str) -> Result<Vec<HourlyReading>> {
        Ok(self.read()?.series(location).cloned().collect())
    }

    fn get_latest(&self, location: &str) -> Result<Option<HourlyReading>> {
        let state = self.read()?;
        Ok(state
            .readings
            .get(location)
            .and_then(|s| s.values().next_back())
            .cloned())
    }

    fn get_range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyReading>> {
        if start > end {
            return Ok(Vec::new());
        }

        let state = self.read()?;
        Ok(state
            .readings
            .get(location)
            .map(|s| s.range(start..=end).map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }

    fn find_calima_hours(&self, location: &str) -> Result<Vec<HourlyReading>> {
        Ok(self
            .read()?
            .series(location)
            .filter(|r| r.data.is_calima)
            .cloned()
            .collect())
    }

    fn get_daily_avg(&self, location: &str) -> Result<Vec<DailySummary>> {
        Ok(daily_averages(&self.get_measurements(location)?))
    }

    fn get_daily_max(&self, location: &str) -> Result<Vec<DailySummary>> {
        Ok(daily_maxima(&self.get_measurements(location)?))
    }

    fn get_calima_events(&self, location: &str) -> Result<Vec<CalimaEpisode>> {
        Ok(self.read()?.episodes_newest_first(location))
    }

    fn get_events_over_threshold(
        &self,
        location: &str,
        pm10_min: f64,
    ) -> Result<Vec<CalimaEpisode>> {
        let mut episodes = self.read()?.episodes_newest_first(location);
        episodes.retain(|e| e.peak_pm10 >= pm10_min);
        Ok(episodes)
    }
}

impl ModifyRepository for MemoryStore {
    fn add_location(&self, name: &str, latitude: f64, longitude: f64) -> Result<Location> {
        let location = Location::validated(name, latitude, longitude)?;

        let mut state = self.write()?;
        if state.locations.contains_key(name) {
            return Err(CalimaError::DuplicateLocation {
                name: name.to_string(),
            });
        }
        state.locations.insert(name.to_string(), location.clone());

        info!(location = name, latitude, longitude, "location created");
        Ok(location)
    }

    fn add_measurement(
        &self,
        location: &str,
        data: AirQualityData,
    ) -> Result<Option<HourlyReading>> {
        let mut state = self.write()?;
        if !state.locations.contains_key(location) {
            error!(location, "cannot add measurement: unknown location");
            return Ok(None);
        }

        let timestamp = data.timestamp;
        match state.insert_reading(location, data) {
            Some(reading) => {
                info!(location, timestamp = %timestamp, "measurement saved");
                Ok(Some(reading))
            }
            None => Err(CalimaError::DuplicateReading {
                location: location.to_string(),
                timestamp,
            }),
        }
    }

    fn bulk_add_measurements(&self, location: &str, data: Vec<AirQualityData>) -> Result<usize> {
        let mut state = self.write()?;
        if !state.locations.contains_key(location) {
            error!(location, "cannot bulk insert: unknown location");
            return Ok(0);
        }

        let total = data.len();
        let inserted = data
            .into_iter()
            .filter_map(|d| state.insert_reading(location, d))
            .count();

        if inserted < total {
            warn!(
                location,
                skipped = total - inserted,
                "bulk insert skipped measurements already stored"
            );
        }
        info!(location, inserted, "bulk insert complete");
        Ok(inserted)
    }

    fn update_measurement(&self, id: u64, update: &MeasurementUpdate) -> Result<HourlyReading> {
        let mut state = self.write()?;
        let (location, timestamp) = state
            .reading_ids
            .get(&id)
            .cloned()
            .ok_or(CalimaError::MeasurementNotFound { id })?;

        if update.is_empty() {
            return Err(CalimaError::EmptyUpdate { id });
        }

        let reading = state
            .readings
            .get_mut(&location)
            .and_then(|s| s.get_mut(&timestamp))
            .ok_or(CalimaError::MeasurementNotFound { id })?;
        update.apply_to(&mut reading.data);

        info!(id, location = %location, "measurement updated");
        Ok(reading.clone())
    }

    fn delete_measurements_for_location(&self, location: &str) -> Result<usize> {
        let mut state = self.write()?;
        if !state.locations.contains_key(location) {
            warn!(location, "no measurements deleted: unknown location");
            return Ok(0);
        }

        let count = state.remove_readings(location);
        info!(location, count, "measurements deleted");
        Ok(count)
    }

    fn delete_location(&self, location: &str) -> Result<Option<CascadeReport>> {
        let mut state = self.write()?;
        if state.locations.remove(location).is_none() {
            warn!(location, "cannot delete: unknown location");
            return Ok(None);
        }

        let report = CascadeReport {
            readings: state.remove_readings(location),
            episodes: state.episodes.remove(location).map_or(0, |e| e.len()),
        };

        info!(
            location,
            readings = report.readings,
            episodes = report.episodes,
            "location deleted"
        );
        Ok(Some(report))
    }

    fn add_calima_event(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        peaks: EpisodePeaks,
    ) -> Result<Option<CalimaEpisode>> {
        check_episode_span(location, start, end)?;

        let mut state = self.write()?;
        if !state.locations.contains_key(location) {
            error!(location, "cannot save episode: unknown location");
            return Ok(None);
        }

        let episode = CalimaEpisode {
            id: state.allocate_id(),
            location: location.to_string(),
            start_time: start,
            end_time: end,
            peak_pm10: peaks.pm10,
            peak_dust: peaks.dust,
            peak_aod: peaks.aod,
        };
        state
            .episodes
            .entry(location.to_string())
            .or_default()
            .push(episode.clone());

        info!(
            location,
            id = episode.id,
            start = %start,
            end = %end,
            "calima episode stored"
        );
        Ok(Some(episode))
    }
}

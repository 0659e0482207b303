//! Command/query split over the stored locations, readings and episodes.
//!
//! Query methods never mutate; command methods never return derived
//! analytics. Both sides take `&self` so one store can serve as both
//! collaborators of the episode scanner at once.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    AirQualityData, CalimaEpisode, DailySummary, EpisodePeaks, HourlyReading, Location,
    MeasurementUpdate,
};

/// Rows removed by a cascading location delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub readings: usize,
    pub episodes: usize,
}

/// Read side. Unknown locations yield empty results rather than errors.
pub trait ReadRepository {
    fn get_location(&self, name: &str) -> Result<Option<Location>>;

    fn list_locations(&self) -> Result<Vec<Location>>;

    /// All readings for a location in ascending timestamp order.
    fn get_measurements(&self, location: &str) -> Result<Vec<HourlyReading>>;

    fn get_latest(&self, location: &str) -> Result<Option<HourlyReading>>;

    /// Readings with `start <= timestamp <= end`, ascending.
    fn get_range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyReading>>;

    /// Readings whose stored calima flag is set.
    fn find_calima_hours(&self, location: &str) -> Result<Vec<HourlyReading>>;

    fn get_daily_avg(&self, location: &str) -> Result<Vec<DailySummary>>;

    fn get_daily_max(&self, location: &str) -> Result<Vec<DailySummary>>;

    /// Committed episodes, newest start first.
    fn get_calima_events(&self, location: &str) -> Result<Vec<CalimaEpisode>>;

    /// Episodes with `peak_pm10 >= pm10_min`, newest start first.
    fn get_events_over_threshold(&self, location: &str, pm10_min: f64)
        -> Result<Vec<CalimaEpisode>>;
}

/// Write side. Operations on an unknown location return `None` or `0`.
pub trait ModifyRepository {
    fn add_location(&self, name: &str, latitude: f64, longitude: f64) -> Result<Location>;

    fn add_measurement(
        &self,
        location: &str,
        data: AirQualityData,
    ) -> Result<Option<HourlyReading>>;

    /// Insert many readings, skipping timestamps already stored. Returns the
    /// number inserted.
    fn bulk_add_measurements(&self, location: &str, data: Vec<AirQualityData>) -> Result<usize>;

    fn update_measurement(&self, id: u64, update: &MeasurementUpdate) -> Result<HourlyReading>;

    fn delete_measurements_for_location(&self, location: &str) -> Result<usize>;

    /// Remove a location together with its readings and episodes.
    fn delete_location(&self, location: &str) -> Result<Option<CascadeReport>>;

    fn add_calima_event(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        peaks: EpisodePeaks,
    ) -> Result<Option<CalimaEpisode>>;
}

impl<T: ReadRepository + ?Sized> ReadRepository for &T {
    fn get_location(&self, name: &str) -> Result<Option<Location>> {
        (**self).get_location(name)
    }

    fn list_locations(&self) -> Result<Vec<Location>> {
        (**self).list_locations()
    }

    fn get_measurements(&self, location: &str) -> Result<Vec<HourlyReading>> {
        (**self).get_measurements(location)
    }

    fn get_latest(&self, location: &str) -> Result<Option<HourlyReading>> {
        (**self).get_latest(location)
    }

    fn get_range(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HourlyReading>> {
        (**self).get_range(location, start, end)
    }

    fn find_calima_hours(&self, location: &str) -> Result<Vec<HourlyReading>> {
        (**self).find_calima_hours(location)
    }

    fn get_daily_avg(&self, location: &str) -> Result<Vec<DailySummary>> {
        (**self).get_daily_avg(location)
    }

    fn get_daily_max(&self, location: &str) -> Result<Vec<DailySummary>> {
        (**self).get_daily_max(location)
    }

    fn get_calima_events(&self, location: &str) -> Result<Vec<CalimaEpisode>> {
        (**self).get_calima_events(location)
    }

    fn get_events_over_threshold(
        &self,
        location: &str,
        pm10_min: f64,
    ) -> Result<Vec<CalimaEpisode>> {
        (**self).get_events_over_threshold(location, pm10_min)
    }
}

impl<T: ModifyRepository + ?Sized> ModifyRepository for &T {
    fn add_location(&self, name: &str, latitude: f64, longitude: f64) -> Result<Location> {
        (**self).add_location(name, latitude, longitude)
    }

    fn add_measurement(
        &self,
        location: &str,
        data: AirQualityData,
    ) -> Result<Option<HourlyReading>> {
        (**self).add_measurement(location, data)
    }

    fn bulk_add_measurements(&self, location: &str, data: Vec<AirQualityData>) -> Result<usize> {
        (**self).bulk_add_measurements(location, data)
    }

    fn update_measurement(&self, id: u64, update: &MeasurementUpdate) -> Result<HourlyReading> {
        (**self).update_measurement(id, update)
    }

    fn delete_measurements_for_location(&self, location: &str) -> Result<usize> {
        (**self).delete_measurements_for_location(location)
    }

    fn delete_location(&self, location: &str) -> Result<Option<CascadeReport>> {
        (**self).delete_location(location)
    }

    fn add_calima_event(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        peaks: EpisodePeaks,
    ) -> Result<Option<CalimaEpisode>> {
        (**self).add_calima_event(location, start, end, peaks)
    }
}

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::detection::classifier::CalimaThresholds;
use crate::error::Result;
use crate::models::{CalimaEpisode, EpisodePeaks, HourlyReading};
use crate::storage::{ModifyRepository, ReadRepository};
use crate::utils::constants::MIN_EPISODE_HOURS;

/// Detects calima episodes in stored hourly measurements and commits the new
/// closed ones.
///
/// An episode is a run of consecutive calima hours at least
/// `MIN_EPISODE_HOURS` long. A run is only committed once a non-calima hour
/// has closed it, so an episode still in progress at the end of the data is
/// picked up by a later call. Scanning resumes at the end of the newest
/// committed episode, which keeps repeated calls from committing duplicates.
///
/// Callers must not run detection for the same location concurrently.
pub struct EpisodeScanner<R, W> {
    read_repo: R,
    modify_repo: W,
    thresholds: CalimaThresholds,
    min_hours: usize,
}

/// State of the run currently being scanned.
#[derive(Debug, Default)]
struct OpenRun {
    start: Option<DateTime<Utc>>,
    length: usize,
    peaks: EpisodePeaks,
}

impl OpenRun {
    fn extend(&mut self, reading: &HourlyReading) {
        if self.start.is_none() {
            self.start = Some(reading.timestamp());
            self.length = 0;
            self.peaks = EpisodePeaks::default();
        }

        self.length += 1;
        let data = &reading.data;
        self.peaks.fold(data.pm10, data.dust, data.aod);
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<R: ReadRepository, W: ModifyRepository> EpisodeScanner<R, W> {
    pub fn new(read_repo: R, modify_repo: W) -> Self {
        Self {
            read_repo,
            modify_repo,
            thresholds: CalimaThresholds::default(),
            min_hours: MIN_EPISODE_HOURS,
        }
    }

    /// End of the newest committed episode, if any.
    pub fn resume_point(&self, location: &str) -> Result<Option<DateTime<Utc>>> {
        let existing = self.read_repo.get_calima_events(location)?;
        Ok(existing.first().map(|episode| episode.end_time))
    }

    /// Scan the measurements stored for `location` and commit every new
    /// closed episode. Returns the committed episodes in start order.
    pub fn detect_events(&self, location: &str) -> Result<Vec<CalimaEpisode>> {
        let resume = self.resume_point(location)?;

        // The hour at `resume` is fetched again and can open a new run
        let series = match resume {
            None => self.read_repo.get_measurements(location)?,
            Some(from) => self
                .read_repo
                .get_range(location, from, DateTime::<Utc>::MAX_UTC)?,
        };

        if series.is_empty() {
            debug!(location, "no measurements to scan");
            return Ok(Vec::new());
        }

        debug!(
            location,
            hours = series.len(),
            resume = ?resume,
            "scanning measurements"
        );

        let flags: Vec<bool> = series
            .iter()
            .map(|reading| self.thresholds.classify_data(&reading.data))
            .collect();

        let mut committed = Vec::new();
        let mut run = OpenRun::default();

        for (i, (reading, is_calima)) in series.iter().zip(&flags).enumerate() {
            if *is_calima {
                run.extend(reading);
                continue;
            }

            let Some(start) = run.start else {
                continue;
            };

            let end = series[i - 1].timestamp();
            if run.length >= self.min_hours {
                match self
                    .modify_repo
                    .add_calima_event(location, start, end, run.peaks)?
                {
                    Some(episode) => {
                        info!(
                            location,
                            start = %episode.start_time,
                            end = %episode.end_time,
                            hours = run.length,
                            "calima episode committed"
                        );
                        committed.push(episode);
                    }
                    None => warn!(location, start = %start, end = %end, "episode was not stored"),
                }
            } else {
                debug!(location, start = %start, hours = run.length, "run too short");
            }

            run.reset();
        }

        if let Some(start) = run.start {
            debug!(
                location,
                start = %start,
                hours = run.length,
                "run still open at end of data, not committed"
            );
        }

        Ok(committed)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A detected Saharan dust episode.
///
/// `start_time` and `end_time` are both inclusive hour timestamps. Peaks are
/// zero when every contributing hour lacked that measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalimaEpisode {
    pub id: u64,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub peak_pm10: f64,
    pub peak_dust: f64,
    pub peak_aod: f64,
}

impl CalimaEpisode {
    /// Number of hourly samples covered, counting both ends.
    pub fn duration_hours(&self) -> i64 {
        (self.end_time - self.start_time).num_hours() + 1
    }
}

/// Peak values accumulated over a run of calima hours.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodePeaks {
    pub pm10: f64,
    pub dust: f64,
    pub aod: f64,
}

impl EpisodePeaks {
    pub fn new(pm10: f64, dust: f64, aod: f64) -> Self {
        Self { pm10, dust, aod }
    }

    /// Fold one hour into the running maxima. Absent values count as 0.
    pub fn fold(&mut self, pm10: Option<f64>, dust: Option<f64>, aod: Option<f64>) {
        self.pm10 = self.pm10.max(pm10.unwrap_or(0.0));
        self.dust = self.dust.max(dust.unwrap_or(0.0));
        self.aod = self.aod.max(aod.unwrap_or(0.0));
    }
}

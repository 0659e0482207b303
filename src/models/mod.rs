pub mod episode;
pub mod location;
pub mod reading;
pub mod summary;

pub use episode::{CalimaEpisode, EpisodePeaks};
pub use location::Location;
pub use reading::{AirQualityData, HourlyReading, MeasurementUpdate};
pub use summary::DailySummary;

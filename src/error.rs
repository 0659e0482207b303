use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalimaError>;

#[derive(Error, Debug)]
pub enum CalimaError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Location '{name}' already exists")]
    DuplicateLocation { name: String },

    #[error("Measurement for '{location}' at {timestamp} already exists")]
    DuplicateReading {
        location: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Measurement {id} not found")]
    MeasurementNotFound { id: u64 },

    #[error("No valid fields to update for measurement {id}")]
    EmptyUpdate { id: u64 },

    #[error("Episode for '{location}' ends at {end} before it starts at {start}")]
    InvalidEpisodeRange {
        location: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Episode for '{location}' spans {hours} hour(s), at least {min} required")]
    EpisodeTooShort {
        location: String,
        hours: i64,
        min: usize,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

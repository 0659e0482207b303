pub mod analyzers;
pub mod cli;
pub mod detection;
pub mod error;
pub mod ingest;
pub mod models;
pub mod storage;
pub mod utils;

pub use detection::{is_calima, EpisodeScanner};
pub use error::{CalimaError, Result};

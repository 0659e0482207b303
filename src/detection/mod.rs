pub mod classifier;
pub mod scanner;

pub use classifier::{is_calima, is_hour_calima, CalimaThresholds};
pub use scanner::EpisodeScanner;

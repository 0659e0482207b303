pub mod daily;

pub use daily::{daily_averages, daily_maxima};

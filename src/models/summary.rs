use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day aggregate of the four measurements. `None` when no hour that day
/// carried the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub dust: Option<f64>,
    pub aod: Option<f64>,
}

impl DailySummary {
    pub fn summary_line(&self) -> String {
        format!(
            "{}: pm10={} pm2.5={} dust={} aod={}",
            self.date,
            format_value(self.pm10),
            format_value(self.pm25),
            format_value(self.dust),
            format_value(self.aod),
        )
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

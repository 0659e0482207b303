use crate::models::{DailySummary, HourlyReading};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Running aggregate of one measurement over a day.
#[derive(Debug, Default, Clone, Copy)]
struct FieldStats {
    sum: f64,
    count: usize,
    max: Option<f64>,
}

impl FieldStats {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct DayStats {
    pm10: FieldStats,
    pm25: FieldStats,
    dust: FieldStats,
    aod: FieldStats,
}

fn group_by_day(readings: &[HourlyReading]) -> BTreeMap<NaiveDate, DayStats> {
    let mut days: BTreeMap<NaiveDate, DayStats> = BTreeMap::new();

    for reading in readings {
        let data = &reading.data;
        let day = days.entry(data.timestamp.date_naive()).or_default();
        day.pm10.push(data.pm10);
        day.pm25.push(data.pm25);
        day.dust.push(data.dust);
        day.aod.push(data.aod);
    }

    days
}

/// Daily means over the present values, ordered by date.
pub fn daily_averages(readings: &[HourlyReading]) -> Vec<DailySummary> {
    group_by_day(readings)
        .into_iter()
        .map(|(date, day)| DailySummary {
            date,
            pm10: day.pm10.mean(),
            pm25: day.pm25.mean(),
            dust: day.dust.mean(),
            aod: day.aod.mean(),
        })
        .collect()
}

/// Daily maxima over the present values, ordered by date.
pub fn daily_maxima(readings: &[HourlyReading]) -> Vec<DailySummary> {
    group_by_day(readings)
        .into_iter()
        .map(|(date, day)| DailySummary {
            date,
            pm10: day.pm10.max,
            pm25: day.pm25.max,
            dust: day.dust.max,
            aod: day.aod.max,
        })
        .collect()
}

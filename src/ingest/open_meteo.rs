//! Open-Meteo air-quality responses.
//!
//! Parses the `hourly` block returned by
//! <https://air-quality-api.open-meteo.com/v1/air-quality> (requested with
//! `timezone=UTC`) into an `AirQualitySeries`. Responses come either from
//! `fetch` or from a body saved to disk and read with `read_response`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::detection::classifier::CalimaThresholds;
use crate::error::{CalimaError, Result};
use crate::models::AirQualityData;
use crate::utils::constants::{
    canary_location, MAX_PAST_DAYS, OPEN_METEO_HOURLY_FIELDS, OPEN_METEO_URL,
    REQUEST_TIMEOUT_SECS, UPDATE_FORECAST_DAYS, UPDATE_PAST_DAYS,
};

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hourly: HourlyBlock,
}

/// Parallel arrays, one entry per hour. Values may be `null`.
#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    #[serde(default)]
    pub pm10: Vec<Option<f64>>,
    #[serde(default)]
    pub pm2_5: Vec<Option<f64>>,
    #[serde(default)]
    pub dust: Vec<Option<f64>>,
    #[serde(default)]
    pub aerosol_optical_depth: Vec<Option<f64>>,
}

// ============================================================================
// Parsed series
// ============================================================================

/// Hourly air-quality time series for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct AirQualitySeries {
    pub time: Vec<DateTime<Utc>>,
    pub pm10: Vec<Option<f64>>,
    pub pm25: Vec<Option<f64>>,
    pub dust: Vec<Option<f64>>,
    pub aod: Vec<Option<f64>>,
}

/// The sample closest to a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentPoint {
    pub location: String,
    pub time: DateTime<Utc>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub dust: Option<f64>,
    pub aod: Option<f64>,
    pub is_calima: bool,
}

/// Parse an API timestamp such as `2026-01-01T13:00`. The API is asked for
/// UTC, so the naive value is read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))?;
    Ok(naive.and_utc())
}

/// Read and parse a response body saved to disk.
pub fn read_response(path: &Path) -> Result<AirQualitySeries> {
    let reader = BufReader::new(File::open(path)?);
    let response: OpenMeteoResponse = serde_json::from_reader(reader)?;
    AirQualitySeries::from_response(response)
}

/// Missing arrays count as all-null; present arrays must match `time`.
fn align(name: &str, values: Vec<Option<f64>>, len: usize) -> Result<Vec<Option<f64>>> {
    if values.is_empty() {
        return Ok(vec![None; len]);
    }
    if values.len() != len {
        return Err(CalimaError::MalformedSeries(format!(
            "'{}' has {} values but 'time' has {}",
            name,
            values.len(),
            len
        )));
    }
    Ok(values)
}

impl AirQualitySeries {
    pub fn from_response(response: OpenMeteoResponse) -> Result<Self> {
        let hourly = response.hourly;
        let len = hourly.time.len();

        let time = hourly
            .time
            .iter()
            .map(|t| parse_timestamp(t))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time,
            pm10: align("pm10", hourly.pm10, len)?,
            pm25: align("pm2_5", hourly.pm2_5, len)?,
            dust: align("dust", hourly.dust, len)?,
            aod: align("aerosol_optical_depth", hourly.aerosol_optical_depth, len)?,
        })
    }

    pub fn from_json(body: &str) -> Result<Self> {
        Self::from_response(serde_json::from_str(body)?)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Convert to storable hours with the calima flag precomputed.
    pub fn to_measurements(&self) -> Vec<AirQualityData> {
        let thresholds = CalimaThresholds::default();

        (0..self.len())
            .map(|i| {
                let (pm10, pm25, dust, aod) = (self.pm10[i], self.pm25[i], self.dust[i], self.aod[i]);
                AirQualityData::new(
                    self.time[i],
                    pm10,
                    pm25,
                    dust,
                    aod,
                    thresholds.classify(pm10, pm25, dust, aod),
                )
            })
            .collect()
    }

    /// Index of the timestamp closest to `target`; ties go to the earlier one.
    pub fn nearest_index(&self, target: DateTime<Utc>) -> Option<usize> {
        self.time
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (**t - target).num_seconds().abs())
            .map(|(i, _)| i)
    }

    pub fn current_point(&self, location: &str, at: DateTime<Utc>) -> Option<CurrentPoint> {
        let i = self.nearest_index(at)?;
        let (pm10, pm25, dust, aod) = (self.pm10[i], self.pm25[i], self.dust[i], self.aod[i]);

        Some(CurrentPoint {
            location: location.to_string(),
            time: self.time[i],
            pm10,
            pm25,
            dust,
            aod,
            is_calima: CalimaThresholds::default().classify(pm10, pm25, dust, aod),
        })
    }
}

// ============================================================================
// Request parameters
// ============================================================================

/// Parameters for one air-quality API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub past_days: u32,
    pub forecast_days: u32,
}

impl ForecastRequest {
    /// Past `days` of history for a built-in location.
    pub fn history(location: &str, days: u32) -> Result<Self> {
        let (latitude, longitude) = Self::resolve(location)?;
        Self::history_at(latitude, longitude, days)
    }

    /// Past `days` of history at a coordinate pair.
    pub fn history_at(latitude: f64, longitude: f64, days: u32) -> Result<Self> {
        if days > MAX_PAST_DAYS {
            return Err(CalimaError::InvalidRequest(format!(
                "past_days must be at most {}, got {}",
                MAX_PAST_DAYS, days
            )));
        }
        Self::at(latitude, longitude, days, 0)
    }

    /// Recent past plus short-range forecast for a built-in location.
    pub fn update(location: &str) -> Result<Self> {
        let (latitude, longitude) = Self::resolve(location)?;
        Self::update_at(latitude, longitude)
    }

    pub fn update_at(latitude: f64, longitude: f64) -> Result<Self> {
        Self::at(latitude, longitude, UPDATE_PAST_DAYS, UPDATE_FORECAST_DAYS)
    }

    fn at(latitude: f64, longitude: f64, past_days: u32, forecast_days: u32) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CalimaError::InvalidRequest(format!(
                "coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            past_days,
            forecast_days,
        })
    }

    fn resolve(location: &str) -> Result<(f64, f64)> {
        canary_location(location)
            .ok_or_else(|| CalimaError::InvalidRequest(format!("Unknown location: {}", location)))
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", OPEN_METEO_HOURLY_FIELDS.to_string()),
            ("past_days", self.past_days.to_string()),
            ("forecast_days", self.forecast_days.to_string()),
            ("timezone", "UTC".to_string()),
        ]
    }

    pub fn url(&self) -> String {
        let query: Vec<String> = self
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", OPEN_METEO_URL, query.join("&"))
    }
}

// ============================================================================
// Fetch Functions
// ============================================================================

/// HTTP client with the request timeout applied.
pub fn client() -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// Issue one request and parse the hourly block of the response.
pub fn fetch(
    client: &reqwest::blocking::Client,
    request: &ForecastRequest,
) -> Result<AirQualitySeries> {
    let url = request.url();
    debug!(url = %url, "requesting air-quality data");

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()?
        .error_for_status()?;

    let series = AirQualitySeries::from_json(&response.text()?)?;
    info!(
        latitude = request.latitude,
        longitude = request.longitude,
        hours = series.len(),
        "air-quality data received"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
        "latitude": 28.46,
        "longitude": -16.25,
        "hourly": {
            "time": ["2026-01-01T00:00", "2026-01-01T01:00", "2026-01-01T02:00"],
            "pm10": [12.5, 70.0, null],
            "pm2_5": [4.0, 20.0, null],
            "dust": [3.0, 40.0, 210.0],
            "aerosol_optical_depth": [0.1, 0.8, null]
        }
    }"#;

    fn utc(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_response() {
        let series = AirQualitySeries::from_json(SAMPLE).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.time[1], utc(1));
        assert_eq!(series.pm10, vec![Some(12.5), Some(70.0), None]);
        assert_eq!(series.aod[2], None);
    }

    #[test]
    fn test_measurements_carry_calima_flag() {
        let series = AirQualitySeries::from_json(SAMPLE).unwrap();
        let flags: Vec<bool> = series.to_measurements().iter().map(|m| m.is_calima).collect();

        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_missing_array_is_all_null() {
        let body = r#"{"hourly": {"time": ["2026-01-01T00:00"], "dust": [160.0]}}"#;
        let series = AirQualitySeries::from_json(body).unwrap();

        assert_eq!(series.pm10, vec![None]);
        assert_eq!(series.dust, vec![Some(160.0)]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let body = r#"{"hourly": {"time": ["2026-01-01T00:00"], "pm10": [1.0, 2.0]}}"#;
        assert!(matches!(
            AirQualitySeries::from_json(body),
            Err(CalimaError::MalformedSeries(_))
        ));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(parse_timestamp("yesterday").is_err());
        assert_eq!(parse_timestamp("2026-01-01T05:00:00").unwrap(), utc(5));
    }

    #[test]
    fn test_nearest_index() {
        let series = AirQualitySeries::from_json(SAMPLE).unwrap();

        assert_eq!(series.nearest_index(utc(1) + chrono::Duration::minutes(20)), Some(1));
        assert_eq!(series.nearest_index(utc(23)), Some(2));

        let point = series.current_point("santa_cruz", utc(2)).unwrap();
        assert_eq!(point.time, utc(2));
        assert!(point.is_calima);
    }

    #[test]
    fn test_request_validation() {
        assert!(ForecastRequest::history("santa_cruz", 90).is_ok());
        assert!(matches!(
            ForecastRequest::history("santa_cruz", 91),
            Err(CalimaError::InvalidRequest(_))
        ));
        assert!(ForecastRequest::update("atlantis").is_err());

        let update = ForecastRequest::update("adeje").unwrap();
        assert_eq!(update.past_days, 2);
        assert_eq!(update.forecast_days, 3);
        assert!(update.url().contains("hourly=pm10,pm2_5,dust,aerosol_optical_depth"));
        assert!(update.url().contains("timezone=UTC"));
    }

    #[test]
    fn test_request_at_coordinates() {
        let request = ForecastRequest::history_at(28.0, -16.5, 30).unwrap();
        assert_eq!(request.past_days, 30);
        assert_eq!(request.forecast_days, 0);
        assert!(request.url().contains("latitude=28&longitude=-16.5"));

        let update = ForecastRequest::update_at(40.4, -3.7).unwrap();
        assert_eq!((update.past_days, update.forecast_days), (2, 3));

        for (lat, lon) in [(91.0, 0.0), (0.0, -181.0), (f64::NAN, 0.0)] {
            assert!(matches!(
                ForecastRequest::update_at(lat, lon),
                Err(CalimaError::InvalidRequest(_))
            ));
        }
        assert!(ForecastRequest::history_at(28.0, -16.5, 91).is_err());
    }
}

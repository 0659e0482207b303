use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hour of air-quality values, independent of where it was measured.
///
/// `None` means the value was not measured, which is not the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityData {
    pub timestamp: DateTime<Utc>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub dust: Option<f64>,
    pub aod: Option<f64>,
    pub is_calima: bool,
}

impl AirQualityData {
    pub fn new(
        timestamp: DateTime<Utc>,
        pm10: Option<f64>,
        pm25: Option<f64>,
        dust: Option<f64>,
        aod: Option<f64>,
        is_calima: bool,
    ) -> Self {
        Self {
            timestamp,
            pm10,
            pm25,
            dust,
            aod,
            is_calima,
        }
    }

    /// An hour with no measured values.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, None, None, None, None, false)
    }

    pub fn with_pm10(mut self, pm10: f64) -> Self {
        self.pm10 = Some(pm10);
        self
    }

    pub fn with_pm25(mut self, pm25: f64) -> Self {
        self.pm25 = Some(pm25);
        self
    }

    pub fn with_dust(mut self, dust: f64) -> Self {
        self.dust = Some(dust);
        self
    }

    pub fn with_aod(mut self, aod: f64) -> Self {
        self.aod = Some(aod);
        self
    }

    pub fn with_calima_flag(mut self, is_calima: bool) -> Self {
        self.is_calima = is_calima;
        self
    }
}

/// A stored hourly measurement. Unique per (location, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    pub id: u64,
    pub location: String,
    pub data: AirQualityData,
}

impl HourlyReading {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.data.timestamp
    }
}

/// Field replacements for `ModifyRepository::update_measurement`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementUpdate {
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub dust: Option<f64>,
    pub aod: Option<f64>,
    pub is_calima: Option<bool>,
}

impl MeasurementUpdate {
    pub fn is_empty(&self) -> bool {
        self.pm10.is_none()
            && self.pm25.is_none()
            && self.dust.is_none()
            && self.aod.is_none()
            && self.is_calima.is_none()
    }

    /// Apply the set fields, leaving the rest untouched.
    pub fn apply_to(&self, data: &mut AirQualityData) {
        if let Some(pm10) = self.pm10 {
            data.pm10 = Some(pm10);
        }
        if let Some(pm25) = self.pm25 {
            data.pm25 = Some(pm25);
        }
        if let Some(dust) = self.dust {
            data.dust = Some(dust);
        }
        if let Some(aod) = self.aod {
            data.aod = Some(aod);
        }
        if let Some(is_calima) = self.is_calima {
            data.is_calima = is_calima;
        }
    }
}

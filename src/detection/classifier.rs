use crate::models::{AirQualityData, HourlyReading};
use crate::utils::constants::{
    DUST_THRESHOLD, PM10_AOD_AOD_THRESHOLD, PM10_AOD_PM10_THRESHOLD, PM25_PM10_PM10_THRESHOLD,
    PM25_PM10_PM25_THRESHOLD,
};

/// Threshold set for the hourly calima heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalimaThresholds {
    pub dust: f64,
    pub pm10_with_aod: f64,
    pub aod: f64,
    pub pm25: f64,
    pub pm10_with_pm25: f64,
}

impl Default for CalimaThresholds {
    fn default() -> Self {
        Self {
            dust: DUST_THRESHOLD,
            pm10_with_aod: PM10_AOD_PM10_THRESHOLD,
            aod: PM10_AOD_AOD_THRESHOLD,
            pm25: PM25_PM10_PM25_THRESHOLD,
            pm10_with_pm25: PM25_PM10_PM10_THRESHOLD,
        }
    }
}

impl CalimaThresholds {
    /// Classify one hour. Rules are checked in order and any match wins:
    ///
    /// 1. dust above the dust threshold
    /// 2. pm10 and aod both above their thresholds
    /// 3. pm2.5 and pm10 both above their thresholds
    ///
    /// A missing value fails every rule that reads it.
    pub fn classify(
        &self,
        pm10: Option<f64>,
        pm25: Option<f64>,
        dust: Option<f64>,
        aod: Option<f64>,
    ) -> bool {
        if exceeds(dust, self.dust) {
            return true;
        }

        if exceeds(pm10, self.pm10_with_aod) && exceeds(aod, self.aod) {
            return true;
        }

        exceeds(pm25, self.pm25) && exceeds(pm10, self.pm10_with_pm25)
    }

    pub fn classify_data(&self, data: &AirQualityData) -> bool {
        self.classify(data.pm10, data.pm25, data.dust, data.aod)
    }
}

fn exceeds(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

/// Classify an hour with the default thresholds.
pub fn is_calima(pm10: Option<f64>, pm25: Option<f64>, dust: Option<f64>, aod: Option<f64>) -> bool {
    CalimaThresholds::default().classify(pm10, pm25, dust, aod)
}

/// Classify a stored reading from its raw values. The stored flag is ignored
/// since it may predate the current rules.
pub fn is_hour_calima(reading: &HourlyReading) -> bool {
    CalimaThresholds::default().classify_data(&reading.data)
}

/// Hour classification thresholds (all comparisons are strict)
pub const DUST_THRESHOLD: f64 = 150.0;
pub const PM10_AOD_PM10_THRESHOLD: f64 = 50.0;
pub const PM10_AOD_AOD_THRESHOLD: f64 = 0.5;
pub const PM25_PM10_PM25_THRESHOLD: f64 = 35.0;
pub const PM25_PM10_PM10_THRESHOLD: f64 = 60.0;

/// Minimum number of consecutive calima hours for an episode
pub const MIN_EPISODE_HOURS: usize = 3;

/// Open-Meteo air-quality API
pub const OPEN_METEO_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const OPEN_METEO_HOURLY_FIELDS: &str = "pm10,pm2_5,dust,aerosol_optical_depth";
pub const MAX_PAST_DAYS: u32 = 90;
pub const UPDATE_PAST_DAYS: u32 = 2;
pub const UPDATE_FORECAST_DAYS: u32 = 3;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Built-in Canary Islands sites (name, latitude, longitude)
pub const CANARY_LOCATIONS: [(&str, f64, f64); 3] = [
    ("santa_cruz", 28.4636, -16.2518),
    ("puerto_de_la_cruz", 28.4140, -16.5449),
    ("adeje", 28.1227, -16.7260),
];

/// Defaults
pub const DEFAULT_STORE_FILE: &str = "calima-store.json";
pub const DEFAULT_CONFIG_FILE: &str = "calima.toml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn canary_location(name: &str) -> Option<(f64, f64)> {
    CANARY_LOCATIONS
        .iter()
        .find(|(known, _, _)| *known == name)
        .map(|(_, lat, lon)| (*lat, *lon))
}

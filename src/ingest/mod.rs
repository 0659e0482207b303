pub mod open_meteo;

pub use open_meteo::{client, fetch, read_response, AirQualitySeries, CurrentPoint, ForecastRequest};

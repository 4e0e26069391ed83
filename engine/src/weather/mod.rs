//! Weather collaborators

use async_trait::async_trait;
use sdk::collaborators::WeatherSource;
use sdk::errors::EngineError;
use sdk::types::WeatherReport;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Source used when `[weather] provider = "disabled"`
///
/// Every lookup fails, so weather steps come back degraded with a neutral
/// report and ETAs are left unadjusted.
pub struct DisabledWeather;

#[async_trait]
impl WeatherSource for DisabledWeather {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get_weather_by_coords(&self, _lat: f64, _lon: f64) -> Result<WeatherReport, EngineError> {
        Err(EngineError::Network(
            "weather provider disabled".to_string(),
        ))
    }
}

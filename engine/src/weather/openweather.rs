//! OpenWeather current-conditions client
//!
//! `GET {base}/weather?lat=..&lon=..&appid=..&units=metric`. Only
//! `weather[0].main`, `weather[0].description` and `main.temp` are read.

use async_trait::async_trait;
use reqwest::Client;
use sdk::collaborators::WeatherSource;
use sdk::errors::EngineError;
use sdk::types::{GeoPoint, WeatherCondition, WeatherReport};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    #[serde(default)]
    main: Option<MainBlock>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    #[serde(default)]
    temp: Option<f64>,
}

pub struct OpenWeatherClient {
    base_url: String,
    api_key_env: String,
    client: Client,
}

impl OpenWeatherClient {
    /// `api_key_env` names the environment variable holding the key
    pub fn new(base_url: impl Into<String>, api_key_env: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key_env: api_key_env.into(),
            client: Client::new(),
        }
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

fn to_report(body: CurrentWeather) -> WeatherReport {
    let (label, description) = body
        .weather
        .into_iter()
        .next()
        .map(|w| (w.main, w.description))
        .unwrap_or_default();

    let mut report = WeatherReport::for_condition(WeatherCondition::from_label(&label));
    report.description = description;
    report.temp_c = body.main.and_then(|m| m.temp);
    report
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn get_weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherReport, EngineError> {
        if !GeoPoint::new(lat, lon).is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "coordinates out of range: {}, {}",
                lat, lon
            )));
        }

        let api_key = self.api_key().ok_or_else(|| {
            EngineError::Network(format!("weather API key ({}) is not set", self.api_key_env))
        })?;

        let url = format!("{}/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("weather request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Network(format!(
                "weather API returned {}",
                response.status()
            )));
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(format!("weather response: {}", e)))?;

        Ok(to_report(body))
    }
}

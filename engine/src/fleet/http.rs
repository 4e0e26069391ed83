//! HTTP client for the fleet service
//!
//! Every endpoint answers with the `{ok, data, error}` envelope. A 404 means
//! the bus or route does not exist and maps to `Ok(None)`; any other failure
//! is an error the caller degrades on.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sdk::collaborators::FleetSource;
use sdk::errors::EngineError;
use sdk::types::{BusLocation, BusStatus, Route, Stop};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BusStatusData {
    bus_id: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    route_id: Option<String>,
    #[serde(default = "default_speed")]
    speed_kmph: f64,
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    status_message: String,
}

fn default_speed() -> f64 {
    20.0
}

fn default_status() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct RouteData {
    #[serde(default)]
    stops: Vec<Stop>,
}

#[derive(Debug, Deserialize)]
struct OverviewEntry {
    bus_id: String,
    #[serde(default)]
    route_id: Option<String>,
}

pub struct HttpFleetClient {
    base_url: String,
    client: Client,
}

impl HttpFleetClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("GET {}: {}", path, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EngineError::Network(format!(
                "GET {} returned {}",
                path,
                response.status()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(format!("GET {}: {}", path, e)))?;

        if !envelope.ok {
            let detail = envelope
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| "unspecified error".to_string());
            return Err(EngineError::Network(format!("GET {}: {}", path, detail)));
        }

        Ok(envelope.data)
    }

    async fn status(&self, bus_id: &str) -> Result<Option<BusStatusData>, EngineError> {
        self.fetch("/bus/status", &[("bus_id", bus_id)]).await
    }
}

#[async_trait]
impl FleetSource for HttpFleetClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn get_bus_location(&self, bus_id: &str) -> Result<Option<BusLocation>, EngineError> {
        Ok(self.status(bus_id).await?.and_then(|d| match (d.lat, d.lon) {
            (Some(lat), Some(lon)) => Some(BusLocation {
                bus_id: d.bus_id,
                lat,
                lon,
                speed_kmph: d.speed_kmph,
                route_id: d.route_id,
            }),
            _ => None,
        }))
    }

    async fn get_bus_status(&self, bus_id: &str) -> Result<Option<BusStatus>, EngineError> {
        Ok(self.status(bus_id).await?.map(|d| BusStatus {
            bus_id: d.bus_id,
            status: d.status,
            status_message: d.status_message,
            route_id: d.route_id,
        }))
    }

    async fn get_route(&self, route_id: &str) -> Result<Option<Route>, EngineError> {
        let data: Option<RouteData> = self.fetch("/route", &[("route_id", route_id)]).await?;
        Ok(data.map(|r| Route {
            route_id: route_id.to_string(),
            stops: r.stops,
        }))
    }

    async fn buses_on_route(&self, route_id: &str) -> Result<Vec<String>, EngineError> {
        let overview: Option<Vec<OverviewEntry>> = self.fetch("/admin/fleet/overview", &[]).await?;
        let mut ids: Vec<String> = overview
            .unwrap_or_default()
            .into_iter()
            .filter(|e| {
                e.route_id
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(route_id))
            })
            .map(|e| e.bus_id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

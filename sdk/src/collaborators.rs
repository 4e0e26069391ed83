//! Collaborator traits
//!
//! The query pipeline only talks to the outside world through these traits.
//! Each one is deliberately narrow; concrete transports (HTTP, SQLite,
//! in-memory snapshots) live in the engine crate, and tests substitute
//! their own implementations.
//!
//! Implementations report failures as `EngineError`. Callers bound every
//! call with a timeout and decide the fallback, so implementations should
//! not retry indefinitely.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::types::{BusLocation, BusStatus, Route, WeatherReport};

/// Source of live fleet telemetry and route geometry
#[async_trait]
pub trait FleetSource: Send + Sync {
    /// Short identifier used in logs (e.g. "snapshot", "http")
    fn name(&self) -> &str;

    /// Current position of a bus; `Ok(None)` when the bus is unknown
    async fn get_bus_location(&self, bus_id: &str) -> Result<Option<BusLocation>, EngineError>;

    /// Operational status of a bus; `Ok(None)` when the bus is unknown
    async fn get_bus_status(&self, bus_id: &str) -> Result<Option<BusStatus>, EngineError>;

    /// Stops of a route; `Ok(None)` when the route is unknown
    async fn get_route(&self, route_id: &str) -> Result<Option<Route>, EngineError>;

    /// Ids of the buses currently assigned to a route
    ///
    /// Sources that cannot enumerate the fleet return an empty list.
    async fn buses_on_route(&self, _route_id: &str) -> Result<Vec<String>, EngineError> {
        Ok(Vec::new())
    }
}

/// Source of current weather conditions
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get_weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherReport, EngineError>;
}

/// External, unreliable reasoning service used for planning and prose
///
/// Responses are raw text and must be parsed defensively by the caller.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the service is worth calling right now
    async fn is_available(&self) -> bool {
        true
    }

    /// Ask for a JSON plan
    async fn generate_plan(&self, prompt: &str) -> Result<String, EngineError>;

    /// Ask for natural-language prose
    async fn generate_prose(&self, prompt: &str) -> Result<String, EngineError>;
}

/// Shared key-value store with per-key expiry
///
/// Losing connectivity is not fatal: callers treat any error as a miss.
#[async_trait]
pub trait KvStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError>;

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), EngineError>;
}

//! Tool registry
//!
//! The three data-gathering tools (gps, weather, eta) share one registry
//! holding their collaborators, the shared key-value cache and the route
//! table. Tools never fail the plan: every outcome, including a missing
//! collaborator, comes back as a `ToolResult`.

pub mod eta;
pub mod geo;
pub mod gps;
pub mod weather;

use sdk::collaborators::{FleetSource, WeatherSource};
use sdk::errors::EngineError;
use sdk::types::{BusLocation, ContextItem, PlanStep, ToolKind, ToolResult, WeatherReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::bounded::bounded;
use crate::cache::JsonCache;
use crate::config::Config;
use crate::fleet::RouteTable;

/// Tuning shared by the tools
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub weather_ttl_secs: u64,
    pub eta_ttl_secs: u64,
    pub nominal_speed_kmph: f64,
    pub default_stop_id: String,
    pub alternative_threshold_secs: u64,
    pub fleet_timeout: Duration,
    pub weather_timeout: Duration,
}

impl ToolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            weather_ttl_secs: config.pipeline.weather_ttl_secs,
            eta_ttl_secs: config.pipeline.eta_ttl_secs,
            nominal_speed_kmph: config.pipeline.nominal_speed_kmph,
            default_stop_id: config.pipeline.default_stop_id.clone(),
            alternative_threshold_secs: config.pipeline.alternative_threshold_secs,
            fleet_timeout: config.timeouts.fleet(),
            weather_timeout: config.timeouts.weather(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&Config::default_config())
    }
}

/// Weather seen earlier in the same plan run
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedWeather {
    pub report: WeatherReport,
    /// The report is the neutral fallback, not a live reading
    pub degraded: bool,
}

/// Values threaded between steps of one plan run
///
/// Created empty for each execution and dropped with it, so nothing leaks
/// between queries.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub last_bus_location: Option<BusLocation>,
    pub last_weather: Option<ObservedWeather>,
}

pub struct ToolRegistry {
    fleet: Arc<dyn FleetSource>,
    weather: Arc<dyn WeatherSource>,
    cache: JsonCache,
    routes: RouteTable,
    settings: ToolSettings,
}

impl ToolRegistry {
    pub fn new(
        fleet: Arc<dyn FleetSource>,
        weather: Arc<dyn WeatherSource>,
        cache: JsonCache,
        routes: RouteTable,
        settings: ToolSettings,
    ) -> Self {
        Self {
            fleet,
            weather,
            cache,
            routes,
            settings,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Run one step; `none` steps produce no result
    pub async fn run(
        &self,
        step: &PlanStep,
        query: &str,
        context: &[ContextItem],
        state: &mut ExecutionState,
    ) -> Option<ToolResult> {
        let result = match step.tool {
            ToolKind::Gps => gps::run(self, step, query, state).await,
            ToolKind::Weather => weather::run(self, step, state).await,
            ToolKind::Eta => eta::run(self, step, query, context, state).await,
            ToolKind::None => return None,
        };
        debug!(tool = %result.tool, outcome = %result.outcome, "tool finished");
        Some(result)
    }

    /// Bounded live location lookup; `Ok(None)` for an unknown bus
    async fn locate_bus(&self, bus_id: &str) -> Result<Option<BusLocation>, EngineError> {
        bounded(
            self.settings.fleet_timeout,
            "bus location lookup",
            self.fleet.get_bus_location(bus_id),
        )
        .await
    }
}

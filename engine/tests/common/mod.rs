//! In-process collaborators shared by the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use sdk::collaborators::{FleetSource, KvStore, ReasoningService, WeatherSource};
use sdk::errors::EngineError;
use sdk::types::{
    BusLocation, BusStatus, Document, Route, SourceKind, Stop, WeatherCondition, WeatherReport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transit_engine::cache::MemoryKvStore;
use transit_engine::conductor::{AnswerEngine, Collaborators};
use transit_engine::config::Config;
use transit_engine::fleet::RouteTable;
use transit_engine::retrieval::HashingEmbedder;

pub const BUS_LAT: f64 = 22.5726;
pub const BUS_LON: f64 = 88.3639;
/// Latitude offset that puts S1 two kilometres north of B1
pub const TWO_KM_NORTH: f64 = 0.017986;

pub struct FakeFleet {
    pub buses: HashMap<String, BusLocation>,
    pub routes: HashMap<String, Route>,
    pub fail: bool,
    pub location_calls: AtomicUsize,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self {
            buses: HashMap::new(),
            routes: HashMap::new(),
            fail: false,
            location_calls: AtomicUsize::new(0),
        }
    }

    /// B1 on R1, S1 two kilometres away, B3 also on R1
    pub fn standard() -> Self {
        let mut fleet = Self::new();
        fleet.add_bus("B1", BUS_LAT, BUS_LON, Some("R1"));
        fleet.add_bus("B3", BUS_LAT + 0.1, BUS_LON, Some("R1"));
        fleet.add_route(
            "R1",
            vec![
                stop("S1", BUS_LAT + TWO_KM_NORTH, BUS_LON),
                stop("S2", BUS_LAT - 0.5, BUS_LON),
            ],
        );
        fleet
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn add_bus(&mut self, id: &str, lat: f64, lon: f64, route: Option<&str>) {
        self.buses.insert(
            id.to_string(),
            BusLocation {
                bus_id: id.to_string(),
                lat,
                lon,
                speed_kmph: 20.0,
                route_id: route.map(String::from),
            },
        );
    }

    pub fn add_route(&mut self, id: &str, stops: Vec<Stop>) {
        self.routes.insert(
            id.to_string(),
            Route {
                route_id: id.to_string(),
                stops,
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), EngineError> {
        if self.fail {
            Err(EngineError::Network("fleet service unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn stop(id: &str, lat: f64, lon: f64) -> Stop {
    Stop {
        stop_id: id.to_string(),
        name: None,
        lat,
        lon,
    }
}

#[async_trait]
impl FleetSource for FakeFleet {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_bus_location(&self, bus_id: &str) -> Result<Option<BusLocation>, EngineError> {
        self.location_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.buses.get(bus_id).cloned())
    }

    async fn get_bus_status(&self, bus_id: &str) -> Result<Option<BusStatus>, EngineError> {
        self.check()?;
        Ok(self.buses.get(bus_id).map(|b| BusStatus {
            bus_id: b.bus_id.clone(),
            status: "running".to_string(),
            status_message: "On schedule".to_string(),
            route_id: b.route_id.clone(),
        }))
    }

    async fn get_route(&self, route_id: &str) -> Result<Option<Route>, EngineError> {
        self.check()?;
        Ok(self.routes.get(route_id).cloned())
    }

    async fn buses_on_route(&self, route_id: &str) -> Result<Vec<String>, EngineError> {
        self.check()?;
        let mut ids: Vec<String> = self
            .buses
            .values()
            .filter(|b| b.route_id.as_deref() == Some(route_id))
            .map(|b| b.bus_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

pub struct FakeWeather {
    pub condition: WeatherCondition,
    pub fail: bool,
}

impl FakeWeather {
    pub fn clear() -> Self {
        Self {
            condition: WeatherCondition::Clear,
            fail: false,
        }
    }

    pub fn with(condition: WeatherCondition) -> Self {
        Self {
            condition,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            condition: WeatherCondition::Clear,
            fail: true,
        }
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_weather_by_coords(&self, _lat: f64, _lon: f64) -> Result<WeatherReport, EngineError> {
        if self.fail {
            return Err(EngineError::Network("weather API unreachable".to_string()));
        }
        Ok(WeatherReport::for_condition(self.condition))
    }
}

/// Reasoning service with canned replies
pub struct FakeReasoning {
    pub available: bool,
    pub plan_reply: Result<String, String>,
    pub prose_reply: Result<String, String>,
    /// Sleep this long before every reply
    pub delay: Option<Duration>,
}

impl FakeReasoning {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            plan_reply: Err("unavailable".to_string()),
            prose_reply: Err("unavailable".to_string()),
            delay: None,
        }
    }

    pub fn erroring() -> Self {
        Self {
            available: true,
            ..Self::unavailable()
        }
    }

    pub fn replying(plan: &str, prose: &str) -> Self {
        Self {
            available: true,
            plan_reply: Ok(plan.to_string()),
            prose_reply: Ok(prose.to_string()),
            delay: None,
        }
    }

    async fn reply(&self, reply: &Result<String, String>) -> Result<String, EngineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply.clone().map_err(EngineError::LLMProvider)
    }
}

#[async_trait]
impl ReasoningService for FakeReasoning {
    fn name(&self) -> &str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate_plan(&self, _prompt: &str) -> Result<String, EngineError> {
        self.reply(&self.plan_reply).await
    }

    async fn generate_prose(&self, _prompt: &str) -> Result<String, EngineError> {
        self.reply(&self.prose_reply).await
    }
}

/// Store whose every call fails
pub struct BrokenKv;

#[async_trait]
impl KvStore for BrokenKv {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Err(EngineError::Cache("connection refused".to_string()))
    }

    async fn set_with_expiry(&self, _key: &str, _value: Vec<u8>, _ttl: u64) -> Result<(), EngineError> {
        Err(EngineError::Cache("connection refused".to_string()))
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default_config();
    config.timeouts.reasoning_ms = 200;
    config.timeouts.fleet_ms = 200;
    config.timeouts.weather_ms = 200;
    config.timeouts.cache_ms = 200;
    config.timeouts.retrieval_ms = 500;
    config
}

pub fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "B1",
            "Bus B1 on route R1 is at 22.5726, 88.3639 travelling at 20.0 km/h.",
            SourceKind::Bus,
        ),
        Document::new(
            "R1",
            "Route R1 has 2 stops: S1 at 22.5906, 88.3639; S2 at 22.0726, 88.3639.",
            SourceKind::Route,
        ),
    ]
}

pub struct Harness {
    pub fleet: Arc<FakeFleet>,
    pub weather: Arc<FakeWeather>,
    pub reasoning: Arc<FakeReasoning>,
    pub kv: Arc<dyn KvStore>,
    pub documents: Vec<Document>,
    pub routes: RouteTable,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            fleet: Arc::new(FakeFleet::standard()),
            weather: Arc::new(FakeWeather::clear()),
            reasoning: Arc::new(FakeReasoning::unavailable()),
            kv: Arc::new(MemoryKvStore::new(128)),
            documents: corpus(),
            routes: RouteTable::default(),
            config: test_config(),
        }
    }

    pub async fn build(&self) -> AnswerEngine {
        let collaborators = Collaborators {
            fleet: Arc::clone(&self.fleet) as Arc<dyn FleetSource>,
            weather: Arc::clone(&self.weather) as Arc<dyn WeatherSource>,
            reasoning: Arc::clone(&self.reasoning) as Arc<dyn ReasoningService>,
            kv: Arc::clone(&self.kv),
        };
        AnswerEngine::new(
            collaborators,
            self.documents.clone(),
            self.routes.clone(),
            Arc::new(HashingEmbedder::new(64)),
            &self.config,
        )
        .await
    }
}

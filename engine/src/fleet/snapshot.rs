//! Fleet snapshot loaded from `buses.json` and `routes.json`
//!
//! The snapshot is the document store for retrieval, the raw route table
//! for stop resolution, and a local `FleetSource` when no fleet service is
//! running. Ids are kept in `BTreeMap`s so every listing comes out in
//! sorted order.

use async_trait::async_trait;
use sdk::collaborators::FleetSource;
use sdk::errors::EngineError;
use sdk::types::{BusLocation, BusStatus, Document, Route, SourceKind, Stop};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, warn};

use super::routes::RouteTable;

/// One entry of `buses.json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BusRecord {
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default = "default_speed")]
    pub speed_kmph: f64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_status_message")]
    pub status_message: String,
}

fn default_speed() -> f64 {
    20.0
}

fn default_status() -> String {
    "unknown".to_string()
}

fn default_status_message() -> String {
    "No status available".to_string()
}

/// One entry of `routes.json`
#[derive(Debug, Clone, Deserialize)]
struct RouteRecord {
    #[serde(default)]
    stops: Vec<Stop>,
}

#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    buses: BTreeMap<String, BusRecord>,
    routes: RouteTable,
}

impl FleetSnapshot {
    /// Load `buses.json` and `routes.json` from `data_dir`
    ///
    /// A missing file yields an empty table with a warning; a malformed one
    /// is a parse error.
    pub fn load(data_dir: &Path) -> Result<Self, EngineError> {
        let buses = read_optional(&data_dir.join("buses.json"))?;
        let routes = read_optional(&data_dir.join("routes.json"))?;
        let snapshot = Self::from_json(
            buses.as_deref().unwrap_or("{}"),
            routes.as_deref().unwrap_or("{}"),
        )?;

        debug!(
            buses = snapshot.bus_count(),
            routes = snapshot.route_count(),
            dir = %data_dir.display(),
            "fleet snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn from_json(buses_json: &str, routes_json: &str) -> Result<Self, EngineError> {
        let buses: BTreeMap<String, BusRecord> = serde_json::from_str(buses_json)
            .map_err(|e| EngineError::Parse(format!("buses.json: {}", e)))?;
        let raw_routes: BTreeMap<String, RouteRecord> = serde_json::from_str(routes_json)
            .map_err(|e| EngineError::Parse(format!("routes.json: {}", e)))?;

        let routes = raw_routes
            .into_iter()
            .map(|(id, r)| {
                let route = Route {
                    route_id: id.clone(),
                    stops: r.stops,
                };
                (id, route)
            })
            .collect();

        Ok(Self {
            buses,
            routes: RouteTable::new(routes),
        })
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn route_table(&self) -> RouteTable {
        self.routes.clone()
    }

    fn bus(&self, bus_id: &str) -> Option<(&String, &BusRecord)> {
        self.buses.get_key_value(bus_id).or_else(|| {
            self.buses
                .iter()
                .find(|(id, _)| id.eq_ignore_ascii_case(bus_id))
        })
    }

    /// Render the retrievable corpus: every bus, then every route
    pub fn documents(&self) -> Vec<Document> {
        let mut docs = Vec::with_capacity(self.buses.len() + self.routes.len());

        for (id, bus) in &self.buses {
            let mut text = format!("Bus {}", id);
            if let Some(route) = &bus.route_id {
                let _ = write!(text, " on route {}", route);
            }
            if let (Some(lat), Some(lon)) = (bus.lat, bus.lon) {
                let _ = write!(text, " is at {:.4}, {:.4}", lat, lon);
            }
            let _ = write!(
                text,
                " travelling at {:.1} km/h. Status: {} ({}).",
                bus.speed_kmph, bus.status, bus.status_message
            );
            docs.push(Document::new(id.clone(), text, SourceKind::Bus));
        }

        for (id, route) in self.routes.iter() {
            let stops: Vec<String> = route
                .stops
                .iter()
                .map(|s| match &s.name {
                    Some(name) => format!("{} ({}) at {:.4}, {:.4}", s.stop_id, name, s.lat, s.lon),
                    None => format!("{} at {:.4}, {:.4}", s.stop_id, s.lat, s.lon),
                })
                .collect();
            let text = format!(
                "Route {} has {} stops: {}.",
                id,
                route.stops.len(),
                stops.join("; ")
            );
            docs.push(Document::new(id.clone(), text, SourceKind::Route));
        }

        docs
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, EngineError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "fleet data file missing, using an empty table");
            Ok(None)
        }
        Err(e) => Err(EngineError::Io(e)),
    }
}

#[async_trait]
impl FleetSource for FleetSnapshot {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn get_bus_location(&self, bus_id: &str) -> Result<Option<BusLocation>, EngineError> {
        let Some((id, bus)) = self.bus(bus_id) else {
            return Ok(None);
        };
        match (bus.lat, bus.lon) {
            (Some(lat), Some(lon)) => Ok(Some(BusLocation {
                bus_id: id.clone(),
                lat,
                lon,
                speed_kmph: bus.speed_kmph,
                route_id: bus.route_id.clone(),
            })),
            // Known bus without a fix is as good as unknown for location
            _ => Ok(None),
        }
    }

    async fn get_bus_status(&self, bus_id: &str) -> Result<Option<BusStatus>, EngineError> {
        Ok(self.bus(bus_id).map(|(id, bus)| BusStatus {
            bus_id: id.clone(),
            status: bus.status.clone(),
            status_message: bus.status_message.clone(),
            route_id: bus.route_id.clone(),
        }))
    }

    async fn get_route(&self, route_id: &str) -> Result<Option<Route>, EngineError> {
        Ok(self.routes.get(route_id).cloned())
    }

    async fn buses_on_route(&self, route_id: &str) -> Result<Vec<String>, EngineError> {
        Ok(self
            .buses
            .iter()
            .filter(|(_, b)| {
                b.route_id
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(route_id))
            })
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUSES: &str = r#"{
        "B2": {"route_id": "R1", "lat": 22.60, "lon": 88.40, "speed_kmph": 18, "status": "delayed", "status_message": "Traffic"},
        "B1": {"route_id": "R1", "lat": 22.5726, "lon": 88.3639},
        "B7": {"status": "maintenance"}
    }"#;

    const ROUTES: &str = r#"{
        "R1": {"stops": [
            {"stop_id": "S1", "name": "Esplanade", "lat": 22.5906, "lon": 88.3639},
            {"stop_id": "S2", "lat": 22.61, "lon": 88.37}
        ]}
    }"#;

    #[test]
    fn test_documents_are_sorted_by_kind_then_id() {
        let snapshot = FleetSnapshot::from_json(BUSES, ROUTES).unwrap();
        let docs = snapshot.documents();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B2", "B7", "R1"]);
        assert_eq!(docs[3].source_kind, SourceKind::Route);
        assert!(docs[3].text.contains("S1 (Esplanade) at 22.5906, 88.3639"));
        assert!(docs[0].text.contains("Status: unknown"));
    }

    #[tokio::test]
    async fn test_fleet_source_lookups() {
        let snapshot = FleetSnapshot::from_json(BUSES, ROUTES).unwrap();

        let loc = snapshot.get_bus_location("b1").await.unwrap().unwrap();
        assert_eq!(loc.bus_id, "B1");
        assert_eq!(loc.speed_kmph, 20.0);
        assert_eq!(loc.route_id.as_deref(), Some("R1"));

        assert!(snapshot.get_bus_location("B7").await.unwrap().is_none());
        assert!(snapshot.get_bus_location("B99").await.unwrap().is_none());

        let status = snapshot.get_bus_status("B7").await.unwrap().unwrap();
        assert_eq!(status.status, "maintenance");

        let route = snapshot.get_route("R1").await.unwrap().unwrap();
        assert_eq!(route.stops.len(), 2);

        assert_eq!(
            snapshot.buses_on_route("R1").await.unwrap(),
            vec!["B1".to_string(), "B2".to_string()]
        );
    }

    #[test]
    fn test_load_tolerates_missing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("buses.json"), BUSES).unwrap();

        let snapshot = FleetSnapshot::load(dir.path()).unwrap();
        assert_eq!(snapshot.bus_count(), 3);
        assert_eq!(snapshot.route_count(), 0);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let err = FleetSnapshot::from_json("[1,2]", "{}").unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }
}

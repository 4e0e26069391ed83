//! Raw route table
//!
//! A read-only view over every known route, used when the fleet
//! collaborator cannot place a stop on the bus's own route.

use sdk::types::{Route, Stop};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, Route>,
}

impl RouteTable {
    pub fn new(routes: BTreeMap<String, Route>) -> Self {
        Self { routes }
    }

    pub fn get(&self, route_id: &str) -> Option<&Route> {
        self.routes.get(route_id).or_else(|| {
            self.routes
                .iter()
                .find(|(id, _)| id.eq_ignore_ascii_case(route_id))
                .map(|(_, r)| r)
        })
    }

    /// First stop with this id across all routes, in route id order
    pub fn find_stop(&self, stop_id: &str) -> Option<&Stop> {
        self.routes.values().find_map(|r| r.find_stop(stop_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Route)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, lat: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            name: None,
            lat,
            lon: 88.0,
        }
    }

    #[test]
    fn test_find_stop_prefers_lowest_route_id() {
        let mut routes = BTreeMap::new();
        routes.insert(
            "R2".to_string(),
            Route {
                route_id: "R2".to_string(),
                stops: vec![stop("S1", 2.0)],
            },
        );
        routes.insert(
            "R1".to_string(),
            Route {
                route_id: "R1".to_string(),
                stops: vec![stop("S1", 1.0), stop("S2", 1.5)],
            },
        );
        let table = RouteTable::new(routes);

        assert_eq!(table.find_stop("S1").map(|s| s.lat), Some(1.0));
        assert_eq!(table.find_stop("s2").map(|s| s.lat), Some(1.5));
        assert!(table.find_stop("S9").is_none());
        assert!(table.get("r2").is_some());
    }
}

//! Arrival-time estimation
//!
//! A cache miss resolves the stop in three tiers: the bus's own route from
//! the fleet collaborator, then the raw route table, then coordinates found
//! next to the stop id in the retrieved context. The last tier is a guess
//! and marks the result degraded.

use regex::Regex;
use sdk::types::{
    BusLocation, ContextItem, EtaEstimate, GeoPoint, PlanStep, ToolKind, ToolPayload, ToolResult,
};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::geo::{haversine_km, travel_secs};
use super::{ExecutionState, ToolRegistry};
use crate::bounded::bounded;
use crate::conductor::query::{canonical_id, extract_bus_id, extract_stop_id};

const MIN_DELAY_FACTOR: f64 = 1.0;
const MAX_DELAY_FACTOR: f64 = 2.0;

static DECIMAL: OnceLock<Regex> = OnceLock::new();

fn decimal_pattern() -> &'static Regex {
    DECIMAL.get_or_init(|| Regex::new(r"[-+]?\d+\.\d+").expect("Invalid decimal pattern"))
}

pub fn cache_key(bus_id: &str, stop_id: &str) -> String {
    format!("eta:{}:{}", bus_id, stop_id)
}

/// Where the stop position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopSource {
    FleetRoute,
    RouteTable,
    Context,
}

/// Coordinates printed after `stop_id` in the first context document that
/// mentions it
pub fn stop_from_context(stop_id: &str, context: &[ContextItem]) -> Option<GeoPoint> {
    let id_pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(stop_id))).ok()?;

    context.iter().find_map(|item| {
        let text = &item.document.text;
        let found = id_pattern.find(text)?;
        let mut numbers = decimal_pattern()
            .find_iter(&text[found.end()..])
            .filter_map(|m| m.as_str().parse::<f64>().ok());
        let point = GeoPoint::new(numbers.next()?, numbers.next()?);
        point.is_valid().then_some(point)
    })
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(MIN_DELAY_FACTOR, MAX_DELAY_FACTOR)
    } else {
        MIN_DELAY_FACTOR
    }
}

pub(crate) async fn run(
    registry: &ToolRegistry,
    step: &PlanStep,
    query: &str,
    context: &[ContextItem],
    state: &mut ExecutionState,
) -> ToolResult {
    let bus_id = step
        .param("bus_id")
        .map(canonical_id)
        .or_else(|| extract_bus_id(query))
        .or_else(|| state.last_bus_location.as_ref().map(|l| l.bus_id.clone()));
    let Some(bus_id) = bus_id else {
        return ToolResult::failed(ToolKind::Eta, "no bus id to estimate an arrival for");
    };

    let stop_id = step
        .param("stop_id")
        .or_else(|| step.param("stop"))
        .map(canonical_id)
        .or_else(|| extract_stop_id(query))
        .unwrap_or_else(|| registry.settings.default_stop_id.clone());

    let key = cache_key(&bus_id, &stop_id);
    if let Some(estimate) = registry.cache.get_json::<EtaEstimate>(&key).await {
        return ToolResult::success(ToolKind::Eta, ToolPayload::Eta(estimate));
    }

    let location = match current_location(registry, &bus_id, state).await {
        Ok(location) => location,
        Err(note) => return ToolResult::failed(ToolKind::Eta, note),
    };

    let route_id = match location.route_id.clone() {
        Some(r) => Some(r),
        None => route_from_status(registry, &bus_id).await,
    };

    let Some((stop, source)) = resolve_stop(registry, route_id.as_deref(), &stop_id, context).await
    else {
        return ToolResult::failed(
            ToolKind::Eta,
            format!("stop {} could not be located", stop_id),
        );
    };
    debug!(stop_id = %stop_id, source = ?source, "stop resolved");

    let (factor, weather_degraded) = match &state.last_weather {
        Some(w) => (clamp_factor(w.report.delay_factor), w.degraded),
        None => (MIN_DELAY_FACTOR, false),
    };

    let speed = registry.settings.nominal_speed_kmph;
    let distance_km = haversine_km(location.point(), stop);
    let (Some(base_secs), Some(eta_secs)) = (
        travel_secs(distance_km, speed, 1.0),
        travel_secs(distance_km, speed, factor),
    ) else {
        return ToolResult::failed(ToolKind::Eta, "travel time could not be computed");
    };

    let alternatives = if eta_secs >= registry.settings.alternative_threshold_secs {
        match route_id.as_deref() {
            Some(route) => alternatives_on_route(registry, route, &bus_id).await,
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let estimate = EtaEstimate {
        bus_id,
        stop_id,
        route_id,
        distance_km,
        speed_kmph: speed,
        base_secs,
        eta_secs,
        delay_factor: factor,
        alternatives,
    };

    let mut caveats = Vec::new();
    if source == StopSource::Context {
        caveats.push(format!(
            "stop {} position taken from retrieved context",
            estimate.stop_id
        ));
    }
    if weather_degraded {
        caveats.push("weather unavailable, no weather delay applied".to_string());
    }

    if caveats.is_empty() {
        registry
            .cache
            .put_json(&key, &estimate, registry.settings.eta_ttl_secs)
            .await;
        ToolResult::success(ToolKind::Eta, ToolPayload::Eta(estimate))
    } else {
        ToolResult::degraded(ToolKind::Eta, ToolPayload::Eta(estimate), caveats.join("; "))
    }
}

/// Bus position from earlier in the run, or a fresh lookup
async fn current_location(
    registry: &ToolRegistry,
    bus_id: &str,
    state: &mut ExecutionState,
) -> Result<BusLocation, String> {
    if let Some(known) = &state.last_bus_location {
        if known.bus_id.eq_ignore_ascii_case(bus_id) {
            return Ok(known.clone());
        }
    }

    match registry.locate_bus(bus_id).await {
        Ok(Some(location)) => {
            state.last_bus_location = Some(location.clone());
            Ok(location)
        }
        Ok(None) => Err(format!("bus {} not found, cannot estimate arrival", bus_id)),
        Err(e) => {
            warn!(bus_id = %bus_id, error = %e, "location lookup for eta failed");
            Err(format!("location of bus {} unavailable: {}", bus_id, e))
        }
    }
}

async fn route_from_status(registry: &ToolRegistry, bus_id: &str) -> Option<String> {
    match bounded(
        registry.settings.fleet_timeout,
        "bus status lookup",
        registry.fleet.get_bus_status(bus_id),
    )
    .await
    {
        Ok(status) => status.and_then(|s| s.route_id),
        Err(e) => {
            warn!(bus_id = %bus_id, error = %e, "bus status lookup failed");
            None
        }
    }
}

async fn resolve_stop(
    registry: &ToolRegistry,
    route_id: Option<&str>,
    stop_id: &str,
    context: &[ContextItem],
) -> Option<(GeoPoint, StopSource)> {
    if let Some(route_id) = route_id {
        match bounded(
            registry.settings.fleet_timeout,
            "route lookup",
            registry.fleet.get_route(route_id),
        )
        .await
        {
            Ok(Some(route)) => {
                if let Some(stop) = route.find_stop(stop_id) {
                    return Some((stop.point(), StopSource::FleetRoute));
                }
            }
            Ok(None) => debug!(route_id, "route unknown to fleet source"),
            Err(e) => warn!(route_id, error = %e, "route lookup failed"),
        }
    }

    if let Some(stop) = registry.routes.find_stop(stop_id) {
        return Some((stop.point(), StopSource::RouteTable));
    }

    stop_from_context(stop_id, context).map(|p| (p, StopSource::Context))
}

async fn alternatives_on_route(registry: &ToolRegistry, route_id: &str, bus_id: &str) -> Vec<String> {
    match bounded(
        registry.settings.fleet_timeout,
        "route fleet lookup",
        registry.fleet.buses_on_route(route_id),
    )
    .await
    {
        Ok(ids) => ids
            .into_iter()
            .filter(|id| !id.eq_ignore_ascii_case(bus_id))
            .collect(),
        Err(e) => {
            warn!(route_id, error = %e, "could not list buses on route");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::{Document, SourceKind};

    fn ctx(texts: &[&str]) -> Vec<ContextItem> {
        texts
            .iter()
            .enumerate()
            .map(|(rank, t)| ContextItem {
                document: Document::new(format!("D{}", rank), *t, SourceKind::Route),
                rank,
            })
            .collect()
    }

    #[test]
    fn test_stop_from_context() {
        let context = ctx(&[
            "Bus B1 on route R1 is at 22.5726, 88.3639",
            "Route R1 has 2 stops: S1 (Esplanade) at 22.5906, 88.3639; S12 at 1.5, 2.5.",
        ]);
        assert_eq!(
            stop_from_context("S1", &context),
            Some(GeoPoint::new(22.5906, 88.3639))
        );
        assert_eq!(
            stop_from_context("s12", &context),
            Some(GeoPoint::new(1.5, 2.5))
        );
        assert_eq!(stop_from_context("S3", &context), None);
    }

    #[test]
    fn test_stop_from_context_needs_two_numbers() {
        let context = ctx(&["Stop S4 is near 22.5"]);
        assert_eq!(stop_from_context("S4", &context), None);
    }

    #[test]
    fn test_clamp_factor() {
        assert_eq!(clamp_factor(0.5), 1.0);
        assert_eq!(clamp_factor(1.2), 1.2);
        assert_eq!(clamp_factor(9.0), 2.0);
        assert_eq!(clamp_factor(f64::NAN), 1.0);
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("B1", "S1"), "eta:B1:S1");
    }
}

//! Weather lookup with a coordinate-keyed cache
//!
//! Coordinates are rounded to three decimals (about 110 m) for the cache
//! key so nearby lookups share an entry.

use sdk::types::{GeoPoint, PlanStep, ToolKind, ToolPayload, ToolResult, WeatherReport};
use tracing::warn;

use super::{ExecutionState, ObservedWeather, ToolRegistry};
use crate::bounded::bounded;

pub fn cache_key(point: GeoPoint) -> String {
    format!("weather:{}:{}", key_coord(point.lat), key_coord(point.lon))
}

// Values that round to zero print without a sign
fn key_coord(value: f64) -> String {
    let text = format!("{:.3}", value);
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

fn coordinates(step: &PlanStep, state: &ExecutionState) -> Option<GeoPoint> {
    let from_params = match (step.param("lat"), step.param("lon")) {
        (Some(lat), Some(lon)) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        },
        _ => None,
    };
    from_params.or_else(|| state.last_bus_location.as_ref().map(|l| l.point()))
}

pub(crate) async fn run(
    registry: &ToolRegistry,
    step: &PlanStep,
    state: &mut ExecutionState,
) -> ToolResult {
    let Some(point) = coordinates(step, state) else {
        return ToolResult::failed(
            ToolKind::Weather,
            "no coordinates available for the weather lookup",
        );
    };
    if !point.is_valid() {
        return ToolResult::failed(
            ToolKind::Weather,
            format!("coordinates out of range: {}, {}", point.lat, point.lon),
        );
    }

    let key = cache_key(point);
    if let Some(report) = registry.cache.get_json::<WeatherReport>(&key).await {
        state.last_weather = Some(ObservedWeather {
            report: report.clone(),
            degraded: false,
        });
        return ToolResult::success(ToolKind::Weather, ToolPayload::Weather(report));
    }

    let lookup = bounded(
        registry.settings.weather_timeout,
        "weather lookup",
        registry.weather.get_weather_by_coords(point.lat, point.lon),
    )
    .await;

    match lookup {
        Ok(report) => {
            registry
                .cache
                .put_json(&key, &report, registry.settings.weather_ttl_secs)
                .await;
            state.last_weather = Some(ObservedWeather {
                report: report.clone(),
                degraded: false,
            });
            ToolResult::success(ToolKind::Weather, ToolPayload::Weather(report))
        }
        Err(e) => {
            warn!(source = registry.weather.name(), error = %e, "weather lookup failed, assuming neutral conditions");
            let report = WeatherReport::neutral();
            state.last_weather = Some(ObservedWeather {
                report: report.clone(),
                degraded: true,
            });
            ToolResult::degraded(
                ToolKind::Weather,
                ToolPayload::Weather(report),
                format!("weather unavailable ({}); assuming no weather delay", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_rounds_to_three_decimals() {
        assert_eq!(cache_key(GeoPoint::new(22.57264, 88.36391)), "weather:22.573:88.364");
        assert_eq!(cache_key(GeoPoint::new(22.5731, 88.3639)), "weather:22.573:88.364");
        assert_eq!(cache_key(GeoPoint::new(-33.9, 151.0)), "weather:-33.900:151.000");
    }

    #[test]
    fn test_cache_key_shared_across_equator_and_meridian() {
        assert_eq!(cache_key(GeoPoint::new(-0.0001, 10.0)), "weather:0.000:10.000");
        assert_eq!(
            cache_key(GeoPoint::new(-0.0001, -0.0002)),
            cache_key(GeoPoint::new(0.0001, 0.0002))
        );
        assert_eq!(cache_key(GeoPoint::new(-0.0006, 0.0)), "weather:-0.001:0.000");
    }
}

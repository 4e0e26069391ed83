//! Data model shared by the engine and its collaborators
//!
//! Every type here is plain data: immutable once built, serializable so it
//! can travel through the key-value cache, and free of engine behavior.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of fleet entity a document describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bus,
    Route,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Bus => write!(f, "bus"),
            SourceKind::Route => write!(f, "route"),
        }
    }
}

/// A piece of descriptive fleet/route text in the retrievable corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source_kind: SourceKind,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_kind,
        }
    }
}

/// A retrieved document and its ordinal relevance rank (0 = most relevant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextItem {
    pub document: Document,
    pub rank: usize,
}

/// The capabilities a plan step can invoke
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Gps,
    Weather,
    Eta,
    None,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Gps => "gps",
            ToolKind::Weather => "weather",
            ToolKind::Eta => "eta",
            ToolKind::None => "none",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gps" => Ok(ToolKind::Gps),
            "weather" => Ok(ToolKind::Weather),
            "eta" => Ok(ToolKind::Eta),
            "none" => Ok(ToolKind::None),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}

/// One tool invocation in a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStep {
    pub tool: ToolKind,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl PlanStep {
    pub fn new(tool: ToolKind) -> Self {
        Self {
            tool,
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter; `None` values are skipped
    pub fn with_param(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(v) = value {
            self.params.insert(key.to_string(), v.into());
        }
        self
    }

    /// Look up a non-blank parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// How a tool invocation ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Success,
    /// A fallback value was used; the payload is usable but not live
    Degraded,
    Failed,
}

impl ToolOutcome {
    /// Whether the payload can be used to answer
    pub fn is_usable(&self) -> bool {
        matches!(self, ToolOutcome::Success | ToolOutcome::Degraded)
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ToolOutcome::Success => "success",
            ToolOutcome::Degraded => "degraded",
            ToolOutcome::Failed => "failed",
        })
    }
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Live position of a bus as reported by the fleet collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusLocation {
    pub bus_id: String,
    pub lat: f64,
    pub lon: f64,
    pub speed_kmph: f64,
    #[serde(default)]
    pub route_id: Option<String>,
}

impl BusLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Operational status of a bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusStatus {
    pub bus_id: String,
    pub status: String,
    pub status_message: String,
    #[serde(default)]
    pub route_id: Option<String>,
}

/// A stop on a route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// An ordered list of stops
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Route {
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Route {
    pub fn find_stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops
            .iter()
            .find(|s| s.stop_id.eq_ignore_ascii_case(stop_id))
    }
}

/// Coarse weather category used for the delay adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Drizzle,
    Mist,
    Rain,
    Snow,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Map a provider label ("Rain", "Haze", "Thunderstorm", ...) onto a category
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase();
        if l.contains("thunder") || l.contains("storm") {
            WeatherCondition::Thunderstorm
        } else if l.contains("snow") || l.contains("sleet") {
            WeatherCondition::Snow
        } else if l.contains("drizzle") {
            WeatherCondition::Drizzle
        } else if l.contains("rain") || l.contains("shower") {
            WeatherCondition::Rain
        } else if ["mist", "haze", "fog", "smoke", "dust", "sand"]
            .iter()
            .any(|k| l.contains(k))
        {
            WeatherCondition::Mist
        } else if l.contains("cloud") || l.contains("overcast") {
            WeatherCondition::Clouds
        } else if l.contains("clear") || l.contains("sun") {
            WeatherCondition::Clear
        } else {
            WeatherCondition::Unknown
        }
    }

    /// Multiplicative travel-time factor for this condition
    pub fn delay_factor(&self) -> f64 {
        match self {
            WeatherCondition::Clear | WeatherCondition::Clouds | WeatherCondition::Unknown => 1.0,
            WeatherCondition::Drizzle => 1.10,
            WeatherCondition::Mist => 1.15,
            WeatherCondition::Rain => 1.20,
            WeatherCondition::Snow => 1.35,
            WeatherCondition::Thunderstorm => 1.40,
        }
    }

    pub fn is_adverse(&self) -> bool {
        self.delay_factor() > 1.0
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Clouds => "clouds",
            WeatherCondition::Drizzle => "drizzle",
            WeatherCondition::Mist => "mist",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Current weather at a coordinate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub condition: WeatherCondition,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub temp_c: Option<f64>,
    pub delay_factor: f64,
}

impl WeatherReport {
    pub fn for_condition(condition: WeatherCondition) -> Self {
        Self {
            condition,
            description: String::new(),
            temp_c: None,
            delay_factor: condition.delay_factor(),
        }
    }

    /// Neutral report used when the weather source is unavailable
    pub fn neutral() -> Self {
        Self::for_condition(WeatherCondition::Unknown)
    }
}

/// Result of an ETA computation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EtaEstimate {
    pub bus_id: String,
    pub stop_id: String,
    #[serde(default)]
    pub route_id: Option<String>,
    pub distance_km: f64,
    pub speed_kmph: f64,
    /// Travel time before the weather adjustment
    pub base_secs: u64,
    pub eta_secs: u64,
    pub delay_factor: f64,
    /// Other buses serving the same route, offered when the ETA is long
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// Tool-specific payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ToolPayload {
    Empty,
    Gps(BusLocation),
    Weather(WeatherReport),
    Eta(EtaEstimate),
}

/// Outcome of executing one plan step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool: ToolKind,
    pub outcome: ToolOutcome,
    pub payload: ToolPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ToolResult {
    pub fn success(tool: ToolKind, payload: ToolPayload) -> Self {
        Self {
            tool,
            outcome: ToolOutcome::Success,
            payload,
            note: None,
        }
    }

    pub fn degraded(tool: ToolKind, payload: ToolPayload, note: impl Into<String>) -> Self {
        Self {
            tool,
            outcome: ToolOutcome::Degraded,
            payload,
            note: Some(note.into()),
        }
    }

    pub fn failed(tool: ToolKind, note: impl Into<String>) -> Self {
        Self {
            tool,
            outcome: ToolOutcome::Failed,
            payload: ToolPayload::Empty,
            note: Some(note.into()),
        }
    }

    pub fn eta(&self) -> Option<&EtaEstimate> {
        match &self.payload {
            ToolPayload::Eta(e) => Some(e),
            _ => None,
        }
    }
}

/// The unit returned to callers and stored in the query cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub answer: String,
    pub tool_results: Vec<ToolResult>,
    pub context: Vec<ContextItem>,
    pub computed_at: DateTime<Utc>,
}

impl AnswerRecord {
    pub fn new(answer: impl Into<String>, tool_results: Vec<ToolResult>, context: Vec<ContextItem>) -> Self {
        Self {
            answer: answer.into(),
            tool_results,
            context,
            computed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_parsing() {
        assert_eq!("GPS".parse::<ToolKind>(), Ok(ToolKind::Gps));
        assert_eq!(" eta ".parse::<ToolKind>(), Ok(ToolKind::Eta));
        assert!("traffic".parse::<ToolKind>().is_err());
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("{:<8}|", ToolKind::Gps), "gps     |");
        assert_eq!(format!("{:>9}", ToolOutcome::Failed), "   failed");
        assert_eq!(ToolKind::Weather.to_string(), "weather");
    }

    #[test]
    fn test_plan_step_blank_params_are_absent() {
        let step = PlanStep::new(ToolKind::Eta)
            .with_param("bus_id", Some("B1"))
            .with_param("stop_id", Some("  "))
            .with_param("route_id", None::<String>);
        assert_eq!(step.param("bus_id"), Some("B1"));
        assert_eq!(step.param("stop_id"), None);
        assert_eq!(step.param("route_id"), None);
    }

    #[test]
    fn test_weather_condition_labels() {
        assert_eq!(WeatherCondition::from_label("Rain"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_label("Haze"), WeatherCondition::Mist);
        assert_eq!(
            WeatherCondition::from_label("Thunderstorm"),
            WeatherCondition::Thunderstorm
        );
        assert_eq!(WeatherCondition::from_label("Clear"), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_label("???"), WeatherCondition::Unknown);
    }

    #[test]
    fn test_neutral_weather_has_no_delay() {
        let w = WeatherReport::neutral();
        assert_eq!(w.delay_factor, 1.0);
        assert!(!w.condition.is_adverse());
        assert!(WeatherCondition::Rain.is_adverse());
    }

    #[test]
    fn test_failed_result_has_empty_payload() {
        let r = ToolResult::failed(ToolKind::Gps, "bus B9 not found");
        assert_eq!(r.outcome, ToolOutcome::Failed);
        assert_eq!(r.payload, ToolPayload::Empty);
        assert!(!r.outcome.is_usable());
        assert!(r.eta().is_none());
    }

    #[test]
    fn test_route_stop_lookup_ignores_case() {
        let route = Route {
            route_id: "R1".to_string(),
            stops: vec![Stop {
                stop_id: "S1".to_string(),
                name: None,
                lat: 1.0,
                lon: 2.0,
            }],
        };
        assert!(route.find_stop("s1").is_some());
        assert!(route.find_stop("S2").is_none());
    }
}

//! Transit SDK
//!
//! Shared library providing the data model, collaborator traits and error
//! types for the transit query engine. The engine depends on it, and so can
//! any service that wants to plug in its own fleet, weather, reasoning or
//! cache backend.

/// Collaborator traits consumed by the query pipeline
pub mod collaborators;

/// Error types and handling
pub mod errors;

/// Data model
pub mod types;

// Re-export commonly used types
pub use collaborators::{FleetSource, KvStore, ReasoningService, WeatherSource};
pub use errors::{EngineError, EngineErrorExt};
pub use types::{
    AnswerRecord, BusLocation, BusStatus, ContextItem, Document, EtaEstimate, GeoPoint, PlanStep,
    Route, SourceKind, Stop, ToolKind, ToolOutcome, ToolPayload, ToolResult, WeatherCondition,
    WeatherReport,
};

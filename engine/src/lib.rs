//! Transit Engine Library
//!
//! Query-answering core for a bus fleet, plus the collaborator adapters,
//! configuration and CLI around it. Used by the `transit` binary and the
//! integration tests.

/// Collaborator wiring from configuration
pub mod bootstrap;

/// Timeout wrapper for external calls
pub mod bounded;

/// JSON-over-KV cache and in-process stores
pub mod cache;

/// CLI interface module
pub mod cli;

/// Configuration management module
pub mod config;

/// Query pipeline: planning, execution, composition
pub mod conductor;

/// SQLite-backed cache store
pub mod db;

/// Fleet collaborators and route data
pub mod fleet;

/// Command handlers module
pub mod handlers;

/// LLM provider abstraction layer
pub mod llm;

/// Context retrieval over the fleet corpus
pub mod retrieval;

/// Telemetry and Observability
pub mod telemetry;

/// gps, weather and eta tools
pub mod tools;

/// Weather collaborators
pub mod weather;

//! Configuration management
//!
//! This module handles loading, validation, and management of the transit
//! engine configuration. Configuration is stored in TOML format at
//! ~/.transit/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Reasoning service providers
//! - **retrieval**: Context retriever settings (top-k, embedder)
//! - **pipeline**: Cache TTLs, nominal speed, default stop
//! - **timeouts**: Per-collaborator call budgets
//! - **fleet**: Fleet collaborator and snapshot location
//! - **weather**: Weather collaborator
//! - **cache**: Key-value cache backend
//!
//! # Examples
//!
//! ```no_run
//! use transit_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Top-k: {}", config.retrieval.top_k);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Reasoning service configuration
    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub fleet: FleetConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Use the reasoning service at all; rule-based paths otherwise
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default LLM provider (ollama, openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

/// Context retriever configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of context items returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Embedder backend (hashing, ollama)
    #[serde(default = "default_embedder")]
    pub embedder: String,

    /// Dimensionality of the hashing embedder
    #[serde(default = "default_dims")]
    pub dims: usize,

    /// Embedding model when `embedder = "ollama"`
    #[serde(default = "default_ollama_embed_model")]
    pub ollama_model: String,
}

/// Query pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_query_ttl")]
    pub query_ttl_secs: u64,

    #[serde(default = "default_weather_ttl")]
    pub weather_ttl_secs: u64,

    #[serde(default = "default_eta_ttl")]
    pub eta_ttl_secs: u64,

    /// Speed used to turn distance into travel time
    #[serde(default = "default_nominal_speed")]
    pub nominal_speed_kmph: f64,

    /// Stop used when neither the plan nor the query names one
    #[serde(default = "default_stop_id")]
    pub default_stop_id: String,

    /// ETAs at or above this many seconds get an alternative bus suggestion
    #[serde(default = "default_alternative_threshold")]
    pub alternative_threshold_secs: u64,
}

/// Budgets for external calls, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_reasoning_ms")]
    pub reasoning_ms: u64,

    #[serde(default = "default_fleet_ms")]
    pub fleet_ms: u64,

    #[serde(default = "default_weather_ms")]
    pub weather_ms: u64,

    #[serde(default = "default_cache_ms")]
    pub cache_ms: u64,

    #[serde(default = "default_retrieval_ms")]
    pub retrieval_ms: u64,
}

impl TimeoutConfig {
    pub fn reasoning(&self) -> Duration {
        Duration::from_millis(self.reasoning_ms)
    }

    pub fn fleet(&self) -> Duration {
        Duration::from_millis(self.fleet_ms)
    }

    pub fn weather(&self) -> Duration {
        Duration::from_millis(self.weather_ms)
    }

    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn retrieval(&self) -> Duration {
        Duration::from_millis(self.retrieval_ms)
    }
}

/// Fleet collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Where live positions come from (snapshot, http)
    #[serde(default = "default_fleet_source")]
    pub source: String,

    /// Fleet service base URL when `source = "http"`
    #[serde(default = "default_fleet_base_url")]
    pub base_url: String,

    /// Directory holding buses.json and routes.json (supports ~ expansion)
    #[serde(default = "default_fleet_data_dir")]
    pub data_dir: PathBuf,
}

/// Weather collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Weather provider (openweather, disabled)
    #[serde(default = "default_weather_provider")]
    pub provider: String,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_weather_key_env")]
    pub api_key_env: String,
}

/// Key-value cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend (memory, sqlite, disabled)
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// SQLite file when `backend = "sqlite"` (supports ~ expansion)
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Upper bound on entries held by the memory backend
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.transit")
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_embedder() -> String {
    "hashing".to_string()
}

fn default_dims() -> usize {
    256
}

fn default_ollama_embed_model() -> String {
    "nomic-embed-text".to_string()
}

/// Upper bound for cache TTLs (one day)
const MAX_TTL_SECS: u64 = 86_400;

fn default_query_ttl() -> u64 {
    60
}

fn default_weather_ttl() -> u64 {
    300
}

fn default_eta_ttl() -> u64 {
    60
}

fn default_nominal_speed() -> f64 {
    25.0
}

fn default_stop_id() -> String {
    "S1".to_string()
}

fn default_alternative_threshold() -> u64 {
    30 * 60
}

fn default_reasoning_ms() -> u64 {
    20_000
}

fn default_fleet_ms() -> u64 {
    2_000
}

fn default_weather_ms() -> u64 {
    5_000
}

fn default_cache_ms() -> u64 {
    250
}

fn default_retrieval_ms() -> u64 {
    3_000
}

fn default_fleet_source() -> String {
    "snapshot".to_string()
}

fn default_fleet_base_url() -> String {
    "http://localhost:8002".to_string()
}

fn default_fleet_data_dir() -> PathBuf {
    PathBuf::from("~/.transit/data")
}

fn default_weather_provider() -> String {
    "openweather".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_key_env() -> String {
    "WEATHER_API_KEY".to_string()
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("~/.transit/cache.db")
}

fn default_max_entries() -> usize {
    4096
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_provider: default_provider(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_key_env(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            embedder: default_embedder(),
            dims: default_dims(),
            ollama_model: default_ollama_embed_model(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query_ttl_secs: default_query_ttl(),
            weather_ttl_secs: default_weather_ttl(),
            eta_ttl_secs: default_eta_ttl(),
            nominal_speed_kmph: default_nominal_speed(),
            default_stop_id: default_stop_id(),
            alternative_threshold_secs: default_alternative_threshold(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reasoning_ms: default_reasoning_ms(),
            fleet_ms: default_fleet_ms(),
            weather_ms: default_weather_ms(),
            cache_ms: default_cache_ms(),
            retrieval_ms: default_retrieval_ms(),
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            source: default_fleet_source(),
            base_url: default_fleet_base_url(),
            data_dir: default_fleet_data_dir(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: default_weather_provider(),
            base_url: default_weather_base_url(),
            api_key_env: default_weather_key_env(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: default_cache_path(),
            max_entries: default_max_entries(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.transit/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();

        // Serialize the unexpanded form so ~ stays portable
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.transit/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".transit").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            llm: LLMConfig::default(),
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
            timeouts: TimeoutConfig::default(),
            fleet: FleetConfig::default(),
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Checks enumerated values and numeric ranges, then expands ~ in paths.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        check_one_of(
            "log level",
            &self.core.log_level,
            &["error", "warn", "info", "debug", "trace"],
        )?;
        check_one_of(
            "default provider",
            &self.llm.default_provider,
            &["ollama", "openai"],
        )?;
        check_one_of(
            "embedder",
            &self.retrieval.embedder,
            &["hashing", "ollama"],
        )?;
        check_one_of("fleet source", &self.fleet.source, &["snapshot", "http"])?;
        check_one_of(
            "weather provider",
            &self.weather.provider,
            &["openweather", "disabled"],
        )?;
        check_one_of(
            "cache backend",
            &self.cache.backend,
            &["memory", "sqlite", "disabled"],
        )?;

        if !(1..=50).contains(&self.retrieval.top_k) {
            return Err(EngineError::Config(
                "retrieval.top_k must be between 1 and 50".to_string(),
            ));
        }
        if self.retrieval.dims < 8 {
            return Err(EngineError::Config(
                "retrieval.dims must be at least 8".to_string(),
            ));
        }
        if !(self.pipeline.nominal_speed_kmph.is_finite() && self.pipeline.nominal_speed_kmph > 0.0)
        {
            return Err(EngineError::Config(
                "pipeline.nominal_speed_kmph must be positive".to_string(),
            ));
        }
        if self.pipeline.default_stop_id.trim().is_empty() {
            return Err(EngineError::Config(
                "pipeline.default_stop_id must not be empty".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(EngineError::Config(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        for (name, ttl) in [
            ("pipeline.query_ttl_secs", self.pipeline.query_ttl_secs),
            ("pipeline.weather_ttl_secs", self.pipeline.weather_ttl_secs),
            ("pipeline.eta_ttl_secs", self.pipeline.eta_ttl_secs),
        ] {
            if !(1..=MAX_TTL_SECS).contains(&ttl) {
                return Err(EngineError::Config(format!(
                    "{} must be between 1 and {}",
                    name, MAX_TTL_SECS
                )));
            }
        }
        let t = &self.timeouts;
        if [t.reasoning_ms, t.fleet_ms, t.weather_ms, t.cache_ms, t.retrieval_ms].contains(&0) {
            return Err(EngineError::Config(
                "timeouts must all be greater than zero".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.fleet.data_dir = expand_path(&self.fleet.data_dir)?;
        self.cache.path = expand_path(&self.cache.path)?;

        Ok(())
    }
}

fn check_one_of(what: &str, value: &str, allowed: &[&str]) -> Result<(), EngineError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(EngineError::Config(format!(
            "Invalid {} '{}'. Must be one of: {}",
            what,
            value,
            allowed.join(", ")
        )))
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.pipeline.query_ttl_secs, 60);
        assert_eq!(config.pipeline.weather_ttl_secs, 300);
        assert_eq!(config.pipeline.eta_ttl_secs, 60);
        assert_eq!(config.cache.backend, "memory");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config = Config::from_toml_str("[core]\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.pipeline.default_stop_id, "S1");
        assert_eq!(config.timeouts.cache(), Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_unknown_cache_backend() {
        let err = Config::from_toml_str("[core]\n[cache]\nbackend = \"redis\"\n").unwrap_err();
        assert!(err.to_string().contains("cache backend"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let err = Config::from_toml_str("[core]\n[retrieval]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.pipeline.nominal_speed_kmph,
            deserialized.pipeline.nominal_speed_kmph
        );
    }
}

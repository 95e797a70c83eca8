//! Settings Models
//!
//! Service configuration, loaded from an optional TOML file and overridden
//! from the command line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Application configuration stored in a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address of the HTTP server
    pub bind_addr: String,
    /// Category/brand taxonomy (YAML), hot-reloaded on change
    pub taxonomy_path: PathBuf,
    pub overpass_url: String,
    pub nominatim_url: String,
    /// User-Agent sent to the geodata backends
    pub user_agent: String,
    /// Model driving tool selection
    pub model: String,
    /// Model for judging, patching and summaries; falls back to `model`
    pub validation_model: Option<String>,
    /// OpenAI-compatible endpoint; the public API when unset
    pub openai_base_url: Option<String>,
    /// Model turns per orchestration chain
    pub max_tool_steps: usize,
    /// Attempts per validation-retry loop
    pub max_iterations: u32,
    pub store_ttl_secs: u64,
    pub store_max_entries: u64,
    pub overpass_timeout_secs: u64,
    pub geocode_timeout_secs: u64,
    pub llm_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            taxonomy_path: PathBuf::from("config/taxonomy.yaml"),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: "custom-map-api/1.0".to_string(),
            model: DEFAULT_MODEL.to_string(),
            validation_model: None,
            openai_base_url: None,
            max_tool_steps: 6,
            max_iterations: 3,
            store_ttl_secs: 6 * 60 * 60,
            store_max_entries: 10_000,
            overpass_timeout_secs: 45,
            geocode_timeout_secs: 20,
            llm_timeout_secs: 60,
        }
    }
}

/// Settings update request (partial update), built from CLI flags
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub bind_addr: Option<String>,
    pub taxonomy_path: Option<PathBuf>,
    pub model: Option<String>,
    pub validation_model: Option<String>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(bind_addr) = update.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(path) = update.taxonomy_path {
            self.taxonomy_path = path;
        }
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(model) = update.validation_model {
            self.validation_model = Some(model);
        }
    }

    pub fn validation_model(&self) -> &str {
        self.validation_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.model)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind_addr: {}", self.bind_addr));
        }

        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }

        for (name, url) in [
            ("overpass_url", &self.overpass_url),
            ("nominatim_url", &self.nominatim_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} must be an http(s) URL: {}", name, url));
            }
        }

        if self.max_tool_steps == 0 {
            return Err("max_tool_steps must be at least 1".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        if self.store_ttl_secs == 0 || self.store_max_entries == 0 {
            return Err("store_ttl_secs and store_max_entries must be positive".to_string());
        }
        if self.overpass_timeout_secs == 0
            || self.geocode_timeout_secs == 0
            || self.llm_timeout_secs == 0
        {
            return Err("timeouts must be at least 1 second".to_string());
        }

        Ok(())
    }
}

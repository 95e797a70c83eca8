//! Application State
//!
//! Shared state behind every request handler: the configuration, the
//! hot-reloadable taxonomy and the control loop with everything it drives.

use std::sync::Arc;
use std::time::Duration;

use tokyo_map_llm::{build_http_client, LlmProvider, OpenAIProvider, ProviderConfig};
use tokyo_map_quality_gates::{JudgmentCapability, Validator};

use crate::models::settings::AppConfig;
use crate::services::control::ControlLoop;
use crate::services::dispatcher::Dispatcher;
use crate::services::geodata::{GeodataBackend, Geocoder, NominatimGeocoder, OverpassClient};
use crate::services::judge::LlmJudgment;
use crate::services::orchestrator::Orchestrator;
use crate::services::store::ResultStore;
use crate::services::summarizer::Summarizer;
use crate::services::taxonomy::TaxonomyHandle;
use crate::utils::error::{AppError, AppResult};

pub type SharedState = Arc<AppState>;

/// External collaborators of the agent.
pub struct AgentParts {
    /// Drives tool selection.
    pub chain_provider: Arc<dyn LlmProvider>,
    /// Writes summaries.
    pub summary_provider: Arc<dyn LlmProvider>,
    /// Judges results and patches reviewed arguments.
    pub judgment: Arc<dyn JudgmentCapability>,
    pub backend: Arc<dyn GeodataBackend>,
    pub geocoder: Arc<dyn Geocoder>,
}

pub struct AppState {
    config: AppConfig,
    taxonomy: TaxonomyHandle,
    store: ResultStore,
    control: ControlLoop,
}

impl AppState {
    /// Wire the agent from explicit parts.
    pub fn new(config: AppConfig, taxonomy: TaxonomyHandle, parts: AgentParts) -> Self {
        let store = ResultStore::new(
            Duration::from_secs(config.store_ttl_secs),
            config.store_max_entries,
        );
        let dispatcher = Dispatcher::new(store.clone(), parts.backend, parts.geocoder);
        let orchestrator = Orchestrator::new(parts.chain_provider, dispatcher, config.max_tool_steps);
        let control = ControlLoop::new(
            orchestrator,
            Validator::new(parts.judgment),
            Summarizer::new(parts.summary_provider),
            config.max_iterations,
        );
        Self {
            config,
            taxonomy,
            store,
            control,
        }
    }

    /// Production wiring: OpenAI for the model, Overpass and Nominatim for
    /// geodata. The validation model also writes summaries.
    pub fn from_config(config: AppConfig, api_key: Option<String>) -> AppResult<Self> {
        let chain_provider: Arc<dyn LlmProvider> =
            Arc::new(OpenAIProvider::new(provider_config(&config, &config.model, api_key.clone()))?);
        let validation_provider: Arc<dyn LlmProvider> = if config.validation_model() == config.model {
            chain_provider.clone()
        } else {
            Arc::new(OpenAIProvider::new(provider_config(
                &config,
                config.validation_model(),
                api_key,
            ))?)
        };

        let overpass_http = build_http_client(
            Duration::from_secs(config.overpass_timeout_secs),
            Some(&config.user_agent),
        )
        .map_err(|e| AppError::config(format!("overpass client: {}", e)))?;
        let geocode_http = build_http_client(
            Duration::from_secs(config.geocode_timeout_secs),
            Some(&config.user_agent),
        )
        .map_err(|e| AppError::config(format!("geocoder client: {}", e)))?;

        let taxonomy = TaxonomyHandle::load(config.taxonomy_path.clone())?;
        let parts = AgentParts {
            chain_provider,
            summary_provider: validation_provider.clone(),
            judgment: Arc::new(LlmJudgment::new(validation_provider)),
            backend: Arc::new(OverpassClient::new(overpass_http, config.overpass_url.clone())),
            geocoder: Arc::new(NominatimGeocoder::new(geocode_http, config.nominatim_url.clone())),
        };

        tracing::info!(
            "[state] model={} validation_model={} taxonomy={}",
            config.model,
            config.validation_model(),
            config.taxonomy_path.display()
        );
        Ok(Self::new(config, taxonomy, parts))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn taxonomy(&self) -> &TaxonomyHandle {
        &self.taxonomy
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }
}

fn provider_config(config: &AppConfig, model: &str, api_key: Option<String>) -> ProviderConfig {
    ProviderConfig {
        api_key,
        base_url: config.openai_base_url.clone(),
        model: model.to_string(),
        timeout_secs: config.llm_timeout_secs,
        ..Default::default()
    }
}

//! Test doubles for the model, the geodata backend and the geocoder.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokyo_map_agent::models::settings::AppConfig;
use tokyo_map_agent::services::geodata::{GeoError, GeodataBackend, Geocoder, RawElement};
use tokyo_map_agent::services::taxonomy::{Taxonomy, TaxonomyHandle};
use tokyo_map_agent::{AgentParts, AppState, SharedState};
use tokyo_map_core::GeoPoint;
use tokyo_map_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
    StopReason, ToolCall, ToolDefinition, UsageStats,
};
use tokyo_map_quality_gates::{JudgmentCapability, NoJudgment};

pub const SHIBUYA: GeoPoint = GeoPoint {
    lat: 35.658,
    lon: 139.7016,
};
pub const UENO: GeoPoint = GeoPoint {
    lat: 35.7141,
    lon: 139.7774,
};

// ============================================================================
// Model
// ============================================================================

/// One recorded model request.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub options: LlmRequestOptions,
}

/// Replays scripted responses in order; errors once the script runs out.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LlmResult<LlmResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            config: ProviderConfig::default(),
        })
    }

    /// Provider whose every call fails.
    pub fn offline() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        _system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            tools,
            options,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidRequest {
                    message: "script exhausted".to_string(),
                })
            })
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Model turn with one tool call per `(name, arguments)` pair.
pub fn tool_calls(calls: &[(&str, Value)]) -> LlmResult<LlmResponse> {
    Ok(LlmResponse {
        content: None,
        tool_calls: calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolCall {
                id: format!("call_{}_{}", name, i),
                name: name.to_string(),
                arguments: arguments.clone(),
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: UsageStats::default(),
        model: "scripted-model".to_string(),
    })
}

pub fn tool_call(name: &str, arguments: Value) -> LlmResult<LlmResponse> {
    tool_calls(&[(name, arguments)])
}

pub fn text(content: &str) -> LlmResult<LlmResponse> {
    Ok(LlmResponse::text(content, "scripted-model"))
}

// ============================================================================
// Geodata
// ============================================================================

/// Answers each query with the elements of the first rule whose needle
/// occurs in the query text; no match means no elements.
#[derive(Default)]
pub struct FakeGeodata {
    rules: Vec<(String, Vec<RawElement>)>,
    queries: Mutex<Vec<String>>,
}

impl FakeGeodata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements for queries containing `needle` (e.g. `"amenity\"=\"cafe"`).
    pub fn with(mut self, needle: &str, elements: Vec<RawElement>) -> Self {
        self.rules.push((needle.to_string(), elements));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeodataBackend for FakeGeodata {
    async fn execute(&self, query: &str) -> Result<Vec<RawElement>, GeoError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, elements)| elements.clone())
            .unwrap_or_default())
    }
}

/// `count` named nodes spreading north from `origin`, 100m apart.
pub fn nodes_near(origin: GeoPoint, prefix: &str, count: usize) -> Vec<RawElement> {
    (0..count)
        .map(|i| {
            RawElement::node(origin.lat + 0.0009 * (i as f64 + 1.0), origin.lon)
                .with_tag("name", &format!("{} {}", prefix, i + 1))
        })
        .collect()
}

pub const CAFE_TAG: &str = r#"["amenity"="cafe"]"#;
pub const CONVENIENCE_TAG: &str = r#"["shop"="convenience"]"#;
pub const PARK_TAG: &str = r#"["leisure"="park"]"#;

/// Fixed place table.
pub struct FakeGeocoder {
    places: HashMap<String, GeoPoint>,
    lookups: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn tokyo() -> Self {
        let places = [
            ("渋谷駅", SHIBUYA),
            ("渋谷", SHIBUYA),
            ("上野", UENO),
            ("Ueno", UENO),
        ]
        .into_iter()
        .map(|(name, point)| (name.to_string(), point))
        .collect();
        Self {
            places,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>, GeoError> {
        self.lookups.lock().unwrap().push(place.to_string());
        Ok(self.places.get(place).copied())
    }
}

// ============================================================================
// Application fixture
// ============================================================================

pub struct Fixture {
    pub state: SharedState,
    pub chain: Arc<ScriptedProvider>,
    pub summary: Arc<ScriptedProvider>,
    pub geodata: Arc<FakeGeodata>,
    pub geocoder: Arc<FakeGeocoder>,
}

pub struct FixtureBuilder {
    chain: Vec<LlmResult<LlmResponse>>,
    summary: Vec<LlmResult<LlmResponse>>,
    geodata: FakeGeodata,
    judgment: Arc<dyn JudgmentCapability>,
    taxonomy: Option<TaxonomyHandle>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            chain: Vec::new(),
            summary: Vec::new(),
            geodata: FakeGeodata::new(),
            judgment: Arc::new(NoJudgment),
            taxonomy: None,
        }
    }

    pub fn chain(mut self, script: Vec<LlmResult<LlmResponse>>) -> Self {
        self.chain = script;
        self
    }

    pub fn summaries(mut self, script: Vec<LlmResult<LlmResponse>>) -> Self {
        self.summary = script;
        self
    }

    pub fn geodata(mut self, geodata: FakeGeodata) -> Self {
        self.geodata = geodata;
        self
    }

    pub fn judgment(mut self, judgment: Arc<dyn JudgmentCapability>) -> Self {
        self.judgment = judgment;
        self
    }

    pub fn taxonomy(mut self, taxonomy: TaxonomyHandle) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    pub fn build(self) -> Fixture {
        let chain = ScriptedProvider::new(self.chain);
        let summary = ScriptedProvider::new(self.summary);
        let geodata = Arc::new(self.geodata);
        let geocoder = Arc::new(FakeGeocoder::tokyo());
        let taxonomy = self
            .taxonomy
            .unwrap_or_else(|| TaxonomyHandle::fixed(Taxonomy::builtin()));

        let parts = AgentParts {
            chain_provider: chain.clone(),
            summary_provider: summary.clone(),
            judgment: self.judgment,
            backend: geodata.clone(),
            geocoder: geocoder.clone(),
        };
        let state = Arc::new(AppState::new(AppConfig::default(), taxonomy, parts));
        Fixture {
            state,
            chain,
            summary,
            geodata,
            geocoder,
        }
    }
}

/// Judgment with scripted verdicts and patches, consumed in order. An
/// exhausted script answers `None`.
pub struct ScriptedJudgment {
    verdicts: Mutex<VecDeque<tokyo_map_quality_gates::ValidationVerdict>>,
    patches: Mutex<VecDeque<Value>>,
}

impl ScriptedJudgment {
    pub fn new(
        verdicts: Vec<tokyo_map_quality_gates::ValidationVerdict>,
        patches: Vec<Value>,
    ) -> Arc<Self> {
        Arc::new(Self {
            verdicts: Mutex::new(verdicts.into()),
            patches: Mutex::new(patches.into()),
        })
    }
}

#[async_trait]
impl JudgmentCapability for ScriptedJudgment {
    async fn judge(
        &self,
        _request: &tokyo_map_quality_gates::JudgeRequest,
    ) -> Option<tokyo_map_quality_gates::ValidationVerdict> {
        self.verdicts.lock().unwrap().pop_front()
    }

    async fn patch(&self, _request: &tokyo_map_quality_gates::PatchRequest) -> Option<Value> {
        self.patches.lock().unwrap().pop_front()
    }
}

//! Response Types
//!
//! Request and response bodies of the HTTP surface.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokyo_map_core::ItineraryDay;
use tokyo_map_quality_gates::ValidationVerdict;
use tokyo_map_tools::Mode;

use crate::utils::error::{AppError, AppResult};

/// Message returned for an empty review or an unknown mode.
pub const INVALID_REVIEW_MESSAGE: &str = "invalid review payload";
/// Message returned when the patch capability produced no usable object.
pub const REVIEW_PARSE_FAILED_MESSAGE: &str = "review parsing failed";

/// Free-text map or trip request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

/// State handed back with an escalation, enough to resume via `/review`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewContext {
    pub mode: Mode,
    pub user_text: String,
    pub args: Value,
    pub last_result: Value,
}

/// Human feedback on an escalated result. `context` is taken as sent and
/// checked by [`ReviewRequest::into_context`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub review_text: String,
    #[serde(default)]
    pub context: Value,
}

impl ReviewRequest {
    /// Trimmed review text and the decoded context. Missing `args`,
    /// `last_result` and `user_text` default to empty values.
    pub fn into_context(self) -> AppResult<(String, ReviewContext)> {
        let review_text = self.review_text.trim().to_string();
        let mode = self
            .context
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|m| m.parse::<Mode>().ok());

        let mode = match mode {
            Some(mode) if !review_text.is_empty() => mode,
            _ => return Err(AppError::invalid_review(INVALID_REVIEW_MESSAGE)),
        };

        let field = |key: &str| match self.context.get(key) {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(Default::default()),
        };

        let context = ReviewContext {
            mode,
            user_text: self
                .context
                .get("user_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            args: field("args"),
            last_result: field("last_result"),
        };
        Ok((review_text, context))
    }
}

/// Body of `/query`, `/trip` and `/review`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub summary: String,
    pub store_id: Option<String>,
    pub stats: IndexMap<String, usize>,
    pub success: bool,
    pub failure_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<ValidationVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_review: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_context: Option<ReviewContext>,
    pub attempts: u32,
    /// Trip mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Vec<ItineraryDay>>,
    /// Trip mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl AgentResponse {
    /// Response for a chain that never reached a terminal result.
    pub fn chain_failure(summary: String, reason: impl Into<String>) -> Self {
        Self {
            summary,
            store_id: None,
            stats: IndexMap::new(),
            success: false,
            failure_reason: reason.into(),
            evaluation: None,
            require_review: None,
            review_reason: None,
            review_context: None,
            attempts: 0,
            itinerary: None,
            args: None,
        }
    }
}

/// GeoJSON body of `/map/{store_id}/geojson`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
    pub meta: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    pub layer: String,
    pub name: Option<String>,
    pub brand: Option<String>,
}

impl Feature {
    pub fn point(lat: f64, lon: f64, properties: FeatureProperties) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [lon, lat],
            },
            properties,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, meta: Value) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
            meta,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub categories: usize,
    pub brands: usize,
    pub stored_results: u64,
}

//! Tool outputs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokyo_map_core::ItineraryDay;

use crate::args::ModeArgs;

/// Kind of payload a tool produced. `Search` and `Trip` are terminal: the
/// first of them ends an orchestration chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Search,
    Category,
    Candidate,
    Trip,
}

impl ResultType {
    pub fn is_terminal(self) -> bool {
        matches!(self, ResultType::Search | ResultType::Trip)
    }
}

/// Result of one tool execution, as seen by the model and the HTTP caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Set instead of `store_id` for candidate collections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    pub stats: IndexMap<String, usize>,
    pub args: ModeArgs,
    pub result_type: ResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Vec<ItineraryDay>>,
}

impl ToolOutput {
    pub fn stored(
        result_type: ResultType,
        store_id: String,
        stats: IndexMap<String, usize>,
        args: ModeArgs,
    ) -> Self {
        Self {
            store_id: Some(store_id),
            candidate_id: None,
            stats,
            args,
            result_type,
            itinerary: None,
        }
    }

    pub fn candidates(candidate_id: String, stats: IndexMap<String, usize>, args: ModeArgs) -> Self {
        Self {
            store_id: None,
            candidate_id: Some(candidate_id),
            stats,
            args,
            result_type: ResultType::Candidate,
            itinerary: None,
        }
    }

    pub fn with_itinerary(mut self, itinerary: Vec<ItineraryDay>) -> Self {
        self.itinerary = Some(itinerary);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.result_type.is_terminal()
    }

    /// Sum of all stat counts.
    pub fn total_count(&self) -> usize {
        self.stats.values().sum()
    }

    /// Items scheduled on each day; empty for non-trip results.
    pub fn day_counts(&self) -> Vec<usize> {
        self.itinerary
            .as_ref()
            .map(|days| days.iter().map(|d| d.items.len()).collect())
            .unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Serialized form appended to the model transcript.
    pub fn to_content(&self) -> String {
        self.to_value().to_string()
    }
}

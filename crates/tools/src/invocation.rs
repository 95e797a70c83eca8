//! Typed tool invocations.
//!
//! A raw `(name, arguments)` pair from the model is decoded once into a
//! `ToolInvocation`; execution then matches exhaustively on the variant.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::args::{CategorySearchArgs, ItineraryArgs, MergeArgs, SearchArgs, TripArgs};
use crate::catalog::{Mode, ToolName};
use crate::error::{ToolError, ToolResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    SearchOsm(SearchArgs),
    SearchCategory {
        category: String,
        args: CategorySearchArgs,
    },
    MergeSearchResults(MergeArgs),
    PlanTrip(TripArgs),
    CollectTripCandidates(TripArgs),
    BuildTripItinerary {
        candidate_id: String,
        args: ItineraryArgs,
    },
}

impl ToolInvocation {
    /// Decode a model tool call. Names outside `mode`'s tool set are
    /// rejected as unknown.
    pub fn decode(name: &str, arguments: Value, mode: Mode) -> ToolResult<Self> {
        let tool: ToolName = name.parse()?;
        if tool.mode() != mode {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        let arguments = normalize_arguments(tool, arguments)?;

        match tool {
            ToolName::SearchOsm => Ok(Self::SearchOsm(decode_as(tool, arguments)?)),
            ToolName::SearchCategory => {
                let args: CategorySearchArgs = decode_as(tool, arguments)?;
                let category = args
                    .category
                    .clone()
                    .ok_or_else(|| ToolError::invalid(tool.as_str(), "category is required"))?;
                Ok(Self::SearchCategory { category, args })
            }
            ToolName::MergeSearchResults => {
                let args: MergeArgs = decode_as(tool, arguments)?;
                if args.store_ids.is_empty() {
                    return Err(ToolError::invalid(tool.as_str(), "store_ids is required"));
                }
                Ok(Self::MergeSearchResults(args))
            }
            ToolName::PlanTrip => Ok(Self::PlanTrip(decode_as(tool, arguments)?)),
            ToolName::CollectTripCandidates => {
                Ok(Self::CollectTripCandidates(decode_as(tool, arguments)?))
            }
            ToolName::BuildTripItinerary => {
                let args: ItineraryArgs = decode_as(tool, arguments)?;
                let candidate_id = args
                    .candidate_id
                    .clone()
                    .ok_or_else(|| ToolError::invalid(tool.as_str(), "candidate_id is required"))?;
                Ok(Self::BuildTripItinerary { candidate_id, args })
            }
        }
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::SearchOsm(_) => ToolName::SearchOsm,
            Self::SearchCategory { .. } => ToolName::SearchCategory,
            Self::MergeSearchResults(_) => ToolName::MergeSearchResults,
            Self::PlanTrip(_) => ToolName::PlanTrip,
            Self::CollectTripCandidates(_) => ToolName::CollectTripCandidates,
            Self::BuildTripItinerary { .. } => ToolName::BuildTripItinerary,
        }
    }
}

/// `null` means no arguments; a string is arguments the provider could not
/// parse as JSON.
fn normalize_arguments(tool: ToolName, arguments: Value) -> ToolResult<Value> {
    match arguments {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(arguments),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(v @ Value::Object(_)) => Ok(v),
            _ => Err(ToolError::invalid(
                tool.as_str(),
                format!("arguments are not a JSON object: {}", raw),
            )),
        },
        other => Err(ToolError::invalid(
            tool.as_str(),
            format!("arguments are not a JSON object: {}", other),
        )),
    }
}

fn decode_as<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> ToolResult<T> {
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(tool.as_str(), e.to_string()))
}

//! Capability catalog.
//!
//! Every tool the model may call is a `ToolName` variant; a request runs in
//! one `Mode` and only that mode's tools are offered.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokyo_map_llm::{ParameterSchema, ToolDefinition};

use crate::error::ToolError;

const RANGE_VALUES: [&str; 3] = ["narrow", "standard", "wide"];
const PACE_VALUES: [&str; 3] = ["relaxed", "standard", "packed"];

/// Which tool set a request is served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Search,
    Trip,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Search => "search",
            Mode::Trip => "trip",
        }
    }

    /// Tools offered to the model in this mode, in presentation order.
    pub fn tools(self) -> &'static [ToolName] {
        match self {
            Mode::Search => &[
                ToolName::SearchOsm,
                ToolName::SearchCategory,
                ToolName::MergeSearchResults,
            ],
            Mode::Trip => &[
                ToolName::PlanTrip,
                ToolName::CollectTripCandidates,
                ToolName::BuildTripItinerary,
            ],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(Mode::Search),
            "trip" => Ok(Mode::Trip),
            other => Err(ToolError::invalid("mode", format!("unknown mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchOsm,
    SearchCategory,
    MergeSearchResults,
    PlanTrip,
    CollectTripCandidates,
    BuildTripItinerary,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::SearchOsm,
        ToolName::SearchCategory,
        ToolName::MergeSearchResults,
        ToolName::PlanTrip,
        ToolName::CollectTripCandidates,
        ToolName::BuildTripItinerary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchOsm => "search_osm_tokyo",
            ToolName::SearchCategory => "search_category_tokyo",
            ToolName::MergeSearchResults => "merge_search_results",
            ToolName::PlanTrip => "plan_trip_tokyo",
            ToolName::CollectTripCandidates => "collect_trip_candidates",
            ToolName::BuildTripItinerary => "build_trip_itinerary",
        }
    }

    pub fn mode(self) -> Mode {
        match self {
            ToolName::SearchOsm | ToolName::SearchCategory | ToolName::MergeSearchResults => {
                Mode::Search
            }
            ToolName::PlanTrip | ToolName::CollectTripCandidates | ToolName::BuildTripItinerary => {
                Mode::Trip
            }
        }
    }

    fn description(self) -> &'static str {
        match self {
            ToolName::SearchOsm => {
                "Search several categories at once inside Tokyo and return a store_id for the map layers."
            }
            ToolName::SearchCategory => {
                "Search a single category and return a store_id. Call repeatedly for several categories, then merge."
            }
            ToolName::MergeSearchResults => {
                "Merge earlier search results (store_ids), optionally into one deduplicated layer."
            }
            ToolName::PlanTrip => "Plan a trip around a place and return the itinerary and a store_id.",
            ToolName::CollectTripCandidates => {
                "Collect candidate spots for a trip and return a candidate_id."
            }
            ToolName::BuildTripItinerary => {
                "Build a day-by-day itinerary from a candidate_id and return a store_id and the itinerary."
            }
        }
    }

    /// JSON schema of this tool's arguments. `categories` feeds the enum of
    /// allowed category names; empty means unrestricted.
    pub fn definition(self, categories: &[String]) -> ToolDefinition {
        let category = || {
            let s = ParameterSchema::string(Some("Category name"));
            if categories.is_empty() {
                s
            } else {
                ParameterSchema::string_enum(Some("Category name"), categories)
            }
        };
        let range = |desc: &str| {
            ParameterSchema::string_enum(Some(desc), &RANGE_VALUES[..]).with_default(json!("standard"))
        };

        let mut props: HashMap<String, ParameterSchema> = HashMap::new();
        let required: Vec<&str>;

        match self {
            ToolName::SearchOsm | ToolName::SearchCategory => {
                if self == ToolName::SearchOsm {
                    props.insert(
                        "categories".into(),
                        ParameterSchema::array(Some("Categories to search"), category()),
                    );
                    props.insert(
                        "union".into(),
                        ParameterSchema::boolean(Some(
                            "Merge all categories into one deduplicated layer (OR condition)",
                        ))
                        .with_default(json!(true)),
                    );
                    required = vec!["categories"];
                } else {
                    props.insert("category".into(), category());
                    required = vec!["category"];
                }
                props.insert("brand".into(), ParameterSchema::string(Some("Brand or chain name")));
                props.insert("place".into(), ParameterSchema::string(Some("Center place, e.g. 渋谷駅")));
                props.insert("radius_km".into(), ParameterSchema::number(Some("Search radius in km")));
                props.insert(
                    "open_24h".into(),
                    ParameterSchema::boolean(Some("Only places open 24/7")).with_default(json!(false)),
                );
                props.insert(
                    "wheelchair".into(),
                    ParameterSchema::boolean(Some("Only wheelchair accessible places"))
                        .with_default(json!(false)),
                );
                props.insert("limit".into(), ParameterSchema::integer(Some("Maximum results")));
                props.insert(
                    "range".into(),
                    range("Search extent; sets radius_km/limit when they are omitted"),
                );
            }
            ToolName::MergeSearchResults => {
                props.insert(
                    "store_ids".into(),
                    ParameterSchema::array(Some("store_ids to merge"), ParameterSchema::string(None)),
                );
                props.insert(
                    "union".into(),
                    ParameterSchema::boolean(None).with_default(json!(true)),
                );
                required = vec!["store_ids"];
            }
            ToolName::PlanTrip | ToolName::CollectTripCandidates => {
                props.insert("place".into(), ParameterSchema::string(Some("Base point, e.g. 上野駅")));
                props.insert(
                    "days".into(),
                    ParameterSchema::integer(None)
                        .with_default(json!(1))
                        .with_range(1.0, 14.0),
                );
                props.insert(
                    "radius_km".into(),
                    ParameterSchema::number(Some("Radius around the base point in km"))
                        .with_default(json!(3)),
                );
                props.insert(
                    "interests".into(),
                    ParameterSchema::array(Some("Categories to visit"), category())
                        .with_default(json!([])),
                );
                props.insert(
                    "per_day".into(),
                    ParameterSchema::integer(Some("Spots per day"))
                        .with_default(json!(6))
                        .with_range(1.0, 12.0),
                );
                props.insert(
                    "open_24h".into(),
                    ParameterSchema::boolean(None).with_default(json!(false)),
                );
                props.insert(
                    "wheelchair".into(),
                    ParameterSchema::boolean(None).with_default(json!(false)),
                );
                props.insert(
                    "limit".into(),
                    ParameterSchema::integer(None).with_default(json!(300)),
                );
                if self == ToolName::PlanTrip {
                    props.insert(
                        "start_date".into(),
                        ParameterSchema::string(Some("YYYY-MM-DD, optional")),
                    );
                    props.insert(
                        "pace".into(),
                        ParameterSchema::string_enum(None, &PACE_VALUES[..])
                            .with_default(json!("standard")),
                    );
                }
                props.insert(
                    "range".into(),
                    range("Trip extent; sets radius_km/limit/per_day when they are omitted"),
                );
                required = vec!["place"];
            }
            ToolName::BuildTripItinerary => {
                props.insert("candidate_id".into(), ParameterSchema::string(None));
                props.insert(
                    "place".into(),
                    ParameterSchema::string(Some("Override the base point if needed")),
                );
                props.insert(
                    "days".into(),
                    ParameterSchema::integer(None)
                        .with_default(json!(1))
                        .with_range(1.0, 14.0),
                );
                props.insert(
                    "per_day".into(),
                    ParameterSchema::integer(None)
                        .with_default(json!(6))
                        .with_range(1.0, 12.0),
                );
                props.insert(
                    "pace".into(),
                    ParameterSchema::string_enum(None, &PACE_VALUES[..]).with_default(json!("standard")),
                );
                props.insert(
                    "start_date".into(),
                    ParameterSchema::string(Some("YYYY-MM-DD, optional")),
                );
                required = vec!["candidate_id"];
            }
        }

        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: ParameterSchema::object(
                None,
                props,
                required.into_iter().map(String::from).collect(),
            ),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Definitions for every tool of `mode`.
pub fn tool_definitions(mode: Mode, categories: &[String]) -> Vec<ToolDefinition> {
    mode.tools()
        .iter()
        .map(|t| t.definition(categories))
        .collect()
}

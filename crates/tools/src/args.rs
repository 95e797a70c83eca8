//! Validated parameter bags.
//!
//! Model-produced arguments are decoded leniently: numbers may arrive as
//! strings or floats, flags as `null`, an unknown range tier means
//! `standard`. After `apply_range_defaults` radius and limit are always
//! positive, and trip `days`/`per_day` are clamped to [1,14]/[1,12].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokyo_map_core::Pace;

use crate::catalog::Mode;
use crate::error::{ToolError, ToolResult};

pub const DEFAULT_LIMIT: u32 = 300;
pub const DEFAULT_TRIP_RADIUS_KM: f64 = 3.0;
pub const DEFAULT_DAYS: u32 = 1;
pub const DEFAULT_PER_DAY: u32 = 6;
pub const MAX_DAYS: u32 = 14;
pub const MAX_PER_DAY: u32 = 12;

/// Search/trip extent tier supplying defaults for omitted parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeTier {
    Narrow,
    #[default]
    Standard,
    Wide,
}

impl RangeTier {
    /// Any value other than a known tier name falls back to `Standard`.
    pub fn lenient(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// `(radius_km, limit)` for search tools.
    pub fn search_defaults(self) -> (f64, u32) {
        match self {
            RangeTier::Narrow => (1.5, 120),
            RangeTier::Standard => (3.0, 200),
            RangeTier::Wide => (8.0, 300),
        }
    }

    /// `(radius_km, limit, per_day)` for trip tools.
    pub fn trip_defaults(self) -> (f64, u32, u32) {
        match self {
            RangeTier::Narrow => (2.5, 200, 5),
            RangeTier::Standard => (5.0, 300, 6),
            RangeTier::Wide => (12.0, 500, 7),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeTier::Narrow => "narrow",
            RangeTier::Standard => "standard",
            RangeTier::Wide => "wide",
        }
    }
}

impl fmt::Display for RangeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeTier {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "narrow" => Ok(RangeTier::Narrow),
            "standard" => Ok(RangeTier::Standard),
            "wide" => Ok(RangeTier::Wide),
            other => Err(ToolError::invalid("range", format!("unknown range: {}", other))),
        }
    }
}

/// Lenient field decoders for model-produced JSON.
mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tokyo_map_core::Pace;

    use super::RangeTier;

    fn number(v: &Value) -> Option<f64> {
        let parsed = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|x| x.is_finite())
    }

    fn flag(v: Option<Value>, default: bool) -> bool {
        match v {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
            _ => default,
        }
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref().and_then(number))
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref()
            .and_then(number)
            .map(|x| x.clamp(0.0, u32::MAX as f64) as u32))
    }

    pub fn flag_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(flag(Option::<Value>::deserialize(d)?, false))
    }

    pub fn flag_true<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(flag(Option::<Value>::deserialize(d)?, true))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        })
    }

    pub fn range<'de, D: Deserializer<'de>>(d: D) -> Result<RangeTier, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(RangeTier::lenient(v.as_ref().and_then(Value::as_str)))
    }

    pub fn opt_pace<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Pace>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()))
    }
}

fn default_true() -> bool {
    true
}

fn positive_f64(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0)
}

fn positive_u32(v: Option<u32>) -> Option<u32> {
    v.filter(|x| *x > 0)
}

/// Arguments of `search_osm_tokyo`, and the bag the search retry loop revises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArgs {
    #[serde(default, deserialize_with = "de::string_list")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub radius_km: Option<f64>,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub open_24h: bool,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub wheelchair: bool,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub limit: Option<u32>,
    #[serde(default = "default_true", deserialize_with = "de::flag_true")]
    pub union: bool,
    #[serde(default, deserialize_with = "de::range")]
    pub range: RangeTier,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            brand: None,
            place: None,
            radius_km: None,
            open_24h: false,
            wheelchair: false,
            limit: None,
            union: true,
            range: RangeTier::Standard,
        }
    }
}

impl SearchArgs {
    /// Fill radius/limit from the range tier when omitted or non-positive.
    /// Explicit values are kept.
    pub fn apply_range_defaults(&mut self) {
        let (radius, limit) = self.range.search_defaults();
        self.radius_km = Some(positive_f64(self.radius_km).unwrap_or(radius));
        self.limit = Some(positive_u32(self.limit).unwrap_or(limit));
    }

    pub fn effective_limit(&self) -> u32 {
        positive_u32(self.limit).unwrap_or(DEFAULT_LIMIT)
    }
}

/// Arguments of `search_category_tokyo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySearchArgs {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub radius_km: Option<f64>,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub open_24h: bool,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub wheelchair: bool,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub limit: Option<u32>,
    #[serde(default, deserialize_with = "de::range")]
    pub range: RangeTier,
}

impl CategorySearchArgs {
    /// The equivalent single-category, non-union search bag with range
    /// defaults applied.
    pub fn into_search_args(self, category: String) -> SearchArgs {
        let mut args = SearchArgs {
            categories: vec![category],
            brand: self.brand,
            place: self.place,
            radius_km: self.radius_km,
            open_24h: self.open_24h,
            wheelchair: self.wheelchair,
            limit: self.limit,
            union: false,
            range: self.range,
        };
        args.apply_range_defaults();
        args
    }
}

/// Arguments of `merge_search_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeArgs {
    #[serde(default, deserialize_with = "de::string_list")]
    pub store_ids: Vec<String>,
    #[serde(default = "default_true", deserialize_with = "de::flag_true")]
    pub union: bool,
}

/// Arguments of `plan_trip_tokyo` and `collect_trip_candidates`, and the bag
/// the trip retry loop revises.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripArgs {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub days: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    pub radius_km: Option<f64>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub per_day: Option<u32>,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub open_24h: bool,
    #[serde(default, deserialize_with = "de::flag_false")]
    pub wheelchair: bool,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub limit: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_pace")]
    pub pace: Option<Pace>,
    #[serde(default, deserialize_with = "de::range")]
    pub range: RangeTier,
}

impl TripArgs {
    /// Fill radius/limit/per_day from the range tier when omitted, then
    /// clamp days and per_day into the bag.
    pub fn apply_range_defaults(&mut self) {
        let (radius, limit, per_day) = self.range.trip_defaults();
        self.radius_km = Some(positive_f64(self.radius_km).unwrap_or(radius));
        self.limit = Some(positive_u32(self.limit).unwrap_or(limit));
        if self.per_day.is_none() {
            self.per_day = Some(per_day);
        }
        self.normalize();
    }

    /// Clamp `days` and `per_day` without filling tier defaults.
    pub fn normalize(&mut self) {
        self.days = Some(self.effective_days());
        self.per_day = Some(self.effective_per_day());
    }

    pub fn effective_days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }

    pub fn effective_per_day(&self) -> u32 {
        self.per_day.unwrap_or(DEFAULT_PER_DAY).clamp(1, MAX_PER_DAY)
    }

    pub fn effective_radius_km(&self) -> f64 {
        positive_f64(self.radius_km).unwrap_or(DEFAULT_TRIP_RADIUS_KM)
    }

    pub fn effective_limit(&self) -> u32 {
        positive_u32(self.limit).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn effective_pace(&self) -> Pace {
        self.pace.unwrap_or_default()
    }
}

/// Arguments of `build_trip_itinerary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryArgs {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub candidate_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub days: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub per_day: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_pace")]
    pub pace: Option<Pace>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_date: Option<String>,
}

/// The argument bag of a terminal result, typed by mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModeArgs {
    Search(SearchArgs),
    Trip(TripArgs),
}

impl ModeArgs {
    pub fn mode(&self) -> Mode {
        match self {
            ModeArgs::Search(_) => Mode::Search,
            ModeArgs::Trip(_) => Mode::Trip,
        }
    }

    /// Decode a JSON object as the bag for `mode`. Non-objects are rejected.
    pub fn from_value(mode: Mode, value: Value) -> ToolResult<Self> {
        if !value.is_object() {
            return Err(ToolError::invalid(mode.as_str(), "arguments must be a JSON object"));
        }
        match mode {
            Mode::Search => serde_json::from_value(value)
                .map(ModeArgs::Search)
                .map_err(|e| ToolError::invalid(mode.as_str(), e.to_string())),
            Mode::Trip => serde_json::from_value(value)
                .map(ModeArgs::Trip)
                .map_err(|e| ToolError::invalid(mode.as_str(), e.to_string())),
        }
    }

    pub fn apply_range_defaults(&mut self) {
        match self {
            ModeArgs::Search(args) => args.apply_range_defaults(),
            ModeArgs::Trip(args) => args.apply_range_defaults(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

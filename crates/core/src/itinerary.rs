//! Itinerary Builder
//!
//! Turns per-category candidate buckets into a day-by-day schedule. A
//! rotating cursor over the categories gives each one a turn before any
//! category is revisited, so a large bucket cannot crowd out the others.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::record::PointRecord;

/// Length of the scheduled part of a day, in hours.
const DAY_SPAN_HOURS: u32 = 8;

/// Trip tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Relaxed,
    #[default]
    Standard,
    Packed,
}

impl Pace {
    /// Hour of the first item of each day.
    pub fn start_hour(self) -> u32 {
        match self {
            Pace::Relaxed => 10,
            Pace::Standard => 9,
            Pace::Packed => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pace::Relaxed => "relaxed",
            Pace::Standard => "standard",
            Pace::Packed => "packed",
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pace {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Ok(Pace::Relaxed),
            "standard" => Ok(Pace::Standard),
            "packed" => Ok(Pace::Packed),
            other => Err(CoreError::UnknownPace(other.to_string())),
        }
    }
}

/// One scheduled stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    /// `HH:00`
    pub time: String,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lon: f64,
    pub brand: Option<String>,
    pub distance_km_from_center: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u32,
    pub place: Option<String>,
    pub center: GeoPoint,
    pub items: Vec<ItineraryItem>,
}

/// Schedule plus the flattened map layer of every scheduled stop.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltItinerary {
    pub days: Vec<ItineraryDay>,
    pub union: Vec<PointRecord>,
}

impl BuiltItinerary {
    pub fn spots(&self) -> usize {
        self.union.len()
    }
}

/// Build a `days`-long schedule of at most `per_day` stops per day.
///
/// `buckets` must already be ranked (see [`crate::rank_by_distance`]); each
/// bucket is consumed front to back. A day ends early once every bucket
/// is exhausted; later days are then emitted empty.
pub fn build_itinerary(
    place: Option<&str>,
    center: GeoPoint,
    buckets: &IndexMap<String, Vec<PointRecord>>,
    days: u32,
    per_day: u32,
    pace: Pace,
) -> BuiltItinerary {
    let categories: Vec<&String> = buckets.keys().collect();
    let mut consumed = vec![0usize; categories.len()];
    let mut cursor = 0usize;
    let step = DAY_SPAN_HOURS / per_day.max(1) + 1;

    let mut out_days = Vec::with_capacity(days as usize);
    let mut union = Vec::new();

    for day in 0..days {
        let mut picked: Vec<&PointRecord> = Vec::new();

        while picked.len() < per_day as usize && !categories.is_empty() {
            let next = (0..categories.len())
                .map(|offset| (cursor + offset) % categories.len())
                .find(|&i| consumed[i] < buckets[categories[i]].len());
            let Some(i) = next else { break };

            picked.push(&buckets[categories[i]][consumed[i]]);
            consumed[i] += 1;
            cursor = (i + 1) % categories.len();
        }

        let items: Vec<ItineraryItem> = picked
            .into_iter()
            .enumerate()
            .map(|(j, record)| {
                let hour = pace.start_hour() + j as u32 * step;
                ItineraryItem {
                    time: format!("{:02}:00", hour),
                    name: record
                        .name
                        .clone()
                        .unwrap_or_else(|| title_case(&record.layer)),
                    category: record.layer.clone(),
                    lat: record.lat,
                    lon: record.lon,
                    brand: record.brand.clone(),
                    distance_km_from_center: round3(
                        record
                            .distance_km
                            .unwrap_or_else(|| center.distance_km(&GeoPoint::new(record.lat, record.lon))),
                    ),
                }
            })
            .collect();

        union.extend(items.iter().map(|item| PointRecord {
            lat: item.lat,
            lon: item.lon,
            name: Some(item.name.clone()),
            brand: item.brand.clone(),
            layer: item.category.clone(),
            distance_km: None,
        }));

        out_days.push(ItineraryDay {
            day: day + 1,
            place: place.map(str::to_string),
            center,
            items,
        });
    }

    BuiltItinerary {
        days: out_days,
        union,
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// `"fast_food"` -> `"Fast_Food"`
fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for c in label.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

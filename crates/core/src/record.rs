//! Point records and map layers.
//!
//! A `PointRecord` is produced once by the geodata query builder and never
//! mutated afterwards. Records are grouped into `Layers`, an
//! insertion-ordered map from category label to records. The reserved
//! `union` label holds a deduplicated merge across categories.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved layer label for a deduplicated cross-category merge.
pub const UNION_LAYER: &str = "union";

/// Ordered mapping of layer label to records.
pub type Layers = IndexMap<String, Vec<PointRecord>>;

/// A single place returned by the geodata backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Category label this record was fetched under.
    pub layer: String,
    /// Distance from the trip center, set when ranked into a candidate bucket.
    #[serde(default, rename = "dist_km", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl PointRecord {
    pub fn new(lat: f64, lon: f64, layer: impl Into<String>) -> Self {
        Self {
            lat,
            lon,
            name: None,
            brand: None,
            layer: layer.into(),
            distance_km: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Identity of the physical place behind this record.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            lat_e6: (self.lat * 1e6).round() as i64,
            lon_e6: (self.lon * 1e6).round() as i64,
            name: self.name.clone(),
        }
    }
}

/// Coordinates rounded to 6 decimals plus the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    lat_e6: i64,
    lon_e6: i64,
    name: Option<String>,
}

/// Collapse every layer into a single `union` layer.
///
/// The first record seen for a given `DedupKey` wins; later duplicates are
/// dropped. Applying this to its own output is a no-op.
pub fn merge_union(layers: Layers) -> Layers {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in layers.into_values().flatten() {
        if seen.insert(record.dedup_key()) {
            rows.push(record);
        }
    }
    let mut out = Layers::new();
    out.insert(UNION_LAYER.to_string(), rows);
    out
}

/// Per-layer record counts, in layer order.
pub fn layer_stats(layers: &Layers) -> IndexMap<String, usize> {
    layers
        .iter()
        .map(|(label, rows)| (label.clone(), rows.len()))
        .collect()
}

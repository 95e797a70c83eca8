//! Overpass query construction and response parsing.

use serde::Deserialize;
use tokyo_map_core::{GeoPoint, PointRecord};

use crate::services::taxonomy::TagFilter;

/// Tokyo Metropolis, bound to `.searchArea`.
pub const TOKYO_AREA: &str = r#"area["name"="東京都"]["boundary"="administrative"]["admin_level"="4"];(._;)->.searchArea;"#;

/// Result cap used when no positive limit is given.
pub const DEFAULT_OUT_LIMIT: u32 = 300;

/// Backend-side timeout embedded in the query header.
const QUERY_TIMEOUT_SECS: u32 = 30;

/// One category query scoped to Tokyo, optionally intersected with a
/// circular geofence.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    tags: Vec<TagFilter>,
    brand_pattern: Option<String>,
    open_24h: bool,
    wheelchair: bool,
    geofence: Option<(GeoPoint, f64)>,
    limit: u32,
}

impl OverpassQuery {
    pub fn new(tags: &[TagFilter]) -> Self {
        Self {
            tags: tags.to_vec(),
            brand_pattern: None,
            open_24h: false,
            wheelchair: false,
            geofence: None,
            limit: DEFAULT_OUT_LIMIT,
        }
    }

    /// Backend-ready brand pattern (see `Taxonomy::resolve_brand`).
    pub fn brand(mut self, pattern: Option<String>) -> Self {
        self.brand_pattern = pattern;
        self
    }

    pub fn open_24h(mut self, on: bool) -> Self {
        self.open_24h = on;
        self
    }

    pub fn wheelchair(mut self, on: bool) -> Self {
        self.wheelchair = on;
        self
    }

    /// Geofence applies only with both a center and a positive radius.
    pub fn around(mut self, center: Option<GeoPoint>, radius_km: Option<f64>) -> Self {
        self.geofence = match (center, radius_km) {
            (Some(c), Some(r)) if r > 0.0 => Some((c, r)),
            _ => None,
        };
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = if limit == 0 { DEFAULT_OUT_LIMIT } else { limit };
        self
    }

    /// Render the Overpass QL text.
    ///
    /// With a brand, one statement per `brand` / `name` / `operator` key is
    /// unioned so a chain matches whichever key carries it.
    pub fn build(&self) -> String {
        let mut filter: String = self
            .tags
            .iter()
            .map(|(k, v)| format!(r#"["{}"="{}"]"#, k, v))
            .collect();
        if self.open_24h {
            filter.push_str(r#"["opening_hours"~"24/?7"]"#);
        }
        if self.wheelchair {
            filter.push_str(r#"["wheelchair"~"yes|limited"]"#);
        }

        let geo = match self.geofence {
            Some((c, r)) => format!("(around:{},{},{})", (r * 1000.0) as i64, c.lat, c.lon),
            None => String::new(),
        };

        let statements: Vec<String> = match &self.brand_pattern {
            Some(rx) => ["brand", "name", "operator"]
                .iter()
                .map(|key| {
                    format!(
                        r#"  nwr{}["{}"~"{}",i](area.searchArea){};"#,
                        filter, key, rx, geo
                    )
                })
                .collect(),
            None => vec![format!("  nwr{}(area.searchArea){};", filter, geo)],
        };

        format!(
            "[out:json][timeout:{}];\n{}\n(\n{}\n);\nout center {};\n",
            QUERY_TIMEOUT_SECS,
            TOKYO_AREA,
            statements.join("\n"),
            self.limit
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// One element of an Overpass JSON response. Nodes carry `lat`/`lon`;
/// ways and relations carry a `center` when queried with `out center`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: std::collections::HashMap<String, String>,
}

impl RawElement {
    pub fn node(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn point(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some(GeoPoint::new(lat, lon)),
            (_, _, Some(c)) => Some(GeoPoint::new(c.lat, c.lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Normalize elements into records of `layer`; elements without any
/// coordinate are dropped.
pub fn parse_elements(elements: Vec<RawElement>, layer: &str) -> Vec<PointRecord> {
    elements
        .into_iter()
        .filter_map(|e| {
            let point = e.point()?;
            let mut record = PointRecord::new(point.lat, point.lon, layer);
            record.name = e.tags.get("name").cloned();
            record.brand = e.tags.get("brand").cloned();
            Some(record)
        })
        .collect()
}

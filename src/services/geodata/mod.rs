//! Geodata
//!
//! Query construction for the Overpass backend, the backend transport and
//! the geocoder. Transports sit behind traits so the dispatcher can run
//! against in-memory backends.

pub mod geocoder;
pub mod overpass;
pub mod query;

use async_trait::async_trait;
use thiserror::Error;
use tokyo_map_core::{GeoPoint, PointRecord};

use crate::services::taxonomy::TagFilter;
use crate::utils::error::AppError;

pub use geocoder::{Geocoder, NominatimGeocoder};
pub use overpass::OverpassClient;
pub use query::{parse_elements, OverpassQuery, RawElement, TOKYO_AREA};

/// Longest response body kept in an error message.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    Parse(String),
}

impl GeoError {
    pub fn http(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Rate limiting, gateway timeouts and transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 504),
            Self::Network(_) => true,
            Self::Parse(_) => false,
        }
    }
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        AppError::geodata(err.to_string())
    }
}

/// Executes a rendered query and returns its raw elements.
#[async_trait]
pub trait GeodataBackend: Send + Sync {
    async fn execute(&self, query: &str) -> Result<Vec<RawElement>, GeoError>;
}

/// Constraints shared by every category of one search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Backend-ready brand pattern.
    pub brand_pattern: Option<String>,
    pub open_24h: bool,
    pub wheelchair: bool,
    pub center: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub limit: u32,
}

impl SearchFilter {
    pub fn query(&self, tags: &[TagFilter]) -> OverpassQuery {
        OverpassQuery::new(tags)
            .brand(self.brand_pattern.clone())
            .open_24h(self.open_24h)
            .wheelchair(self.wheelchair)
            .around(self.center, self.radius_km)
            .limit(self.limit)
    }
}

/// Build, execute and parse one category query, tagging records with `layer`.
pub async fn fetch_category(
    backend: &dyn GeodataBackend,
    layer: &str,
    tags: &[TagFilter],
    filter: &SearchFilter,
) -> Result<Vec<PointRecord>, GeoError> {
    let query = filter.query(tags).build();
    let elements = backend.execute(&query).await?;
    let records = parse_elements(elements, layer);
    tracing::info!("[overpass] layer={} records={}", layer, records.len());
    Ok(records)
}

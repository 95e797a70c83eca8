//! Place name → coordinate lookup.

use async_trait::async_trait;
use serde::Deserialize;
use tokyo_map_core::GeoPoint;

use super::GeoError;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the place is unknown.
    async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>, GeoError>;
}

/// Nominatim search restricted to Japan, first hit only.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    /// `client` should carry the User-Agent Nominatim requires.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

fn parse_hits(hits: &[NominatimHit]) -> Result<Option<GeoPoint>, GeoError> {
    let Some(first) = hits.first() else {
        return Ok(None);
    };
    let lat = first
        .lat
        .parse::<f64>()
        .map_err(|e| GeoError::Parse(format!("lat {:?}: {}", first.lat, e)))?;
    let lon = first
        .lon
        .parse::<f64>()
        .map_err(|e| GeoError::Parse(format!("lon {:?}: {}", first.lon, e)))?;
    Ok(Some(GeoPoint::new(lat, lon)))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>, GeoError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("q", place),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", "jp"),
            ])
            .send()
            .await
            .map_err(GeoError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::http(status.as_u16(), &body));
        }

        let hits: Vec<NominatimHit> = response.json().await.map_err(GeoError::from_reqwest)?;
        let point = parse_hits(&hits)?;
        tracing::debug!("[geocode] {} -> {:?}", place, point);
        Ok(point)
    }
}

//! GeoJSON export of a stored result.

use axum::extract::{Path, State};
use axum::Json;

use crate::models::response::{Feature, FeatureCollection, FeatureProperties};
use crate::services::store::StoreEntry;
use crate::state::SharedState;
use crate::utils::error::AppResult;

pub async fn map_geojson(
    State(state): State<SharedState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<FeatureCollection>> {
    let entry = state.store().get(&store_id)?;
    Ok(Json(to_geojson(&entry)?))
}

/// One point feature per record, in layer order.
pub fn to_geojson(entry: &StoreEntry) -> AppResult<FeatureCollection> {
    let features = entry
        .layers
        .iter()
        .flat_map(|(layer, rows)| {
            rows.iter().map(move |row| {
                Feature::point(
                    row.lat,
                    row.lon,
                    FeatureProperties {
                        layer: layer.clone(),
                        name: row.name.clone(),
                        brand: row.brand.clone(),
                    },
                )
            })
        })
        .collect();
    Ok(FeatureCollection::new(features, serde_json::to_value(&entry.meta)?))
}

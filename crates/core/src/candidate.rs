//! Candidate buckets: records ranked by distance from a trip center.

use std::cmp::Ordering;

use crate::geo::GeoPoint;
use crate::record::PointRecord;

/// Minimum number of candidates kept per interest.
const MIN_BUCKET: usize = 30;

/// Annotate every record with its distance from `center` and sort by
/// `(distance ascending, name ascending)`. Records without a name sort as
/// the empty string.
pub fn rank_by_distance(records: Vec<PointRecord>, center: &GeoPoint) -> Vec<PointRecord> {
    let mut ranked: Vec<PointRecord> = records
        .into_iter()
        .map(|mut r| {
            r.distance_km = Some(center.distance_km(&GeoPoint::new(r.lat, r.lon)));
            r
        })
        .collect();
    ranked.sort_by(compare_candidates);
    ranked
}

fn compare_candidates(a: &PointRecord, b: &PointRecord) -> Ordering {
    let da = a.distance_km.unwrap_or(f64::INFINITY);
    let db = b.distance_km.unwrap_or(f64::INFINITY);
    da.total_cmp(&db).then_with(|| {
        a.name
            .as_deref()
            .unwrap_or("")
            .cmp(b.name.as_deref().unwrap_or(""))
    })
}

/// How many ranked candidates to keep for one interest.
///
/// Enough to fill `days × per_day` twice over when spread across all
/// interests, never fewer than 30, never more than are available.
pub fn bucket_take(available: usize, days: u32, per_day: u32, interests: usize) -> usize {
    let wanted = (per_day as usize * days as usize * 2) / interests.max(1);
    available.min(wanted.max(MIN_BUCKET))
}

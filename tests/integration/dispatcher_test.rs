//! Dispatcher Integration Tests
//!
//! Verifies tool execution against in-memory backends:
//! - range-tier defaults and explicit overrides
//! - union dedup and merge membership
//! - candidate collection and itinerary scheduling
//! - unknown categories, unknown ids and unknown places

use serde_json::json;
use tokyo_map_agent::services::store::EntryKind;
use tokyo_map_agent::services::taxonomy::Taxonomy;
use tokyo_map_agent::AppError;
use tokyo_map_core::{Layers, PointRecord, UNION_LAYER};
use tokyo_map_tools::{Mode, ModeArgs, ResultType, ToolInvocation};

use crate::support::*;

async fn execute(
    fixture: &Fixture,
    name: &str,
    args: serde_json::Value,
    mode: Mode,
) -> Result<tokyo_map_tools::ToolOutput, AppError> {
    let invocation = ToolInvocation::decode(name, args, mode)?;
    fixture
        .state
        .control()
        .orchestrator()
        .dispatcher()
        .execute(&Taxonomy::builtin(), invocation)
        .await
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_shibuya_convenience_and_cafe_within_1_5km() {
    let geodata = FakeGeodata::new()
        .with(CONVENIENCE_TAG, nodes_near(SHIBUYA, "Lawson", 4))
        .with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 3));
    let fixture = FixtureBuilder::new().geodata(geodata).build();

    let out = execute(
        &fixture,
        "search_osm_tokyo",
        json!({
            "categories": ["convenience", "cafe"],
            "place": "渋谷駅",
            "radius_km": 1.5,
            "union": false,
            "range": "standard"
        }),
        Mode::Search,
    )
    .await
    .unwrap();

    assert_eq!(fixture.geocoder.lookups(), vec!["渋谷駅".to_string()]);
    assert_eq!(
        out.stats.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["convenience", "cafe"]
    );
    assert_eq!(out.stats["convenience"], 4);
    assert_eq!(out.stats["cafe"], 3);

    match &out.args {
        ModeArgs::Search(args) => assert_eq!(args.radius_km, Some(1.5)),
        other => panic!("unexpected args {:?}", other),
    }
    for query in fixture.geodata.queries() {
        assert!(query.contains("(around:1500,35.658,139.7016)"), "{}", query);
    }
}

#[tokio::test]
async fn test_union_key_when_union_requested() {
    let geodata = FakeGeodata::new()
        .with(CONVENIENCE_TAG, nodes_near(SHIBUYA, "Lawson", 4))
        .with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 3));
    let fixture = FixtureBuilder::new().geodata(geodata).build();

    let out = execute(
        &fixture,
        "search_osm_tokyo",
        json!({"categories": ["convenience", "cafe"], "place": "渋谷駅"}),
        Mode::Search,
    )
    .await
    .unwrap();

    assert_eq!(out.stats.len(), 1);
    assert_eq!(out.stats[UNION_LAYER], 7);
}

#[tokio::test]
async fn test_range_defaults_fill_omitted_radius() {
    let fixture = FixtureBuilder::new().build();
    let out = execute(
        &fixture,
        "search_osm_tokyo",
        json!({"categories": ["cafe"], "place": "渋谷駅", "range": "narrow"}),
        Mode::Search,
    )
    .await
    .unwrap();

    match &out.args {
        ModeArgs::Search(args) => {
            assert!(args.radius_km.unwrap() > 0.0);
            assert!(args.limit.unwrap() > 0);
        }
        other => panic!("unexpected args {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_category_is_skipped() {
    let geodata = FakeGeodata::new().with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 2));
    let fixture = FixtureBuilder::new().geodata(geodata).build();

    let out = execute(
        &fixture,
        "search_osm_tokyo",
        json!({"categories": ["cafe", "onsen"], "union": false}),
        Mode::Search,
    )
    .await
    .unwrap();

    assert_eq!(out.stats.len(), 1);
    assert_eq!(out.stats["cafe"], 2);
    assert_eq!(fixture.geodata.queries().len(), 1);
}

#[tokio::test]
async fn test_unknown_place_searches_tokyo_wide() {
    let fixture = FixtureBuilder::new().build();
    execute(
        &fixture,
        "search_osm_tokyo",
        json!({"categories": ["cafe"], "place": "Atlantis"}),
        Mode::Search,
    )
    .await
    .unwrap();

    let queries = fixture.geodata.queries();
    assert!(!queries[0].contains("around:"));
    assert!(queries[0].contains("area.searchArea"));
}

// ============================================================================
// Merge
// ============================================================================

fn layer(label: &str, points: &[(f64, f64, &str)]) -> Layers {
    let mut layers = Layers::new();
    layers.insert(
        label.to_string(),
        points
            .iter()
            .map(|(lat, lon, name)| PointRecord::new(*lat, *lon, label).with_name(*name))
            .collect(),
    );
    layers
}

#[tokio::test]
async fn test_merge_identical_point_collapses() {
    let fixture = FixtureBuilder::new().build();
    let store = fixture.state.store();
    let a = store.put(
        layer("cafe", &[(35.0, 139.0, "A")]),
        tokyo_map_agent::services::store::StoreMeta::new(json!({"categories": ["cafe"]})),
    );
    let b = store.put(
        layer("park", &[(35.0, 139.0, "A")]),
        tokyo_map_agent::services::store::StoreMeta::new(json!({"categories": ["park"]})),
    );

    let out = execute(
        &fixture,
        "merge_search_results",
        json!({"store_ids": [a.id, b.id], "union": true}),
        Mode::Search,
    )
    .await
    .unwrap();

    assert_eq!(out.stats[UNION_LAYER], 1);
    let merged = store.get(out.store_id.as_deref().unwrap()).unwrap();
    assert_eq!(merged.layers[UNION_LAYER].len(), 1);
    assert_eq!(merged.meta.kind, Some(EntryKind::MergedSearch));
    match &out.args {
        ModeArgs::Search(args) => assert_eq!(args.categories, vec!["cafe", "park"]),
        other => panic!("unexpected args {:?}", other),
    }
}

#[tokio::test]
async fn test_merge_membership_is_order_independent() {
    let fixture = FixtureBuilder::new().build();
    let store = fixture.state.store();
    let meta = || tokyo_map_agent::services::store::StoreMeta::new(json!({}));
    let a = store.put(layer("cafe", &[(35.0, 139.0, "A"), (35.1, 139.1, "B")]), meta());
    let b = store.put(layer("cafe", &[(35.1, 139.1, "B"), (35.2, 139.2, "C")]), meta());

    let ab = store.merge(&[a.id.clone(), b.id.clone()], true).unwrap();
    let ba = store.merge(&[b.id.clone(), a.id.clone()], true).unwrap();

    let names = |entry: &tokyo_map_agent::services::store::StoreEntry| {
        let mut names: Vec<String> = entry.layers[UNION_LAYER]
            .iter()
            .filter_map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    };
    assert_eq!(names(&ab), vec!["A", "B", "C"]);
    assert_eq!(names(&ab), names(&ba));
}

#[tokio::test]
async fn test_merge_requires_known_ids() {
    let fixture = FixtureBuilder::new().build();
    let err = execute(
        &fixture,
        "merge_search_results",
        json!({"store_ids": ["missing"]}),
        Mode::Search,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::UnknownStoreId(_)));

    let err = execute(&fixture, "merge_search_results", json!({}), Mode::Search)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToolArguments(_)));
}

// ============================================================================
// Trips
// ============================================================================

fn ueno_parks(count: usize) -> FakeGeodata {
    FakeGeodata::new().with(PARK_TAG, nodes_near(UENO, "Park", count))
}

#[tokio::test]
async fn test_ueno_day_trip() {
    let fixture = FixtureBuilder::new().geodata(ueno_parks(20)).build();

    let out = execute(
        &fixture,
        "plan_trip_tokyo",
        json!({"place": "上野", "days": 1, "per_day": 6, "interests": ["park"]}),
        Mode::Trip,
    )
    .await
    .unwrap();

    assert_eq!(out.result_type, ResultType::Trip);
    let itinerary = out.itinerary.as_ref().unwrap();
    assert_eq!(itinerary.len(), 1);
    assert!(itinerary[0].items.len() <= 6);
    assert_eq!(itinerary[0].items[0].time, "09:00");
    // Nearest first
    assert_eq!(itinerary[0].items[0].name, "Park 1");
    assert_eq!(out.stats["spots"], itinerary[0].items.len());

    let entry = fixture.state.store().get(out.store_id.as_deref().unwrap()).unwrap();
    assert_eq!(entry.meta.kind, Some(EntryKind::Trip));
    assert_eq!(entry.layers[UNION_LAYER].len(), out.stats["spots"]);
}

#[tokio::test]
async fn test_collect_then_build_itinerary() {
    let fixture = FixtureBuilder::new().geodata(ueno_parks(10)).build();

    let candidates = execute(
        &fixture,
        "collect_trip_candidates",
        json!({"place": "上野", "days": 2, "per_day": 3, "interests": ["park", "unicorns"]}),
        Mode::Trip,
    )
    .await
    .unwrap();
    assert_eq!(candidates.result_type, ResultType::Candidate);
    assert!(candidates.store_id.is_none());
    let candidate_id = candidates.candidate_id.clone().unwrap();
    assert_eq!(candidates.stats.len(), 1);

    let entry = fixture.state.store().get(&candidate_id).unwrap();
    assert_eq!(entry.meta.kind, Some(EntryKind::TripCandidates));
    assert_eq!(entry.meta.place.as_deref(), Some("上野"));

    let trip = execute(
        &fixture,
        "build_trip_itinerary",
        json!({"candidate_id": candidate_id, "pace": "packed"}),
        Mode::Trip,
    )
    .await
    .unwrap();

    let itinerary = trip.itinerary.as_ref().unwrap();
    assert_eq!(itinerary.len(), 2);
    assert_eq!(itinerary[0].items[0].time, "08:00");
    assert_eq!(itinerary[0].place.as_deref(), Some("上野"));
    assert_eq!(trip.stats["days"], 2);
    assert_eq!(trip.stats["per_day"], 3);
    assert_eq!(trip.stats["spots"], 6);

    let stored = fixture.state.store().get(trip.store_id.as_deref().unwrap()).unwrap();
    assert_eq!(stored.meta.source_candidate_id.as_deref(), Some(candidate_id.as_str()));
    // The center comes from the candidate entry, no second lookup
    assert_eq!(fixture.geocoder.lookups().len(), 1);
}

#[tokio::test]
async fn test_build_itinerary_unknown_candidate() {
    let fixture = FixtureBuilder::new().build();
    let err = execute(
        &fixture,
        "build_trip_itinerary",
        json!({"candidate_id": "nope"}),
        Mode::Trip,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::UnknownStoreId(ref id) if id == "nope"));
}

#[tokio::test]
async fn test_trip_unknown_place_fails_geocode() {
    let fixture = FixtureBuilder::new().build();
    let err = execute(
        &fixture,
        "plan_trip_tokyo",
        json!({"place": "Atlantis", "interests": ["park"]}),
        Mode::Trip,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::GeocodeFailed(_)));
}

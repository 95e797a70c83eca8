//! HTTP Integration Tests
//!
//! Exercises the router in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokyo_map_agent::router;
use tower::ServiceExt;

use crate::support::*;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn shibuya_fixture() -> Fixture {
    FixtureBuilder::new()
        .chain(vec![tool_call(
            "search_osm_tokyo",
            json!({"categories": ["convenience", "cafe"], "place": "渋谷駅", "radius_km": 1.5}),
        )])
        .summaries(vec![text("7件見つかりました。")])
        .geodata(
            FakeGeodata::new()
                .with(CONVENIENCE_TAG, nodes_near(SHIBUYA, "Lawson", 4))
                .with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 3)),
        )
        .build()
}

// ============================================================================
// Health and GeoJSON
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = FixtureBuilder::new().build();
    let (status, body) = send(router(fixture.state.clone()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["categories"], 12);
    assert_eq!(body["brands"], 3);
    assert_eq!(body["stored_results"], 0);
}

#[tokio::test]
async fn test_geojson_unknown_store_id() {
    let fixture = FixtureBuilder::new().build();
    let (status, body) = send(router(fixture.state.clone()), get("/map/unknown/geojson")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "store_id not found: unknown");
}

// ============================================================================
// Query and trip
// ============================================================================

#[tokio::test]
async fn test_query_then_geojson() {
    let fixture = shibuya_fixture();
    let app = router(fixture.state.clone());

    let (status, body) = send(
        app.clone(),
        post_json("/query", json!({"text": "渋谷駅から1.5km以内のコンビニとカフェ"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"], "7件見つかりました。");
    assert_eq!(body["stats"]["union"], 7);
    assert_eq!(body["attempts"], 1);
    assert!(body.get("itinerary").is_none());

    let store_id = body["store_id"].as_str().unwrap().to_string();
    let (status, geojson) = send(app, get(&format!("/map/{}/geojson", store_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(geojson["type"], "FeatureCollection");

    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), 7);
    let coords = &features[0]["geometry"]["coordinates"];
    assert!(coords[0].as_f64().unwrap() > 139.0);
    assert!(coords[1].as_f64().unwrap() < 36.0);
    assert_eq!(geojson["meta"]["args"]["radius_km"], 1.5);
}

#[tokio::test]
async fn test_legacy_query_alias() {
    let fixture = shibuya_fixture();
    let (status, body) = send(
        router(fixture.state.clone()),
        post_json("/v1/map/query", json!({"text": "渋谷のコンビニとカフェ"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let store_id = body["store_id"].as_str().unwrap();
    let (status, _) = send(
        router(fixture.state.clone()),
        get(&format!("/v1/map/{}/geojson", store_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_trip_endpoint() {
    let fixture = FixtureBuilder::new()
        .chain(vec![tool_call(
            "plan_trip_tokyo",
            json!({"place": "上野", "days": 1, "interests": ["park"]}),
        )])
        .geodata(FakeGeodata::new().with(PARK_TAG, nodes_near(UENO, "Park", 20)))
        .build();

    let (status, body) = send(
        router(fixture.state.clone()),
        post_json("/trip", json!({"text": "上野で1日"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["itinerary"][0]["day"], 1);
    assert_eq!(body["itinerary"][0]["items"][0]["time"], "09:00");
    assert_eq!(body["args"]["place"], "上野");
}

#[tokio::test]
async fn test_chain_error_maps_to_status() {
    let fixture = FixtureBuilder::new()
        .chain(vec![tool_call("plan_trip_tokyo", json!({"place": "Atlantis"}))])
        .build();

    let (status, body) = send(
        router(fixture.state.clone()),
        post_json("/trip", json!({"text": "Atlantis"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Atlantis"));
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let fixture = FixtureBuilder::new().build();
    let request = Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _) = send(router(fixture.state.clone()), request).await;
    assert!(status.is_client_error());
    assert_eq!(fixture.chain.call_count(), 0);
}

// ============================================================================
// Review
// ============================================================================

#[tokio::test]
async fn test_review_invalid_payload() {
    let fixture = FixtureBuilder::new().build();

    for payload in [
        json!({"review_text": "", "context": {"mode": "search"}}),
        json!({"review_text": "もっと広く", "context": {"mode": "drive"}}),
        json!({"review_text": "もっと広く"}),
    ] {
        let (status, body) = send(router(fixture.state.clone()), post_json("/review", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "invalid review payload");
    }
}

#[tokio::test]
async fn test_review_patch_failure() {
    let fixture = FixtureBuilder::new().build();
    let (status, body) = send(
        router(fixture.state.clone()),
        post_json(
            "/v1/review/continue",
            json!({
                "review_text": "渋谷にして",
                "context": {"mode": "search", "user_text": "カフェ", "args": {"categories": ["cafe"]}}
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "review parsing failed");
}

//! Taxonomy Hot Reload Tests

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokyo_map_agent::router;
use tokyo_map_agent::services::taxonomy::TaxonomyHandle;
use tower::ServiceExt;

use crate::support::*;

const INITIAL: &str = r#"
categories:
  cafe: [[amenity, cafe]]
  park: [[leisure, park]]
brands:
  Doutor: "(?i)(Doutor|ドトール)"
"#;

const UPDATED: &str = r#"
categories:
  cafe: [[amenity, cafe]]
  park: [[leisure, park]]
  museum: [[tourism, museum]]
brands:
  Doutor: "(?i)(Doutor|ドトール)"
  Tully's: "(?i)(Tully's|タリーズ)"
"#;

/// Rewrite `path` and push its mtime forward so the change is visible even
/// on filesystems with coarse timestamps.
fn rewrite(path: &Path, content: &str, offset_secs: u64) {
    fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
}

#[tokio::test]
async fn test_reload_picks_up_new_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.yaml");
    fs::write(&path, INITIAL).unwrap();

    let handle = TaxonomyHandle::load(&path).unwrap();
    assert_eq!(handle.snapshot().await.category_names(), vec!["cafe", "park"]);

    // Unchanged file: nothing to do
    assert!(!handle.reload(false).await.unwrap());

    rewrite(&path, UPDATED, 10);
    handle.reload_if_changed().await;

    let taxonomy = handle.snapshot().await;
    assert!(taxonomy.has_category("museum"));
    assert_eq!(taxonomy.brand_count(), 2);
}

#[tokio::test]
async fn test_malformed_file_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.yaml");
    fs::write(&path, INITIAL).unwrap();
    let handle = TaxonomyHandle::load(&path).unwrap();

    rewrite(&path, "categories: [1, 2", 10);
    handle.reload_if_changed().await;
    assert!(handle.reload(false).await.is_err());

    assert_eq!(handle.snapshot().await.category_names(), vec!["cafe", "park"]);
}

#[tokio::test]
async fn test_deleted_file_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.yaml");
    fs::write(&path, INITIAL).unwrap();
    let handle = TaxonomyHandle::load(&path).unwrap();

    fs::remove_file(&path).unwrap();
    assert!(!handle.reload(true).await.unwrap());
    assert_eq!(handle.snapshot().await.category_names().len(), 2);
}

#[tokio::test]
async fn test_requests_see_reloaded_taxonomy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.yaml");
    fs::write(&path, INITIAL).unwrap();

    let fixture = FixtureBuilder::new()
        .taxonomy(TaxonomyHandle::load(&path).unwrap())
        .build();
    let app = router(fixture.state.clone());

    let health = |app: axum::Router| async move {
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice::<Value>(&bytes).unwrap()
    };

    assert_eq!(health(app.clone()).await["categories"], 2);

    rewrite(&path, UPDATED, 10);
    let body = health(app).await;
    assert_eq!(body["categories"], 3);
    assert_eq!(body["brands"], 2);
}

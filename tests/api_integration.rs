//! API Integration Tests for isstrack
//!
//! Drives the real router over a loopback socket, with the store behind it
//! and either a fake or a real HTTP snapshot source.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::Json;
use axum::routing::get;
use isstrack::server::{AppState, create_router};
use isstrack::storage::DeleteOutcome;
use isstrack::{
    HttpSource, HttpSourceConfig, NewReading, Reading, ReadingStore, RetentionPolicy, Snapshot,
    SnapshotSource, SourceError, StorageBuilder, StorageHandles, StoreError, Tracker,
    TrackerOptions,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Source whose timestamp advances by one per call.
struct CountingSource {
    next: AtomicI64,
}

#[async_trait::async_trait]
impl SnapshotSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        let ts = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(Snapshot::new(10.0, 20.0, 400.0, 7660.0, 1_700_000_000.0 + ts as f64))
    }
}

/// Source that is always down.
struct DownSource;

#[async_trait::async_trait]
impl SnapshotSource for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        Err(SourceError::Unavailable("request timed out".to_string()))
    }
}

/// Store whose listing is slowed down, so a request is still in flight when
/// shutdown begins.
struct SlowListStore {
    inner: Arc<dyn ReadingStore>,
    delay: Duration,
}

#[async_trait::async_trait]
impl ReadingStore for SlowListStore {
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError> {
        self.inner.insert(reading).await
    }

    async fn list_recent(
        &self,
        limit: Option<u32>,
        offset: u64,
    ) -> Result<Vec<Reading>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_recent(limit, offset).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<DeleteOutcome, StoreError> {
        self.inner.delete_batch(ids).await
    }
}

/// Serve `router` on a random loopback port and return its base URL.
async fn serve(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Build a tracker over an in-memory SQLite store. The scheduler is not
/// started; tests drive cycles explicitly.
async fn build_tracker(
    source: Arc<dyn SnapshotSource>,
    max_records: u64,
) -> (Tracker, StorageHandles) {
    let handles = StorageBuilder::new("sqlite::memory:")
        .build()
        .await
        .expect("Failed to build storage");

    let tracker = Tracker::new(
        source,
        handles.store.clone(),
        TrackerOptions {
            retention: RetentionPolicy::new(max_records),
            ..Default::default()
        },
    );
    (tracker, handles)
}

/// Start the API server for `tracker` and return its base URL.
async fn start_test_server(tracker: &Tracker) -> String {
    let state = AppState {
        query: tracker.query(),
        sampler: Arc::clone(tracker.sampler()),
    };
    serve(create_router(state)).await
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let (tracker, handles) = build_tracker(
        Arc::new(CountingSource {
            next: AtomicI64::new(0),
        }),
        1000,
    )
    .await;
    let base_url = start_test_server(&tracker).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .expect("Failed to send health request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse health response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["max_records"], 1000);
    assert_eq!(body["sampler"]["cycles_ok"], 0);

    let resp = client
        .get(format!("{}/readyz", base_url))
        .send()
        .await
        .expect("Failed to send readyz request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse readyz response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ready");

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Stored Readings Tests
// =============================================================================

#[tokio::test]
async fn test_sampled_readings_are_served_newest_first() {
    let (tracker, handles) = build_tracker(
        Arc::new(CountingSource {
            next: AtomicI64::new(0),
        }),
        1000,
    )
    .await;
    for _ in 0..5 {
        assert!(tracker.sampler().run_cycle().await.reading().is_some());
    }
    let base_url = start_test_server(&tracker).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/iss-data", base_url))
        .send()
        .await
        .expect("Failed to fetch readings");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    assert_eq!(data[0]["timestamp"], 1_700_000_004.0);
    assert_eq!(data[4]["timestamp"], 1_700_000_000.0);
    assert_eq!(data[0]["latitude"], 10.0);
    assert_eq!(data[0]["velocity"], 7660.0);

    let resp = client
        .get(format!("{}/api/iss-data?limit=2", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let resp = client
        .get(format!("{}/api/iss-data/latest", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], data[0]["id"]);

    let resp = client.get(format!("{}/health", base_url)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["sampler"]["cycles_ok"], 5);
    assert_eq!(body["sampler"]["last_reading_id"], data[0]["id"]);

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Cleanup Tests
// =============================================================================

#[tokio::test]
async fn test_cleanup_now_caps_series() {
    let (tracker, handles) = build_tracker(
        Arc::new(CountingSource {
            next: AtomicI64::new(0),
        }),
        3,
    )
    .await;
    for _ in 0..7 {
        tracker.sampler().run_cycle().await;
    }
    let base_url = start_test_server(&tracker).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/cleanup-now", base_url))
        .send()
        .await
        .expect("Failed to trigger cleanup");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Deleted 4 old records");
    assert_eq!(body["deleted"], 4);
    assert_eq!(body["requested"], 4);
    assert_eq!(body["failed_ids"], json!([]));

    // The three newest survive.
    let resp = client
        .get(format!("{}/api/iss-data", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let stamps: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_f64().unwrap())
        .collect();
    assert_eq!(stamps, vec![1_700_000_006.0, 1_700_000_005.0, 1_700_000_004.0]);

    let resp = client
        .post(format!("{}/cleanup-now", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No cleanup needed");

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Live Location Tests
// =============================================================================

#[tokio::test]
async fn test_live_location_failure_leaves_series_untouched() {
    let (tracker, handles) = build_tracker(Arc::new(DownSource), 1000).await;
    let base_url = start_test_server(&tracker).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/iss-location", base_url))
        .send()
        .await
        .expect("Failed to fetch live location");
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("timed out"));

    // A failed sample cycle stores nothing either.
    assert!(tracker.sampler().run_cycle().await.reading().is_none());
    let resp = client
        .get(format!("{}/api/iss-data", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));

    handles.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_live_location_through_http_source() {
    let upstream = serve(axum::Router::new().route(
        "/v1/satellites/25544",
        get(|| async {
            Json(json!({
                "name": "iss",
                "id": 25544,
                "latitude": 10.0,
                "longitude": 20.0,
                "altitude": 400.0,
                "velocity": 7660.0,
                "visibility": "daylight",
                "timestamp": 1_700_000_000.25
            }))
        }),
    ))
    .await;

    let source = HttpSource::new(HttpSourceConfig::new(format!(
        "{}/v1/satellites/25544",
        upstream
    )))
    .unwrap();
    let (tracker, handles) = build_tracker(Arc::new(source), 1000).await;
    let base_url = start_test_server(&tracker).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/iss-location", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["visibility"], "daylight");
    assert_eq!(body["timestamp"], 1_700_000_000.25);

    // Live reads bypass storage; a sample cycle stores exactly the input fields.
    let stored = tracker.sampler().run_cycle().await;
    let reading = stored.reading().unwrap();
    assert_eq!(reading.latitude, 10.0);
    assert_eq!(reading.longitude, 20.0);
    assert_eq!(reading.altitude, 400.0);
    assert_eq!(reading.velocity, 7660.0);
    assert_eq!(reading.timestamp, 1_700_000_000.25);

    let latest = tracker.query().get_recent_readings(50).await.unwrap();
    assert_eq!(latest.len(), 1);

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[tokio::test]
async fn test_shutdown_drains_requests_before_closing_pool() {
    let handles = StorageBuilder::new("sqlite::memory:")
        .build()
        .await
        .expect("Failed to build storage");
    let store = Arc::new(SlowListStore {
        inner: handles.store.clone(),
        delay: Duration::from_millis(300),
    });
    let tracker = Tracker::new(
        Arc::new(CountingSource {
            next: AtomicI64::new(0),
        }),
        store,
        TrackerOptions::default(),
    );
    assert!(tracker.sampler().run_cycle().await.reading().is_some());

    let state = AppState {
        query: tracker.query(),
        sampler: Arc::clone(tracker.sampler()),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let request = tokio::spawn(async move {
        let resp = reqwest::get(format!("http://{}/api/iss-data", addr))
            .await
            .expect("Failed to fetch readings");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap();
        (status, body)
    });

    // Signal shutdown while the listing is still sleeping in the store.
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    handles.shutdown().await.unwrap();

    let (status, body) = request.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#![allow(clippy::float_cmp)]
// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SkyWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use skywatch_server::api::{self, ApiState};
use skywatch_server::collector::Collector;
use skywatch_server::config::ServerConfig;
use skywatch_server::db::{Database, ReadingStore};
use skywatch_server::error::StoreError;
use skywatch_server::model::{DayBoundary, Reading, ReadingFilter, StoredReading};
use skywatch_server::provider::OpenWeatherMapClient;
use skywatch_server::query::SummaryService;
use skywatch_server::scheduler::Scheduler;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn test_config(base_url: &str) -> ServerConfig {
    let content = format!(
        r#"
        [provider]
        api_key = "integration-key"
        base_url = "{base_url}"

        [collector]
        poll_interval_secs = 300
        fetch_timeout_secs = 2
        cities = ["Delhi", "Mumbai"]
        "#
    );
    ServerConfig::parse(&content, None).expect("Failed to build test config")
}

#[derive(Debug)]
struct OfflineStore;

impl ReadingStore for OfflineStore {
    fn append(&self, _reading: &Reading) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }

    fn query(&self, _filter: &ReadingFilter) -> Result<Vec<StoredReading>, StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }

    fn reading_count(&self, _city: Option<&str>) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }
}

struct TestServer {
    port: u16,
    store: Arc<dyn ReadingStore>,
    config: Arc<ServerConfig>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let db = Database::open(":memory:").expect("Failed to open in-memory database");
        Self::start_with(Arc::new(db), "http://127.0.0.1:1", None).await
    }

    async fn start_with(
        store: Arc<dyn ReadingStore>,
        provider_url: &str,
        static_dir: Option<&Path>,
    ) -> Self {
        let config = Arc::new(test_config(provider_url));
        let boundary = config.day_boundary().expect("Invalid test timezone");

        let state = ApiState {
            summaries: SummaryService::new(Arc::clone(&store), boundary),
            store: Arc::clone(&store),
            scheduler: Arc::new(Scheduler::new(config.poll_interval())),
            config: Arc::clone(&config),
        };
        let app = api::router(state, static_dir);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local addr").port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            port,
            store,
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn summary(&self, path: &str) -> serde_json::Value {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    fn seed(&self, city: &str, captured_at: &str, temp: f64, condition: &str) {
        let reading = Reading {
            city: city.to_owned(),
            captured_at: skywatch_server::model::parse_timestamp(captured_at).unwrap(),
            temperature_c: temp,
            feels_like_c: temp - 1.0,
            condition: condition.to_owned(),
        };
        self.store.append(&reading).unwrap();
    }
}

fn owm_body(kelvin: f64, condition: &str) -> String {
    json!({
        "main": { "temp": kelvin, "feels_like": kelvin - 1.0 },
        "weather": [{ "main": condition }]
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Weather summary endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_without_readings_is_empty_array() {
    let server = TestServer::start().await;
    let body = server.summary("/weather_summary").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn summary_reports_daily_statistics() {
    let server = TestServer::start().await;
    server.seed("Delhi", "2024-01-01T06:00:00Z", 20.0, "Clear");
    server.seed("Delhi", "2024-01-01T12:00:00Z", 24.0, "Clear");
    server.seed("Delhi", "2024-01-01T18:00:00Z", 22.0, "Cloudy");

    let body = server.summary("/weather_summary").await;

    assert_eq!(
        body,
        json!([{
            "city": "Delhi",
            "date": "2024-01-01",
            "avg_temp": 22.0,
            "max_temp": 24.0,
            "min_temp": 20.0,
            "dominant_condition": "Clear",
            "sample_count": 3
        }])
    );
}

#[tokio::test]
async fn summary_is_sorted_and_tie_broken() {
    let server = TestServer::start().await;
    server.seed("Mumbai", "2024-01-02T06:00:00Z", 30.0, "Rain");
    server.seed("Mumbai", "2024-01-02T07:00:00Z", 31.0, "Haze");
    server.seed("Delhi", "2024-01-02T06:00:00Z", 15.0, "Fog");
    server.seed("Delhi", "2024-01-01T06:00:00Z", 14.0, "Fog");

    let body = server.summary("/weather_summary").await;
    let rows = body.as_array().unwrap();

    let keys: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r["city"].as_str().unwrap(), r["date"].as_str().unwrap()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Delhi", "2024-01-01"),
            ("Delhi", "2024-01-02"),
            ("Mumbai", "2024-01-02"),
        ]
    );
    assert_eq!(rows[2]["dominant_condition"], "Haze");
}

#[tokio::test]
async fn summary_filters_by_city_and_dates() {
    let server = TestServer::start().await;
    server.seed("Delhi", "2024-01-01T06:00:00Z", 14.0, "Fog");
    server.seed("Delhi", "2024-01-02T06:00:00Z", 15.0, "Fog");
    server.seed("Delhi", "2024-01-03T06:00:00Z", 16.0, "Clear");
    server.seed("Mumbai", "2024-01-02T06:00:00Z", 30.0, "Haze");

    let body = server
        .summary("/weather_summary?city=Delhi&from=2024-01-02&to=2024-01-03")
        .await;
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-03"]);

    let mumbai = server.summary("/weather_summary?city=Mumbai").await;
    assert_eq!(mumbai.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn inverted_range_is_empty_success() {
    let server = TestServer::start().await;
    server.seed("Delhi", "2024-01-02T06:00:00Z", 15.0, "Fog");

    let body = server
        .summary("/weather_summary?from=2024-01-05&to=2024-01-01")
        .await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn malformed_date_is_bad_request() {
    let server = TestServer::start().await;
    let resp = server.get("/weather_summary?from=yesterday").await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn store_failure_returns_500_not_empty_list() {
    let server = TestServer::start_with(Arc::new(OfflineStore), "http://127.0.0.1:1", None).await;

    let resp = server.get("/weather_summary").await;
    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Failed to fetch weather summary" }));
}

#[tokio::test]
async fn repeated_queries_are_identical() {
    let server = TestServer::start().await;
    for (i, temp) in [0.1, 0.2, 0.3, 0.7].into_iter().enumerate() {
        server.seed("Delhi", &format!("2024-01-01T0{i}:00:00Z"), temp, "Clear");
    }

    let first = server.get("/weather_summary").await.text().await.unwrap();
    let second = server.get("/weather_summary").await.text().await.unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Status endpoint and static assets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_configuration_and_counts() {
    let server = TestServer::start().await;
    server.seed("Delhi", "2024-01-01T06:00:00Z", 14.0, "Fog");

    let resp = server.get("/api/status").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["poll_interval_secs"], 300);
    assert_eq!(body["cities"], json!(server.config.collector.cities));
    assert_eq!(body["scheduler_state"], "idle");
    assert_eq!(body["cycles_fired"], 0);
    assert_eq!(body["cycles_skipped"], 0);
    assert_eq!(body["reading_count"], 1);
}

#[tokio::test]
async fn status_with_offline_store_is_500() {
    let server = TestServer::start_with(Arc::new(OfflineStore), "http://127.0.0.1:1", None).await;
    let resp = server.get("/api/status").await;
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn static_assets_are_served_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Weather</h1>").unwrap();

    let db = Database::open(":memory:").unwrap();
    let server = TestServer::start_with(Arc::new(db), "http://127.0.0.1:1", Some(dir.path())).await;

    let resp = server.get("/index.html").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<h1>Weather</h1>");

    // API routes still win over the fallback
    let summary = server.summary("/weather_summary").await;
    assert_eq!(summary, json!([]));
}

#[tokio::test]
async fn unknown_path_without_static_dir_is_404() {
    let server = TestServer::start().await;
    let resp = server.get("/index.html").await;
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Collection through the real provider client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collected_readings_show_up_in_summary() {
    let mut upstream = Server::new_async().await;
    let _delhi = upstream
        .mock("GET", "/data/2.5/weather")
        .match_query(Matcher::UrlEncoded("q".into(), "Delhi".into()))
        .with_status(200)
        .with_body(owm_body(295.15, "Clear"))
        .create_async()
        .await;
    let _mumbai = upstream
        .mock("GET", "/data/2.5/weather")
        .match_query(Matcher::UrlEncoded("q".into(), "Mumbai".into()))
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let db: Arc<dyn ReadingStore> = Arc::new(Database::open(":memory:").unwrap());
    let server = TestServer::start_with(Arc::clone(&db), &upstream.url(), None).await;

    let provider = Arc::new(OpenWeatherMapClient::new(&server.config.provider).unwrap());
    let collector = Collector::new(provider, Arc::clone(&db), Duration::from_secs(2));

    // the cycle may straddle midnight
    let day_before = DayBoundary::default().day_of(chrono::Utc::now()).to_string();
    let report = collector.run_cycle(&server.config.collector.cities).await;
    let day_after = DayBoundary::default().day_of(chrono::Utc::now()).to_string();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let body = server.summary("/weather_summary").await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["city"], "Delhi");
    assert_eq!(rows[0]["dominant_condition"], "Clear");
    assert!((rows[0]["avg_temp"].as_f64().unwrap() - 22.0).abs() < 1e-9);
    assert_eq!(db.reading_count(Some("Mumbai")).unwrap(), 0);

    let date = rows[0]["date"].as_str().unwrap();
    assert!(
        date == day_before || date == day_after,
        "unexpected date {date}"
    );
}

//! Axum router construction.
//!
//! The [`app`] function wires the exporter endpoints to their handlers and
//! returns a ready-to-serve [`axum::Router`].  Endpoint paths come from the
//! `web` configuration section.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::HEALTH_PATH;
use crate::handlers::{discovery::discovery, index::index, probe::probe};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`] with all exporter routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let web = &state.config.web;

    let mut router = Router::new()
        .route("/", get(index))
        .route(HEALTH_PATH, get(health_check))
        .route(&web.probe_path, get(probe))
        .route(&web.discovery_path, get(discovery));

    if state.config.observability.metrics {
        router = router
            .route(&web.metrics_path, get(metrics_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                metrics_middleware,
            ));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -- Health check ------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::client::{ListedItem, ListingClient, Page};
    use crate::storage::memory::MemoryClient;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    fn state_with(client: MemoryClient, config: Config) -> (Arc<AppState>, Arc<MemoryClient>) {
        let memory = Arc::new(client);
        let shared: Arc<dyn ListingClient> = memory.clone();
        (
            Arc::new(AppState {
                config,
                client: shared,
            }),
            memory,
        )
    }

    fn item(key: &str, size: u64, hour: u32, is_latest: Option<bool>) -> ListedItem {
        ListedItem {
            key: key.to_string(),
            last_modified: Utc.with_ymd_and_hms(2019, 6, 13, hour, 0, 0).unwrap(),
            size,
            storage_class: Some("STANDARD".to_string()),
            is_latest,
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("host", "exporter:9340")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// The sample line for `name`, for the target whose prefix is `prefix`.
    fn line<'a>(body: &'a str, name: &str, prefix: &str) -> Option<&'a str> {
        let prefix_label = format!("prefix=\"{prefix}\"");
        body.lines().find(|l| {
            l.starts_with(&format!("{name}{{")) && l.contains(&prefix_label)
        })
    }

    fn value(line: &str) -> f64 {
        line.rsplit(' ').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state_with(MemoryClient::new(), Config::default());
        let (status, body) = get_body(app(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_index_links_probe() {
        let (state, _) = state_with(MemoryClient::new(), Config::default());
        let (status, body) = get_body(app(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/probe?bucket=BUCKET"));
    }

    #[tokio::test]
    async fn test_probe_missing_bucket_makes_no_storage_call() {
        let (state, memory) = state_with(MemoryClient::new(), Config::default());
        let (status, body) = get_body(app(state), "/probe?prefix=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("bucket parameter is missing"));
        assert_eq!(memory.calls(), 0);
    }

    #[tokio::test]
    async fn test_probe_one_object() {
        let client = MemoryClient::new().with_objects(
            "mock",
            "one",
            vec![Page {
                items: vec![item("one", 1234, 21, None)],
                common_prefixes: Vec::new(),
            }],
        );
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(app(state), "/probe?bucket=mock&prefix=one").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value(line(&body, "s3_list_success", "one").unwrap()), 1.0);
        assert_eq!(value(line(&body, "s3_objects", "one").unwrap()), 1.0);
        assert_eq!(
            value(line(&body, "s3_objects_size_sum_bytes", "one").unwrap()),
            1234.0
        );
        assert_eq!(
            value(line(&body, "s3_biggest_object_size_bytes", "one").unwrap()),
            1234.0
        );
        assert_eq!(
            value(line(&body, "s3_last_modified_object_date", "one").unwrap()),
            1_560_459_600.0
        );
        assert!(line(&body, "s3_list_duration_seconds", "one").is_some());
        assert!(line(&body, "s3_common_prefixes", "one").is_none());
    }

    #[tokio::test]
    async fn test_probe_prefix_with_form_encoded_space() {
        let client = MemoryClient::new().with_objects(
            "mock",
            "my dir/",
            vec![Page {
                items: vec![item("my dir/a", 42, 21, None)],
                common_prefixes: Vec::new(),
            }],
        );
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(app(state), "/probe?bucket=mock&prefix=my+dir%2F").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value(line(&body, "s3_list_success", "my dir/").unwrap()), 1.0);
        assert_eq!(
            value(line(&body, "s3_objects_size_sum_bytes", "my dir/").unwrap()),
            42.0
        );
        assert!(!body.contains("my+dir"));
    }

    #[tokio::test]
    async fn test_probe_common_prefixes() {
        let client = MemoryClient::new().with_objects(
            "mock",
            "mock-prefix",
            vec![Page {
                items: Vec::new(),
                common_prefixes: vec!["one".into(), "two".into(), "three".into()],
            }],
        );
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(
            app(state),
            "/probe?bucket=mock&prefix=mock-prefix&delimiter=%2F",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let prefixes = line(&body, "s3_common_prefixes", "mock-prefix").unwrap();
        assert!(prefixes.contains("delimiter=\"/\""));
        assert_eq!(value(prefixes), 3.0);
        assert!(line(&body, "s3_objects", "mock-prefix").is_none());
        assert!(line(&body, "s3_objects_size_sum_bytes", "mock-prefix").is_none());
    }

    #[tokio::test]
    async fn test_probe_versions_count_every_version() {
        let client = MemoryClient::new().with_versions(
            "mock-versioned",
            "two-versions",
            vec![Page {
                items: vec![
                    item("one", 2345, 20, Some(false)),
                    item("one", 1234, 21, Some(true)),
                ],
                common_prefixes: Vec::new(),
            }],
        );
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(
            app(state),
            "/probe?bucket=mock-versioned&prefix=two-versions&versions=true",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let p = "two-versions";
        assert_eq!(value(line(&body, "s3_objects", p).unwrap()), 2.0);
        assert_eq!(
            value(line(&body, "s3_objects_size_sum_bytes", p).unwrap()),
            3579.0
        );
        assert_eq!(
            value(line(&body, "s3_biggest_object_size_bytes", p).unwrap()),
            2345.0
        );
        assert_eq!(
            value(line(&body, "s3_last_modified_object_size_bytes", p).unwrap()),
            1234.0
        );
    }

    #[tokio::test]
    async fn test_probe_versions_from_config_flag() {
        let client = MemoryClient::new().with_versions(
            "mock-versioned",
            "none",
            vec![Page::default()],
        );
        let mut config = Config::default();
        config.s3.list_object_versions = true;
        let (state, _) = state_with(client, config);
        let (_, body) = get_body(app(state), "/probe?bucket=mock-versioned&prefix=none").await;

        assert_eq!(value(line(&body, "s3_list_success", "none").unwrap()), 1.0);
        assert_eq!(value(line(&body, "s3_objects", "none").unwrap()), 0.0);
        assert_eq!(
            value(line(&body, "s3_last_modified_object_date", "none").unwrap()),
            0.0
        );
    }

    #[tokio::test]
    async fn test_probe_failure_reports_only_success_zero() {
        let page = Page {
            items: vec![item("a", 10, 1, None)],
            common_prefixes: Vec::new(),
        };
        let client = MemoryClient::new()
            .with_objects("mock", "broken", vec![page.clone(), page.clone(), page])
            .failing_at("mock", "broken", 1);
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(app(state), "/probe?bucket=mock&prefix=broken").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value(line(&body, "s3_list_success", "broken").unwrap()), 0.0);
        assert!(line(&body, "s3_list_duration_seconds", "broken").is_none());
        assert!(line(&body, "s3_objects", "broken").is_none());
        assert!(line(&body, "s3_objects_size_sum_bytes", "broken").is_none());
    }

    #[tokio::test]
    async fn test_discovery() {
        let client = MemoryClient::new().with_buckets(&["alpha", "beta"]);
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(app(state), "/discovery").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let groups = json.as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["targets"][0], "exporter:9340");
        assert_eq!(groups[1]["labels"]["__param_bucket"], "beta");
    }

    #[tokio::test]
    async fn test_discovery_failure() {
        let client = MemoryClient::new().failing_list_buckets();
        let (state, _) = state_with(client, Config::default());
        let (status, body) = get_body(app(state), "/discovery").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("error listing buckets"));
    }

    #[tokio::test]
    async fn test_custom_probe_path() {
        let mut config = Config::default();
        config.web.probe_path = "/s3".to_string();
        config.observability.metrics = false;
        let (state, _) = state_with(MemoryClient::new(), config);

        let (status, _) = get_body(app(state.clone()), "/probe?bucket=x").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // An unscripted scope fails its listing but still answers 200.
        let (status, body) = get_body(app(state.clone()), "/s3?bucket=x").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("s3_list_success"));

        let (status, _) = get_body(app(state), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

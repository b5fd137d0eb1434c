//! `GET /discovery` -- Prometheus HTTP service discovery.
//!
//! Returns one target group per visible bucket, pointing back at this
//! exporter with `__param_bucket` set so Prometheus probes each bucket.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::debug;

use crate::errors::ExporterError;
use crate::AppState;

/// One HTTP SD target group.
#[derive(Debug, Serialize, PartialEq)]
pub struct DiscoveryTarget {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Build a target group per non-empty bucket name, all addressed at `host`.
pub fn discovery_targets(host: &str, buckets: &[String]) -> Vec<DiscoveryTarget> {
    buckets
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| DiscoveryTarget {
            targets: vec![host.to_string()],
            labels: BTreeMap::from([("__param_bucket".to_string(), name.clone())]),
        })
        .collect()
}

/// Discovery endpoint handler.
pub async fn discovery(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ExporterError> {
    let buckets = state
        .client
        .list_buckets()
        .await
        .map_err(ExporterError::ListBuckets)?;

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let targets = discovery_targets(host, &buckets);
    debug!("Discovered {} buckets", targets.len());

    let body = serde_json::to_string(&targets).map_err(anyhow::Error::from)?;

    Ok((
        StatusCode::OK,
        [("content-type", "application/json")],
        body,
    )
        .into_response())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_skip_empty_names() {
        let buckets = vec!["logs".to_string(), String::new(), "backups".to_string()];
        let targets = discovery_targets("exporter:9340", &buckets);

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].targets, vec!["exporter:9340"]);
        assert_eq!(
            targets[1].labels.get("__param_bucket").map(String::as_str),
            Some("backups")
        );
    }

    #[test]
    fn test_json_shape() {
        let targets = discovery_targets("h:1", &["b".to_string()]);
        let json = serde_json::to_string(&targets).unwrap();
        assert_eq!(
            json,
            r#"[{"targets":["h:1"],"labels":{"__param_bucket":"b"}}]"#
        );
    }

    #[test]
    fn test_no_buckets_is_empty_array() {
        let json = serde_json::to_string(&discovery_targets("h", &[])).unwrap();
        assert_eq!(json, "[]");
    }
}

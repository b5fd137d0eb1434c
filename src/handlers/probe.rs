//! `GET /probe` -- list a bucket and report its statistics.
//!
//! Query parameters:
//!
//! - `bucket` (required unless `s3.bucket` is configured)
//! - `prefix`, or `prefixes` as a comma-separated list
//! - `delimiter`: switches to common-prefix counting
//! - `storageclass`: only count objects of this storage class
//! - `versions`: `true`/`false`, overrides `s3.list_object_versions`

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::parse_query;
use crate::config::S3Config;
use crate::errors::ExporterError;
use crate::metrics::{render_samples, EXPOSITION_CONTENT_TYPE};
use crate::probe::lister::ListingMode;
use crate::probe::{probe_all, ProbeTarget};
use crate::AppState;

/// A fully resolved probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub targets: Vec<ProbeTarget>,
    pub mode: ListingMode,
}

fn non_empty<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn split_prefixes(list: &str) -> Vec<String> {
    list.split(',').map(|p| p.to_string()).collect()
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ExporterError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ExporterError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    }
}

impl ProbeRequest {
    /// Merge query parameters with the static defaults from `s3`.
    ///
    /// Query values win over configured ones. Fails before any storage call
    /// when no bucket can be determined.
    pub fn resolve(
        query: &HashMap<String, String>,
        s3: &S3Config,
    ) -> Result<Self, ExporterError> {
        let bucket = match non_empty(query, "bucket") {
            Some(b) => {
                debug!("Use provided bucket in query {b}");
                b.to_string()
            }
            None if !s3.bucket.is_empty() => {
                debug!("Use statically set bucket {}", s3.bucket);
                s3.bucket.clone()
            }
            None => return Err(ExporterError::MissingBucket),
        };

        let prefixes = if let Some(list) = non_empty(query, "prefixes") {
            split_prefixes(list)
        } else if let Some(prefix) = non_empty(query, "prefix") {
            vec![prefix.to_string()]
        } else if !s3.prefixes.is_empty() {
            split_prefixes(&s3.prefixes)
        } else {
            vec![String::new()]
        };

        let delimiter = query.get("delimiter").cloned().unwrap_or_default();

        let storage_class = non_empty(query, "storageclass")
            .map(|s| s.to_string())
            .or_else(|| (!s3.storage_class.is_empty()).then(|| s3.storage_class.clone()));

        let versions = match non_empty(query, "versions") {
            Some(v) => parse_bool("versions", v)?,
            None => s3.list_object_versions,
        };

        let targets = prefixes
            .into_iter()
            .map(|prefix| ProbeTarget {
                bucket: bucket.clone(),
                prefix,
                delimiter: delimiter.clone(),
                storage_class: storage_class.clone(),
            })
            .collect();

        Ok(Self {
            targets,
            mode: ListingMode::from_flag(versions),
        })
    }
}

/// Probe endpoint handler.
pub async fn probe(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ExporterError> {
    let query = parse_query(raw_query);
    let request = ProbeRequest::resolve(&query, &state.config.s3)?;

    let samples = probe_all(state.client.clone(), &request.targets, request.mode).await;
    let body = render_samples(&samples);

    Ok((
        StatusCode::OK,
        [("content-type", EXPOSITION_CONTENT_TYPE)],
        body,
    )
        .into_response())
}

// -- Tests -------------------------------------------------------------------

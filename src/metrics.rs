//! Prometheus metrics for the exporter.
//!
//! Two kinds of output live here:
//!
//! - Process metrics (probe counts, HTTP RED metrics, build info) go to the
//!   global recorder installed by [`init_metrics`] and are served on the
//!   metrics path.
//! - Probe samples are written to a throwaway recorder per request by
//!   [`render_samples`], so each scrape of the probe path only ever shows
//!   the targets it asked for.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::extract::{MatchedPath, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Label,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::errors::ExporterError;
use crate::probe::report::Sample;
use crate::AppState;

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// -- Probe metric names -------------------------------------------------------

/// Whether the listing succeeded (gauge, 1/0).
pub const S3_LIST_SUCCESS: &str = "s3_list_success";

/// Total duration of the listing in seconds (gauge).
pub const S3_LIST_DURATION: &str = "s3_list_duration_seconds";

/// Unix time of the most recently modified object (gauge).
pub const S3_LAST_MODIFIED_DATE: &str = "s3_last_modified_object_date";

/// Size of the most recently modified object (gauge).
pub const S3_LAST_MODIFIED_SIZE: &str = "s3_last_modified_object_size_bytes";

/// Number of objects (gauge).
pub const S3_OBJECTS: &str = "s3_objects";

/// Sum of all object sizes (gauge).
pub const S3_SUM_SIZE: &str = "s3_objects_size_sum_bytes";

/// Size of the biggest object (gauge).
pub const S3_BIGGEST_SIZE: &str = "s3_biggest_object_size_bytes";

/// Number of common prefixes (gauge).
pub const S3_COMMON_PREFIXES: &str = "s3_common_prefixes";

// -- Process metric names -----------------------------------------------------

/// Build information (gauge, always 1). Labels: version.
pub const BUILD_INFO: &str = "s3_exporter_build_info";

/// Probes run (counter). Labels: mode, result.
pub const PROBES_TOTAL: &str = "s3_exporter_probes_total";

/// Probe listing duration in seconds (histogram). Labels: mode.
pub const PROBE_DURATION_SECONDS: &str = "s3_exporter_probe_duration_seconds";

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "s3_exporter_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "s3_exporter_http_request_duration_seconds";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times (e.g. in tests). Returns a reference to the global handle.
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register process metric descriptions with the global recorder and set
/// the build info gauge. Call once after `init_metrics()`.
pub fn describe_metrics() {
    describe_gauge!(BUILD_INFO, "Build information of the exporter");
    describe_counter!(PROBES_TOTAL, "Total probes by listing mode and result");
    describe_histogram!(
        PROBE_DURATION_SECONDS,
        "Duration of probe listings in seconds"
    );
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    gauge!(BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

fn describe_probe_metrics() {
    describe_gauge!(S3_LIST_SUCCESS, "If the list operation was a success");
    describe_gauge!(S3_LIST_DURATION, "The total duration of the list operation");
    describe_gauge!(
        S3_LAST_MODIFIED_DATE,
        "The last modified date of the object that was modified most recently"
    );
    describe_gauge!(
        S3_LAST_MODIFIED_SIZE,
        "The size of the object that was modified most recently"
    );
    describe_gauge!(
        S3_OBJECTS,
        "The total number of objects for the bucket/prefix combination"
    );
    describe_gauge!(S3_SUM_SIZE, "The total size of all objects summed");
    describe_gauge!(S3_BIGGEST_SIZE, "The size of the biggest object");
    describe_gauge!(
        S3_COMMON_PREFIXES,
        "A count of all the keys between the prefix and the next occurrence of the string specified by the delimiter"
    );
}

// -- Probe rendering ------------------------------------------------------------

/// Render probe samples in the Prometheus text format.
///
/// Uses a fresh recorder scoped to this call; nothing leaks into the global
/// recorder or into other probes.
pub fn render_samples(samples: &[Sample]) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        describe_probe_metrics();
        for sample in samples {
            let labels: Vec<Label> = sample
                .labels
                .iter()
                .map(|(k, v)| Label::new(*k, v.clone()))
                .collect();
            gauge!(sample.name, labels).set(sample.value);
        }
    });

    handle.render()
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes the metrics path from self-instrumentation to avoid feedback
/// loops.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    if req.uri().path() == state.config.web.metrics_path {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = route_label(req.extensions().get::<MatchedPath>().map(|m| m.as_str()));

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Metric label for a request path.
///
/// Only routed paths are used verbatim; anything else collapses into one
/// label so random URLs cannot blow up cardinality.
fn route_label(matched: Option<&str>) -> String {
    matched.unwrap_or("unmatched").to_string()
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render process metrics in Prometheus text format.
pub async fn metrics_handler() -> Result<Response, ExporterError> {
    let handle = PROMETHEUS_HANDLE.get().ok_or_else(|| {
        ExporterError::Internal(anyhow::anyhow!("Prometheus recorder not initialized"))
    })?;
    Ok((
        StatusCode::OK,
        [("content-type", EXPOSITION_CONTENT_TYPE)],
        handle.render(),
    )
        .into_response())
}

// -- Tests --------------------------------------------------------------------

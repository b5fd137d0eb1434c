//! `GET /` -- landing page.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::config::WebConfig;
use crate::AppState;

/// Render the landing page linking every endpoint.
pub fn landing_page(web: &WebConfig) -> String {
    format!(
        r#"<html>
<head><title>S3 Exporter</title></head>
<body>
<h1>S3 Exporter</h1>
<p><a href="{probe}?bucket=BUCKET&prefix=PREFIX">Query metrics for objects in BUCKET that match PREFIX</a></p>
<p><a href="{metrics}">Metrics</a></p>
<p><a href="{discovery}">Service Discovery</a></p>
</body>
</html>
"#,
        probe = web.probe_path,
        metrics = web.metrics_path,
        discovery = web.discovery_path,
    )
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(landing_page(&state.config.web))
}

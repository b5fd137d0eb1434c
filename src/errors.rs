//! Request-level error types.
//!
//! Listing failures inside a probe are not errors at this level: they are
//! reported as `s3_list_success 0`.  What remains are input errors and
//! failures of the non-probe endpoints.  The enum implements
//! [`axum::response::IntoResponse`] so handlers can return it directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// No bucket in the request and none configured.
    #[error("bucket parameter is missing")]
    MissingBucket,

    /// A query parameter could not be understood.
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: &'static str, value: String },

    /// Bucket discovery failed.
    #[error("error listing buckets")]
    ListBuckets(#[source] anyhow::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ExporterError {
    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExporterError::MissingBucket => StatusCode::BAD_REQUEST,
            ExporterError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ExporterError::ListBuckets(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExporterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self {
                ExporterError::ListBuckets(e) | ExporterError::Internal(e) => {
                    tracing::error!("{self}: {e:#}")
                }
                _ => tracing::error!("{self}"),
            }
        }

        (
            status,
            [("content-type", "text/plain; charset=utf-8")],
            format!("{self}\n"),
        )
            .into_response()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ExporterError::MissingBucket.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExporterError::ListBuckets(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ExporterError::MissingBucket.to_string(),
            "bucket parameter is missing"
        );
        let err = ExporterError::InvalidParameter {
            name: "versions",
            value: "maybe".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value 'maybe' for parameter 'versions'"
        );
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let err = ExporterError::Internal(anyhow::anyhow!("secret detail"));
        assert_eq!(err.to_string(), "internal error");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

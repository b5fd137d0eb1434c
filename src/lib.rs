//! s3-exporter library -- Prometheus probe for S3 bucket listings.
//!
//! On each probe request the exporter lists a bucket/prefix (optionally
//! grouped by a delimiter, filtered by storage class, or across every object
//! version), aggregates the result in a single pass, and renders the totals
//! in the Prometheus exposition format.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod probe;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::storage::client::ListingClient;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Exporter configuration.
    pub config: Config,
    /// Listing client shared by every concurrent probe.
    pub client: Arc<dyn ListingClient>,
}

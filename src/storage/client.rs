//! Abstract object-listing client.
//!
//! Every listing backend must implement [`ListingClient`].  The trait
//! speaks in terms of plain Rust records so the probe engine never touches
//! SDK types, and so tests can script responses page by page.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every [`ListingClient`] operation.
pub type ListingFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// One object or object-version record from a listing response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedItem {
    /// Object key. Not unique across versions.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
    /// Storage class as reported by the server (e.g. `STANDARD`).
    pub storage_class: Option<String>,
    /// Whether this is the current version. Only set by version listings.
    pub is_latest: Option<bool>,
}

/// One page of listing results, without its continuation cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Objects (or versions) in server order.
    pub items: Vec<ListedItem>,
    /// Common prefixes folded by the delimiter.
    pub common_prefixes: Vec<String>,
}

/// The (bucket, prefix, delimiter) tuple a listing is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListScope {
    pub bucket: String,
    pub prefix: String,
    /// Empty means no delimiter.
    pub delimiter: String,
}

/// Response to a "list current objects" call.
#[derive(Debug, Clone, Default)]
pub struct ObjectsResponse {
    pub page: Page,
    /// Present iff more pages remain.
    pub next_continuation_token: Option<String>,
}

/// Paired markers that resume a version listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMarkers {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// Response to a "list object versions" call.
#[derive(Debug, Clone, Default)]
pub struct VersionsResponse {
    pub page: Page,
    pub is_truncated: bool,
    /// Markers to echo back on the next call.
    pub next: VersionMarkers,
}

/// Object-storage listing contract.
///
/// Implementations must be safe to share between concurrent probes.
pub trait ListingClient: Send + Sync + 'static {
    /// List current objects, resuming from `continuation_token` if given.
    fn list_objects<'a>(
        &'a self,
        scope: &'a ListScope,
        continuation_token: Option<String>,
    ) -> ListingFuture<'a, ObjectsResponse>;

    /// List every version of every key, resuming from `markers`.
    fn list_object_versions<'a>(
        &'a self,
        scope: &'a ListScope,
        markers: VersionMarkers,
    ) -> ListingFuture<'a, VersionsResponse>;

    /// Names of all buckets visible to the configured credentials.
    fn list_buckets(&self) -> ListingFuture<'_, Vec<String>>;
}

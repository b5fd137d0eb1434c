//! In-memory listing client.
//!
//! Serves pre-scripted pages keyed by `(bucket, prefix)`, with optional
//! failure injection at a given page.  Cursors are page indexes rendered as
//! strings, which makes it easy to check that a caller echoes back exactly
//! what it was handed.  Used by the probe and router tests, and handy for
//! running the exporter locally without an object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::client::{
    ListScope, ListingClient, ListingFuture, ObjectsResponse, Page, VersionMarkers,
    VersionsResponse,
};

/// A scripted listing: its pages plus an optional failing page index.
#[derive(Debug, Clone, Default)]
struct Listing {
    pages: Vec<Page>,
    fail_at: Option<usize>,
}

/// Scripted in-memory [`ListingClient`].
#[derive(Debug, Default)]
pub struct MemoryClient {
    /// (bucket, prefix) -> pages served by `list_objects`.
    objects: HashMap<(String, String), Listing>,
    /// (bucket, prefix) -> pages served by `list_object_versions`.
    versions: HashMap<(String, String), Listing>,
    /// Bucket names for `list_buckets`. `None` makes the call fail.
    buckets: Option<Vec<String>>,
    /// Total listing calls served (including failed ones).
    calls: AtomicUsize,
}

impl MemoryClient {
    /// Create an empty client. `list_buckets` returns an empty list.
    pub fn new() -> Self {
        Self {
            buckets: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Script the current-object pages for `bucket`/`prefix`.
    pub fn with_objects(mut self, bucket: &str, prefix: &str, pages: Vec<Page>) -> Self {
        self.objects.insert(
            (bucket.to_string(), prefix.to_string()),
            Listing {
                pages,
                fail_at: None,
            },
        );
        self
    }

    /// Script the object-version pages for `bucket`/`prefix`.
    pub fn with_versions(mut self, bucket: &str, prefix: &str, pages: Vec<Page>) -> Self {
        self.versions.insert(
            (bucket.to_string(), prefix.to_string()),
            Listing {
                pages,
                fail_at: None,
            },
        );
        self
    }

    /// Make the request for page `index` (0-based) of `bucket`/`prefix` fail,
    /// in both listing modes.
    pub fn failing_at(mut self, bucket: &str, prefix: &str, index: usize) -> Self {
        let key = (bucket.to_string(), prefix.to_string());
        for map in [&mut self.objects, &mut self.versions] {
            if let Some(listing) = map.get_mut(&key) {
                listing.fail_at = Some(index);
            }
        }
        self
    }

    /// Set the bucket names returned by `list_buckets`.
    pub fn with_buckets(mut self, buckets: &[&str]) -> Self {
        self.buckets = Some(buckets.iter().map(|b| b.to_string()).collect());
        self
    }

    /// Make `list_buckets` fail.
    pub fn failing_list_buckets(mut self) -> Self {
        self.buckets = None;
        self
    }

    /// Number of listing calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn page(
        map: &HashMap<(String, String), Listing>,
        scope: &ListScope,
        index: usize,
    ) -> anyhow::Result<(Page, bool)> {
        let listing = map
            .get(&(scope.bucket.clone(), scope.prefix.clone()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no listing for bucket '{}' and prefix '{}'",
                    scope.bucket,
                    scope.prefix
                )
            })?;

        if listing.fail_at == Some(index) {
            anyhow::bail!("injected failure on page {index}");
        }

        // An unscripted listing still answers its first page, empty.
        let page = match listing.pages.get(index) {
            Some(page) => page.clone(),
            None if index == 0 => Page::default(),
            None => anyhow::bail!("page {index} out of range"),
        };
        let more = index + 1 < listing.pages.len();
        Ok((page, more))
    }
}

fn parse_index(cursor: Option<&str>) -> anyhow::Result<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid cursor '{c}'")),
    }
}

impl ListingClient for MemoryClient {
    fn list_objects<'a>(
        &'a self,
        scope: &'a ListScope,
        continuation_token: Option<String>,
    ) -> ListingFuture<'a, ObjectsResponse> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = parse_index(continuation_token.as_deref())?;
            let (page, more) = Self::page(&self.objects, scope, index)?;
            Ok(ObjectsResponse {
                page,
                next_continuation_token: more.then(|| (index + 1).to_string()),
            })
        })
    }

    fn list_object_versions<'a>(
        &'a self,
        scope: &'a ListScope,
        markers: VersionMarkers,
    ) -> ListingFuture<'a, VersionsResponse> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = parse_index(markers.key_marker.as_deref())?;
            if index > 0 && markers.version_id_marker != Some(format!("v{index}")) {
                anyhow::bail!(
                    "version-id marker {:?} does not pair with key marker {index}",
                    markers.version_id_marker
                );
            }
            let (page, more) = Self::page(&self.versions, scope, index)?;
            let next = if more {
                VersionMarkers {
                    key_marker: Some((index + 1).to_string()),
                    version_id_marker: Some(format!("v{}", index + 1)),
                }
            } else {
                VersionMarkers::default()
            };
            Ok(VersionsResponse {
                page,
                is_truncated: more,
                next,
            })
        })
    }

    fn list_buckets(&self) -> ListingFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.buckets
                .clone()
                .ok_or_else(|| anyhow::anyhow!("injected list_buckets failure"))
        })
    }
}

// -- Tests -------------------------------------------------------------------

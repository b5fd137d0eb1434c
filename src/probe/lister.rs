//! Pagination strategies.
//!
//! A [`Lister`] yields the pages of one listing in order. The two
//! implementations differ only in their cursor protocol:
//!
//! - [`ObjectLister`] echoes back a single continuation token and stops once
//!   the server returns none.
//! - [`VersionLister`] echoes back a key marker and a version-id marker as a
//!   pair and stops once the server reports the result is not truncated.

use std::sync::Arc;

use tracing::{debug, warn};

use super::aggregate::Aggregate;
use crate::storage::client::{ListScope, ListingClient, ListingFuture, Page, VersionMarkers};

/// Which listing call a probe drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Current objects only.
    Objects,
    /// Every version of every key.
    Versions,
}

impl ListingMode {
    pub fn from_flag(list_object_versions: bool) -> Self {
        if list_object_versions {
            ListingMode::Versions
        } else {
            ListingMode::Objects
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingMode::Objects => "objects",
            ListingMode::Versions => "versions",
        }
    }
}

/// Yields the pages of one listing, in server order.
pub trait Lister: Send {
    /// Fetch the next page. `Ok(None)` once the listing is exhausted; after
    /// an error the lister must not be polled again.
    fn next_page(&mut self) -> ListingFuture<'_, Option<Page>>;
}

/// Build the lister for `mode`.
pub fn lister_for(
    mode: ListingMode,
    client: Arc<dyn ListingClient>,
    scope: ListScope,
) -> Box<dyn Lister> {
    match mode {
        ListingMode::Objects => Box::new(ObjectLister::new(client, scope)),
        ListingMode::Versions => Box::new(VersionLister::new(client, scope)),
    }
}

// -- Current objects ---------------------------------------------------------

/// Cursor position of an [`ObjectLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenCursor {
    Start,
    Resume(String),
    Done,
}

/// Lists current objects, following continuation tokens.
pub struct ObjectLister {
    client: Arc<dyn ListingClient>,
    scope: ListScope,
    cursor: TokenCursor,
}

impl ObjectLister {
    pub fn new(client: Arc<dyn ListingClient>, scope: ListScope) -> Self {
        Self {
            client,
            scope,
            cursor: TokenCursor::Start,
        }
    }
}

impl Lister for ObjectLister {
    fn next_page(&mut self) -> ListingFuture<'_, Option<Page>> {
        Box::pin(async move {
            let token = match std::mem::replace(&mut self.cursor, TokenCursor::Done) {
                TokenCursor::Done => return Ok(None),
                TokenCursor::Start => None,
                TokenCursor::Resume(token) => Some(token),
            };

            let resp = self.client.list_objects(&self.scope, token).await?;
            if let Some(next) = resp.next_continuation_token {
                self.cursor = TokenCursor::Resume(next);
            }
            Ok(Some(resp.page))
        })
    }
}

// -- Object versions ---------------------------------------------------------

/// Cursor position of a [`VersionLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkerCursor {
    Start,
    Resume(VersionMarkers),
    Done,
}

/// Lists every object version, following paired key/version-id markers.
pub struct VersionLister {
    client: Arc<dyn ListingClient>,
    scope: ListScope,
    cursor: MarkerCursor,
}

impl VersionLister {
    pub fn new(client: Arc<dyn ListingClient>, scope: ListScope) -> Self {
        Self {
            client,
            scope,
            cursor: MarkerCursor::Start,
        }
    }
}

impl Lister for VersionLister {
    fn next_page(&mut self) -> ListingFuture<'_, Option<Page>> {
        Box::pin(async move {
            let markers = match std::mem::replace(&mut self.cursor, MarkerCursor::Done) {
                MarkerCursor::Done => return Ok(None),
                MarkerCursor::Start => VersionMarkers::default(),
                MarkerCursor::Resume(markers) => markers,
            };

            let resp = self
                .client
                .list_object_versions(&self.scope, markers)
                .await?;

            if resp.is_truncated {
                if resp.next.key_marker.is_some() {
                    self.cursor = MarkerCursor::Resume(resp.next);
                } else {
                    // Resuming without a key marker would restart the listing.
                    warn!(
                        bucket = %self.scope.bucket,
                        prefix = %self.scope.prefix,
                        "Truncated version listing returned no key marker, stopping"
                    );
                }
            }
            Ok(Some(resp.page))
        })
    }
}

// -- Driver ------------------------------------------------------------------

/// Drive `lister` to exhaustion, folding every page into a fresh aggregate.
///
/// Returns on the first error without a partial result.
pub async fn drain(
    lister: &mut dyn Lister,
    storage_class: Option<&str>,
) -> anyhow::Result<Aggregate> {
    let mut aggregate = Aggregate::default();
    let mut pages = 0usize;

    while let Some(page) = lister.next_page().await? {
        pages += 1;
        debug!(
            page = pages,
            items = page.items.len(),
            common_prefixes = page.common_prefixes.len(),
            "Folding listing page"
        );
        aggregate.fold(&page, storage_class);
    }

    Ok(aggregate)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::{ListedItem, ListingFuture, ObjectsResponse, VersionsResponse};
    use crate::storage::memory::MemoryClient;
    use chrono::{TimeZone, Utc};

    fn scope(bucket: &str, prefix: &str) -> ListScope {
        ListScope {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            delimiter: String::new(),
        }
    }

    fn sized(sizes: &[u64]) -> Page {
        Page {
            items: sizes
                .iter()
                .enumerate()
                .map(|(i, s)| ListedItem {
                    key: format!("k{i}"),
                    last_modified: Utc.timestamp_opt(1_000 + i as i64, 0).unwrap(),
                    size: *s,
                    storage_class: Some("STANDARD".to_string()),
                    is_latest: Some(true),
                })
                .collect(),
            common_prefixes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_object_lister_walks_all_pages() {
        let client: Arc<dyn ListingClient> = Arc::new(MemoryClient::new().with_objects(
            "b",
            "p",
            vec![sized(&[1, 2]), sized(&[3]), sized(&[4])],
        ));
        let mut lister = ObjectLister::new(client, scope("b", "p"));

        let agg = drain(&mut lister, None).await.unwrap();
        assert_eq!(agg.object_count, 4);
        assert_eq!(agg.total_size_bytes, 10);

        // Exhausted listers stay exhausted.
        assert!(lister.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_lister_echoes_marker_pair() {
        let memory = Arc::new(MemoryClient::new().with_versions(
            "b",
            "",
            vec![sized(&[5]), sized(&[6]), sized(&[7])],
        ));
        let client: Arc<dyn ListingClient> = memory.clone();
        let mut lister = VersionLister::new(client, scope("b", ""));

        let agg = drain(&mut lister, None).await.unwrap();
        assert_eq!(agg.object_count, 3);
        assert_eq!(agg.total_size_bytes, 18);
        assert_eq!(memory.calls(), 3);
    }

    #[tokio::test]
    async fn test_error_on_second_page_aborts() {
        let memory = Arc::new(
            MemoryClient::new()
                .with_objects("b", "", vec![sized(&[1]), sized(&[2]), sized(&[3])])
                .failing_at("b", "", 1),
        );
        let client: Arc<dyn ListingClient> = memory.clone();
        let mut lister = lister_for(ListingMode::Objects, client, scope("b", ""));

        assert!(drain(lister.as_mut(), None).await.is_err());
        // No third request after the failure.
        assert_eq!(memory.calls(), 2);
    }

    #[tokio::test]
    async fn test_filter_does_not_stop_pagination() {
        let client: Arc<dyn ListingClient> = Arc::new(MemoryClient::new().with_objects(
            "b",
            "",
            vec![sized(&[1]), sized(&[2])],
        ));
        let mut lister = ObjectLister::new(client, scope("b", ""));
        let agg = drain(&mut lister, Some("GLACIER")).await.unwrap();
        assert_eq!(agg, Aggregate::default());
    }

    /// Claims truncation forever but never hands out a key marker.
    struct StuckVersions;

    impl ListingClient for StuckVersions {
        fn list_objects<'a>(
            &'a self,
            _scope: &'a ListScope,
            _token: Option<String>,
        ) -> ListingFuture<'a, ObjectsResponse> {
            Box::pin(async { anyhow::bail!("unused") })
        }

        fn list_object_versions<'a>(
            &'a self,
            _scope: &'a ListScope,
            _markers: VersionMarkers,
        ) -> ListingFuture<'a, VersionsResponse> {
            Box::pin(async {
                Ok(VersionsResponse {
                    page: sized(&[9]),
                    is_truncated: true,
                    next: VersionMarkers::default(),
                })
            })
        }

        fn list_buckets(&self) -> ListingFuture<'_, Vec<String>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn test_truncated_without_marker_terminates() {
        let mut lister = VersionLister::new(Arc::new(StuckVersions), scope("b", ""));
        let agg = drain(&mut lister, None).await.unwrap();
        assert_eq!(agg.object_count, 1);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(ListingMode::from_flag(true), ListingMode::Versions);
        assert_eq!(ListingMode::from_flag(false).as_str(), "objects");
    }
}

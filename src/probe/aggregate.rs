//! Running statistics over a listing.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::storage::client::Page;

/// Per-probe accumulator, folded one page at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Number of counted items.
    pub object_count: u64,
    /// Sum of counted item sizes.
    pub total_size_bytes: u64,
    /// Largest counted item size, 0 if none.
    pub biggest_size_bytes: u64,
    /// Timestamp of the most recently modified counted item.
    /// `None` until an item has been counted.
    pub last_modified: Option<DateTime<Utc>>,
    /// Size of the item `last_modified` belongs to.
    pub last_modified_size_bytes: u64,
    /// Common prefixes seen across all pages.
    pub common_prefix_count: u64,
}

impl Aggregate {
    /// Fold one page into the running totals.
    ///
    /// Items whose storage class differs from `storage_class` are skipped
    /// entirely. An item with no storage class never matches a filter.
    /// Common prefixes are always counted.
    ///
    /// Only a strictly later timestamp replaces `last_modified`, so on an
    /// exact tie the item seen first wins.
    pub fn fold(&mut self, page: &Page, storage_class: Option<&str>) {
        for item in &page.items {
            if let Some(wanted) = storage_class {
                if item.storage_class.as_deref() != Some(wanted) {
                    trace!(
                        "Filter out {}: {:?} != {}",
                        item.key,
                        item.storage_class,
                        wanted
                    );
                    continue;
                }
            }

            self.object_count += 1;
            self.total_size_bytes += item.size;
            self.biggest_size_bytes = self.biggest_size_bytes.max(item.size);

            let is_later = match self.last_modified {
                None => true,
                Some(current) => item.last_modified > current,
            };
            if is_later {
                self.last_modified = Some(item.last_modified);
                self.last_modified_size_bytes = item.size;
            }
        }

        self.common_prefix_count += page.common_prefixes.len() as u64;
    }

    /// `last_modified` as Unix seconds, 0 when nothing was counted.
    pub fn last_modified_unix(&self) -> i64 {
        self.last_modified.map(|t| t.timestamp()).unwrap_or(0)
    }
}

// -- Tests -------------------------------------------------------------------

//! Listing aggregation engine.
//!
//! A probe lists one (bucket, prefix, delimiter) scope to completion,
//! folding every page into an [`aggregate::Aggregate`], and turns the result
//! into gauge samples. Every probe owns its lister and aggregate outright;
//! the only thing shared between concurrent probes is the listing client.

pub mod aggregate;
pub mod lister;
pub mod report;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{error, info};

use crate::metrics::{PROBES_TOTAL, PROBE_DURATION_SECONDS};
use crate::storage::client::{ListScope, ListingClient};
use aggregate::Aggregate;
use lister::{drain, lister_for, ListingMode};

/// One scope to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub bucket: String,
    pub prefix: String,
    /// Empty means no delimiter.
    pub delimiter: String,
    /// Storage class filter.
    pub storage_class: Option<String>,
}

impl ProbeTarget {
    /// A non-empty delimiter switches the probe to common-prefix counting.
    pub fn has_delimiter(&self) -> bool {
        !self.delimiter.is_empty()
    }

    fn scope(&self) -> ListScope {
        ListScope {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            delimiter: self.delimiter.clone(),
        }
    }
}

/// Result of probing one target.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The listing ran to completion.
    Listed {
        aggregate: Aggregate,
        /// Wall-clock time from the first request to the last page.
        duration: Duration,
    },
    /// A listing call failed. Nothing accumulated before the failure is kept.
    Failed,
}

/// List `target` to completion and summarize it.
///
/// Listing errors are logged and folded into [`ProbeOutcome::Failed`]; they
/// never propagate to the caller.
pub async fn run_probe(
    client: Arc<dyn ListingClient>,
    target: &ProbeTarget,
    mode: ListingMode,
) -> ProbeOutcome {
    info!(
        bucket = %target.bucket,
        prefix = %target.prefix,
        delimiter = %target.delimiter,
        storage_class = target.storage_class.as_deref().unwrap_or_default(),
        mode = mode.as_str(),
        "Probing"
    );

    let mut lister = lister_for(mode, client, target.scope());
    let start = Instant::now();
    let result = drain(lister.as_mut(), target.storage_class.as_deref()).await;
    let duration = start.elapsed();

    histogram!(PROBE_DURATION_SECONDS, "mode" => mode.as_str()).record(duration.as_secs_f64());

    match result {
        Ok(aggregate) => {
            counter!(PROBES_TOTAL, "mode" => mode.as_str(), "result" => "success").increment(1);
            info!(
                bucket = %target.bucket,
                prefix = %target.prefix,
                objects = aggregate.object_count,
                common_prefixes = aggregate.common_prefix_count,
                seconds = duration.as_secs_f64(),
                "Listing complete"
            );
            ProbeOutcome::Listed {
                aggregate,
                duration,
            }
        }
        Err(e) => {
            counter!(PROBES_TOTAL, "mode" => mode.as_str(), "result" => "failure").increment(1);
            error!(
                bucket = %target.bucket,
                prefix = %target.prefix,
                "Listing failed: {e:#}"
            );
            ProbeOutcome::Failed
        }
    }
}

/// Probe each target in turn and collect every sample.
///
/// Targets are independent: a failing target reports its own failure and
/// the rest are still probed.
pub async fn probe_all(
    client: Arc<dyn ListingClient>,
    targets: &[ProbeTarget],
    mode: ListingMode,
) -> Vec<report::Sample> {
    let mut samples = Vec::new();
    for target in targets {
        let outcome = run_probe(client.clone(), target, mode).await;
        samples.extend(report::samples(target, &outcome));
    }
    samples
}

// -- Tests -------------------------------------------------------------------

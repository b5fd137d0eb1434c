//! Converting a finished probe into gauge samples.
//!
//! The sample set depends on the probe mode:
//!
//! | outcome            | samples                                               |
//! |--------------------|-------------------------------------------------------|
//! | failed             | `s3_list_success` = 0                                 |
//! | ok, no delimiter   | success, duration, object count/size family           |
//! | ok, delimiter      | success, duration, `s3_common_prefixes`               |

use crate::metrics::{
    S3_BIGGEST_SIZE, S3_COMMON_PREFIXES, S3_LAST_MODIFIED_DATE, S3_LAST_MODIFIED_SIZE,
    S3_LIST_DURATION, S3_LIST_SUCCESS, S3_OBJECTS, S3_SUM_SIZE,
};

use super::{ProbeOutcome, ProbeTarget};

/// One labeled gauge observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Sample {
    fn new(name: &'static str, labels: &[(&'static str, String)], value: f64) -> Self {
        Self {
            name,
            labels: labels.to_vec(),
            value,
        }
    }

    /// Value of label `key`, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn storage_class_label(target: &ProbeTarget) -> String {
    target.storage_class.clone().unwrap_or_default()
}

fn listing_labels(target: &ProbeTarget) -> Vec<(&'static str, String)> {
    vec![
        ("bucket", target.bucket.clone()),
        ("prefix", target.prefix.clone()),
        ("delimiter", target.delimiter.clone()),
        ("storage_class", storage_class_label(target)),
    ]
}

fn object_labels(target: &ProbeTarget) -> Vec<(&'static str, String)> {
    vec![
        ("bucket", target.bucket.clone()),
        ("prefix", target.prefix.clone()),
        ("storage_class", storage_class_label(target)),
    ]
}

fn prefix_labels(target: &ProbeTarget) -> Vec<(&'static str, String)> {
    vec![
        ("bucket", target.bucket.clone()),
        ("prefix", target.prefix.clone()),
        ("delimiter", target.delimiter.clone()),
    ]
}

/// Shape the samples for one probed target.
pub fn samples(target: &ProbeTarget, outcome: &ProbeOutcome) -> Vec<Sample> {
    let listing = listing_labels(target);

    let (aggregate, duration) = match outcome {
        ProbeOutcome::Failed => return vec![Sample::new(S3_LIST_SUCCESS, &listing, 0.0)],
        ProbeOutcome::Listed {
            aggregate,
            duration,
        } => (aggregate, duration),
    };

    let mut out = vec![
        Sample::new(S3_LIST_SUCCESS, &listing, 1.0),
        Sample::new(S3_LIST_DURATION, &listing, duration.as_secs_f64()),
    ];

    if target.has_delimiter() {
        out.push(Sample::new(
            S3_COMMON_PREFIXES,
            &prefix_labels(target),
            aggregate.common_prefix_count as f64,
        ));
    } else {
        let labels = object_labels(target);
        out.extend([
            Sample::new(
                S3_LAST_MODIFIED_DATE,
                &labels,
                aggregate.last_modified_unix() as f64,
            ),
            Sample::new(
                S3_LAST_MODIFIED_SIZE,
                &labels,
                aggregate.last_modified_size_bytes as f64,
            ),
            Sample::new(S3_OBJECTS, &labels, aggregate.object_count as f64),
            Sample::new(S3_BIGGEST_SIZE, &labels, aggregate.biggest_size_bytes as f64),
            Sample::new(S3_SUM_SIZE, &labels, aggregate.total_size_bytes as f64),
        ]);
    }

    out
}

// -- Tests -------------------------------------------------------------------

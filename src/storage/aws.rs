//! AWS S3 listing client.
//!
//! Wraps the AWS SDK for Rust and translates `ListObjectsV2`,
//! `ListObjectVersions` and `ListBuckets` responses into the plain records
//! defined in [`super::client`].
//!
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.) unless a static key
//! pair is configured.

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::client::{
    ListScope, ListedItem, ListingClient, ListingFuture, ObjectsResponse, Page, VersionMarkers,
    VersionsResponse,
};
use crate::config::S3Config;

/// Listing client backed by the AWS SDK.
///
/// The SDK client is internally reference counted and safe to share, so a
/// single instance serves every concurrent probe.
pub struct AwsListingClient {
    client: Client,
}

impl AwsListingClient {
    /// Build a client from the `s3` configuration section.
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            config_loader = config_loader.endpoint_url(&config.endpoint_url);
        }

        // If explicit credentials are provided, inject them as static credentials.
        if !config.access_key_id.is_empty() && !config.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None, // session_token
                None, // expiry
                "s3-exporter-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            region = %config.region,
            endpoint = %config.endpoint_url,
            force_path_style = config.force_path_style,
            "AWS S3 listing client initialized"
        );

        Ok(Self { client })
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error<E>(context: &str, err: E) -> anyhow::Error
    where
        E: std::error::Error,
    {
        anyhow::anyhow!("AWS S3 {context}: {}", DisplayErrorContext(err))
    }
}

/// Convert an SDK timestamp, falling back to the Unix epoch if out of range.
fn to_utc(t: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    t.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}

fn to_size(size: Option<i64>) -> u64 {
    size.unwrap_or(0).max(0) as u64
}

fn convert_object(obj: &aws_sdk_s3::types::Object) -> ListedItem {
    ListedItem {
        key: obj.key().unwrap_or_default().to_string(),
        last_modified: to_utc(obj.last_modified()),
        size: to_size(obj.size()),
        storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
        is_latest: None,
    }
}

fn convert_version(v: &aws_sdk_s3::types::ObjectVersion) -> ListedItem {
    ListedItem {
        key: v.key().unwrap_or_default().to_string(),
        last_modified: to_utc(v.last_modified()),
        size: to_size(v.size()),
        storage_class: v.storage_class().map(|c| c.as_str().to_string()),
        is_latest: v.is_latest(),
    }
}

fn convert_prefixes(prefixes: &[aws_sdk_s3::types::CommonPrefix]) -> Vec<String> {
    prefixes
        .iter()
        .map(|p| p.prefix().unwrap_or_default().to_string())
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl ListingClient for AwsListingClient {
    fn list_objects<'a>(
        &'a self,
        scope: &'a ListScope,
        continuation_token: Option<String>,
    ) -> ListingFuture<'a, ObjectsResponse> {
        Box::pin(async move {
            debug!(
                "AWS list_objects_v2: bucket={} prefix='{}' delimiter='{}' resume={}",
                scope.bucket,
                scope.prefix,
                scope.delimiter,
                continuation_token.is_some()
            );

            let resp = self
                .client
                .list_objects_v2()
                .bucket(&scope.bucket)
                .prefix(&scope.prefix)
                .set_delimiter(non_empty(&scope.delimiter))
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_objects_v2", e))?;

            Ok(ObjectsResponse {
                page: Page {
                    items: resp.contents().iter().map(convert_object).collect(),
                    common_prefixes: convert_prefixes(resp.common_prefixes()),
                },
                next_continuation_token: resp.next_continuation_token().map(|s| s.to_string()),
            })
        })
    }

    fn list_object_versions<'a>(
        &'a self,
        scope: &'a ListScope,
        markers: VersionMarkers,
    ) -> ListingFuture<'a, VersionsResponse> {
        Box::pin(async move {
            debug!(
                "AWS list_object_versions: bucket={} prefix='{}' delimiter='{}' key_marker={:?}",
                scope.bucket, scope.prefix, scope.delimiter, markers.key_marker
            );

            let resp = self
                .client
                .list_object_versions()
                .bucket(&scope.bucket)
                .prefix(&scope.prefix)
                .set_delimiter(non_empty(&scope.delimiter))
                .set_key_marker(markers.key_marker)
                .set_version_id_marker(markers.version_id_marker)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_object_versions", e))?;

            Ok(VersionsResponse {
                page: Page {
                    items: resp.versions().iter().map(convert_version).collect(),
                    common_prefixes: convert_prefixes(resp.common_prefixes()),
                },
                is_truncated: resp.is_truncated().unwrap_or(false),
                next: VersionMarkers {
                    key_marker: resp.next_key_marker().map(|s| s.to_string()),
                    version_id_marker: resp.next_version_id_marker().map(|s| s.to_string()),
                },
            })
        })
    }

    fn list_buckets(&self) -> ListingFuture<'_, Vec<String>> {
        Box::pin(async move {
            debug!("AWS list_buckets");

            let resp = self
                .client
                .list_buckets()
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_buckets", e))?;

            Ok(resp
                .buckets()
                .iter()
                .filter_map(|b| b.name())
                .map(|n| n.to_string())
                .collect())
        })
    }
}

// -- Tests -------------------------------------------------------------------

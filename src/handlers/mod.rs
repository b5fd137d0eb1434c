//! HTTP handlers.
//!
//! Handlers are thin: they turn query parameters into probe targets and
//! hand them to [`crate::probe`], or enumerate buckets for discovery.

pub mod discovery;
pub mod index;
pub mod probe;

use std::collections::HashMap;

/// Decode one form-encoded query component: `+` is a space, then
/// percent escapes are resolved.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_encoding::percent_decode_str(&spaced)
        .decode_utf8_lossy()
        .into_owned()
}

/// Parse an `application/x-www-form-urlencoded` query string into a map.
///
/// Later occurrences of a key win. A bare key maps to an empty value.
pub(crate) fn parse_query(raw: Option<String>) -> HashMap<String, String> {
    raw.as_deref()
        .unwrap_or_default()
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

//! Deterministic URL to storage-path derivation.
//!
//! The mapping must stay stable: ledger rows reference paths produced here,
//! so any change orphans previously recorded downloads.

use std::path::PathBuf;

use url::Url;

/// Replace every character that is not alphanumeric, `-`, `_`, or `.`
/// with `_`.
pub fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the relative storage path for a URL.
///
/// The host (plus `:port` when explicit) is sanitized and split on `.` into
/// leading directories; the URL path is split on `/` into trailing
/// directories, each segment percent-decoded and sanitized. The query string
/// never participates.
pub fn path_from_url(url: &str) -> Result<PathBuf, url::ParseError> {
    let parsed = Url::parse(url)?;

    let netloc = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut path = PathBuf::new();
    for label in sanitize_component(&netloc).split('.') {
        path.push(label);
    }

    // Url::path() is percent-encoded; decode per segment so an encoded
    // space sanitizes to `_`, not `_20`.
    let trimmed = parsed.path().trim_matches('/');
    if !trimmed.is_empty() {
        for segment in trimmed.split('/') {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            path.push(sanitize_component(&decoded));
        }
    }

    Ok(path)
}

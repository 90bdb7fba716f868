//! URI helpers for EVE-NG API paths
//!
//! Labs are addressed by a filesystem-like path (`Folder/My Lab`), stored on
//! the server as `Folder/My Lab.unl`.

use chrono::Utc;

/// Percent-encode a lab path segment by segment, keeping `/` separators
///
/// Leading/trailing slashes are dropped and a trailing `.unl` is removed so
/// callers may pass either `lab` or `lab.unl`.
#[must_use]
pub fn encode_lab_path(project_path: &str) -> String {
    let trimmed = project_path.trim().trim_matches('/');
    let trimmed = trimmed.strip_suffix(".unl").unwrap_or(trimmed);

    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// API-relative URI of a lab resource: `labs/{path}.unl{suffix}`
#[must_use]
pub fn lab_uri(project_path: &str, suffix: &str) -> String {
    format!("labs/{}.unl{}", encode_lab_path(project_path), suffix)
}

/// API-relative URI of one node's action
#[must_use]
pub fn node_action_uri(project_path: &str, node_id: u64, action_path: &str) -> String {
    lab_uri(project_path, &format!("/nodes/{node_id}/{action_path}"))
}

/// Current wall-clock time in milliseconds, used only to defeat caches
#[must_use]
pub fn cache_buster() -> i64 {
    Utc::now().timestamp_millis()
}

/// Append the `_={millis}` cache-busting parameter to a URL
#[must_use]
pub fn with_cache_buster(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={millis}")
}

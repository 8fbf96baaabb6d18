//! Slash-separated node paths.

use crate::error::{StoreError, StoreResult};

/// Characters a path segment may not contain.
const RESERVED: &[char] = &['.', '#', '$', '[', ']'];

/// Splits `path` into its segments.
///
/// Leading, trailing and repeated slashes are ignored, so `""` and `"/"`
/// both address the root.
pub fn segments(path: &str) -> StoreResult<Vec<String>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.contains(RESERVED) || segment.chars().any(char::is_control) {
                Err(StoreError::InvalidPath(format!(
                    "segment {segment:?} of {path:?} contains a reserved character"
                )))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

/// Normalizes `path` to `a/b/c` form (no leading or trailing slash).
pub fn normalize(path: &str) -> StoreResult<String> {
    Ok(segments(path)?.join("/"))
}

/// Joins a parent path and a child key.
pub fn child(parent: &str, key: &str) -> String {
    let parent = parent.trim_matches('/');
    let key = key.trim_matches('/');
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

//! Request path canonicalization.
//!
//! Rules are matched against the canonical form of the request path, and
//! the request is forwarded with that same path. The canonical form is the
//! percent-decoded path with empty and `.` segments dropped and `..`
//! segments resolved. `..` never climbs above the root.

/// Canonical, decoded form of `raw`.
///
/// Returns `None` when the decoded path is not UTF-8 or contains control
/// characters. A trailing `/` (also one implied by a final `.` or `..`) is
/// kept.
pub fn canonicalize_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.chars().any(char::is_control) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut canonical = String::with_capacity(decoded.len());
    for segment in &segments {
        canonical.push('/');
        canonical.push_str(segment);
    }

    let trailing_slash =
        decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..");
    if canonical.is_empty() || trailing_slash {
        canonical.push('/');
    }

    Some(canonical)
}

/// Percent-encode a canonical path segment by segment for the request line.
pub fn encode_path(canonical: &str) -> String {
    canonical
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

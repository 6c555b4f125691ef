use std::borrow::Cow;

/// Canonical form of a tag used as the cache key suffix: percent-decoded,
/// trimmed and lowercased. Decoding failure falls back to the raw string.
///
/// The empty string is never a legal key suffix; callers must reject it.
pub fn normalize_tag(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    decoded.trim().to_lowercase()
}

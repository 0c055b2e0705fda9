//! URL handling for fetch interception.
//!
//! Asset-list entries and intercepted request URLs may be relative
//! (`./index.html`) or absolute; relative forms resolve against the
//! configured scope. Scheme classification decides whether a request is
//! intercepted at all, and origin comparison is the recorded validity
//! condition for caching a response.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a relative or absolute URL against the agent's scope.
///
/// Absolute URLs pass through unchanged (cross-origin asset-list entries
/// such as CDN stylesheets stay on their own origin). Fragments are
/// dropped so request identity never varies by anchor.
pub fn resolve(scope: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = scope.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);

    Ok(resolved)
}

/// Whether a URL uses a scheme the agent intercepts.
///
/// Extension-internal and other non-web schemes (`chrome-extension:`,
/// `data:`, `file:`) are left to default network behavior.
pub fn is_web_scheme(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Whether two URLs share an origin (scheme + host + port).
///
/// A response is only snapshotted when its URL is same-origin with the
/// agent's scope; cross-origin responses are served unmodified and never
/// cached.
pub fn same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

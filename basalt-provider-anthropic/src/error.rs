//! Internal error helpers for mapping HTTP/reqwest errors to [`ProviderError`].

use basalt_types::ProviderError;

/// Map an HTTP status code (from the Anthropic API) to a [`ProviderError`].
///
/// Reference: <https://docs.anthropic.com/en/api/errors>
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str, retry_after_secs: Option<u64>) -> ProviderError {
    match status.as_u16() {
        401 => ProviderError::Authentication(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        413 => ProviderError::InsufficientResources(body.to_string()),
        429 => ProviderError::RateLimit { retry_after_secs },
        // 529 is Anthropic's overloaded status.
        529 => ProviderError::ServiceUnavailable,
        500..=528 | 530..=599 => ProviderError::ServiceUnavailable,
        _ => ProviderError::InvalidRequest(format!("HTTP {status}: {body}")),
    }
}

/// Parse a `Retry-After` header value (seconds, Anthropic never sends the
/// HTTP-date form) into the delay `map_http_status` attaches to a 429.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?.parse().ok()
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

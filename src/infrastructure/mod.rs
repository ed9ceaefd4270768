//! Outbound HTTP executors for the two remote protocols.

pub mod graphql_client;
pub mod rest_client;

pub use graphql_client::GraphqlClient;
pub use rest_client::RestClient;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::RequestBuilder;
use serde_json::Value;
use url::Url;

use crate::config::AuthConfig;
use crate::error::{AdapterError, Result};

/// Wait hint used when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 5;

pub const USER_AGENT: &str = concat!("protocol-bridge/", env!("CARGO_PKG_VERSION"));

/// Parse a caller-supplied endpoint, naming the config field on failure.
pub fn parse_endpoint(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AdapterError::validation(field, format!("is not a valid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AdapterError::validation(
            field,
            format!("has unsupported scheme '{}'", other),
        )),
    }
}

/// Check that `auth` can be sent as HTTP headers, naming the config field
/// (`targetAuth.token`, `targetAuth.extraHeaders`) on failure.
pub fn validate_auth(field: &str, auth: &AuthConfig) -> Result<()> {
    HeaderValue::from_str(&format!("Bearer {}", auth.token)).map_err(|_| {
        AdapterError::validation(
            format!("{}.token", field),
            "contains characters not allowed in an HTTP header",
        )
    })?;

    let extra_field = format!("{}.extraHeaders", field);
    for (name, value) in &auth.extra_headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            AdapterError::validation(
                extra_field.as_str(),
                format!("'{}' is not a valid header name", name.escape_debug()),
            )
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            AdapterError::validation(
                extra_field.as_str(),
                format!("value of '{}' is not a valid header value", name),
            )
        })?;
    }
    Ok(())
}

/// Seconds to wait according to `Retry-After`.
///
/// Accepts delta-seconds or an HTTP date; anything else falls back to
/// [`DEFAULT_RETRY_AFTER_SECONDS`].
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    let Some(raw) = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()) else {
        return DEFAULT_RETRY_AFTER_SECONDS;
    };
    let raw = raw.trim();

    if let Ok(seconds) = raw.parse::<u64>() {
        return seconds;
    }
    match chrono::DateTime::parse_from_rfc2822(raw) {
        Ok(at) => (at.with_timezone(&chrono::Utc) - chrono::Utc::now())
            .num_seconds()
            .max(0) as u64,
        Err(_) => DEFAULT_RETRY_AFTER_SECONDS,
    }
}

pub fn rate_limit_error(headers: &HeaderMap) -> AdapterError {
    AdapterError::rate_limited(parse_retry_after(headers))
}

fn apply_extra_headers(request: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    auth.extra_headers
        .iter()
        .fold(request, |request, (name, value)| request.header(name.as_str(), value.as_str()))
}

/// Response text as JSON: empty is null, non-JSON text is kept as a string.
fn body_to_value(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(parse_retry_after(&headers("12")), 12);
        assert_eq!(parse_retry_after(&headers(" 0 ")), 0);
    }

    #[test]
    fn test_retry_after_defaults() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), DEFAULT_RETRY_AFTER_SECONDS);
        assert_eq!(parse_retry_after(&headers("soon")), DEFAULT_RETRY_AFTER_SECONDS);
        assert_eq!(parse_retry_after(&headers("-3")), DEFAULT_RETRY_AFTER_SECONDS);
    }

    #[test]
    fn test_retry_after_past_http_date_is_zero() {
        assert_eq!(parse_retry_after(&headers("Wed, 21 Oct 2015 07:28:00 GMT")), 0);
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("targetEndpoint", "https://api.example.test/v1").is_ok());
        let err = parse_endpoint("targetEndpoint", "not a url").unwrap_err();
        assert!(matches!(err, AdapterError::ValidationError { ref field, .. } if field == "targetEndpoint"));
        assert!(parse_endpoint("sourceEndpoint", "ftp://files.example.test").is_err());
    }

    #[test]
    fn test_validate_auth_accepts_plain_headers() {
        let auth = AuthConfig::new("shpat_token").with_header("X-Request-Source", "bridge");
        assert!(validate_auth("targetAuth", &auth).is_ok());
    }

    #[test]
    fn test_validate_auth_rejects_bad_header_name() {
        let auth = AuthConfig::new("shpat_token").with_header("Bad Header\n", "v");
        let err = validate_auth("targetAuth", &auth).unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, AdapterError::ValidationError { ref field, .. } if field == "targetAuth.extraHeaders"));
    }

    #[test]
    fn test_validate_auth_rejects_bad_header_value() {
        let auth = AuthConfig::new("shpat_token").with_header("X-Trace", "line\r\nbreak");
        let err = validate_auth("sourceAuth", &auth).unwrap_err();
        assert!(matches!(err, AdapterError::ValidationError { ref field, .. } if field == "sourceAuth.extraHeaders"));
    }

    #[test]
    fn test_validate_auth_rejects_control_character_in_token() {
        let err = validate_auth("targetAuth", &AuthConfig::new("tok\nen")).unwrap_err();
        assert!(matches!(err, AdapterError::ValidationError { ref field, .. } if field == "targetAuth.token"));
    }

    #[test]
    fn test_body_to_value() {
        assert_eq!(body_to_value(""), Value::Null);
        assert_eq!(body_to_value("{\"id\":1}"), json!({"id": 1}));
        assert_eq!(body_to_value("accepted"), json!("accepted"));
    }
}

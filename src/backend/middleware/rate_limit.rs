/**
 * Rate-Limit Middleware
 *
 * Wraps a route group in admission control against one limiter instance.
 * Rejected requests get HTTP 429 with a JSON body, the standard rate
 * headers, and `Retry-After`; accepted requests are forwarded and their
 * responses decorated with the same rate headers.
 *
 * # Identifier extraction
 *
 * Caller identity is derived from forwarded-address headers in priority
 * order: `x-forwarded-for` (first hop), `x-real-ip`, `cf-connecting-ip`.
 * Unidentifiable callers all share the `"unknown"` bucket, which throttles
 * them collectively rather than not at all.
 */

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::backend::realtime::{RateLimitDecision, SlidingWindowLimiter};

/// Derive the rate-limit identifier for a request
pub fn client_identifier(headers: &HeaderMap) -> String {
    // x-forwarded-for may carry a proxy chain; the first hop is the client
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    for header in ["x-real-ip", "cf-connecting-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    "unknown".to_string()
}

/// Admission-control middleware against one limiter instance
///
/// Used via `middleware::from_fn` with the limiter captured per route
/// group, so each protected surface keeps its own policy and state.
pub async fn with_rate_limit(
    limiter: Arc<SlidingWindowLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let identifier = client_identifier(request.headers());
    let now = Instant::now();
    let decision = limiter.check_at(&identifier, now);

    if !decision.allowed {
        let retry_after = decision.retry_after(now);
        tracing::warn!(
            "[RateLimit] Rejected '{}' (blocked={}, retry in {}s)",
            identifier,
            decision.blocked,
            retry_after.as_secs()
        );
        let message = if decision.blocked {
            "Temporarily blocked after repeated rate limit violations"
        } else {
            "Rate limit exceeded"
        };
        let body = serde_json::json!({
            "error": message,
            "status": StatusCode::TOO_MANY_REQUESTS.as_u16(),
        });
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
        apply_rate_headers(response.headers_mut(), &decision, now);
        response
            .headers_mut()
            .insert("Retry-After", number_header(retry_after.as_secs()));
        return response;
    }

    let mut response = next.run(request).await;
    apply_rate_headers(response.headers_mut(), &decision, now);
    response
}

fn apply_rate_headers(headers: &mut HeaderMap, decision: &RateLimitDecision, now: Instant) {
    headers.insert("X-RateLimit-Limit", number_header(decision.limit as u64));
    headers.insert(
        "X-RateLimit-Remaining",
        number_header(decision.remaining as u64),
    );
    headers.insert(
        "X-RateLimit-Reset",
        number_header(unix_seconds(decision.reset_at, now)),
    );
}

/// Project a monotonic deadline onto the wall clock as unix seconds
fn unix_seconds(at: Instant, now: Instant) -> u64 {
    let delta = at.saturating_duration_since(now);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|epoch| (epoch + delta).as_secs())
        .unwrap_or(0)
}

fn number_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or(HeaderValue::from_static("0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_wins_and_takes_first_hop() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.2, 10.0.0.3"),
            ("x-real-ip", "198.51.100.4"),
            ("cf-connecting-ip", "192.0.2.1"),
        ]);
        assert_eq!(client_identifier(&map), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_before_cdn_header() {
        let map = headers(&[
            ("x-real-ip", "198.51.100.4"),
            ("cf-connecting-ip", "192.0.2.1"),
        ]);
        assert_eq!(client_identifier(&map), "198.51.100.4");

        let map = headers(&[("cf-connecting-ip", "192.0.2.1")]);
        assert_eq!(client_identifier(&map), "192.0.2.1");
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
        // Empty values do not count as an identity
        let map = headers(&[("x-forwarded-for", " ")]);
        assert_eq!(client_identifier(&map), "unknown");
    }

    #[test]
    fn test_unix_seconds_projection() {
        let now = Instant::now();
        let epoch_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let projected = unix_seconds(now + std::time::Duration::from_secs(60), now);
        assert!(projected >= epoch_now + 59 && projected <= epoch_now + 61);
    }
}

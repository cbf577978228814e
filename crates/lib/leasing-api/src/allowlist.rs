//! Host and origin allow-listing for every HTTP route.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::uri::Authority;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header, request::Parts};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Hosts accepted when none are configured explicitly.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "localhost",
    "localhost:*",
    "127.0.0.1",
    "127.0.0.1:*",
    "[::1]",
    "[::1]:*",
];

/// Origins accepted when none are configured explicitly.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:*",
    "http://127.0.0.1",
    "http://127.0.0.1:*",
    "http://[::1]",
    "http://[::1]:*",
];

/// Compiled `*`-wildcard patterns. An empty list accepts everything.
#[derive(Debug, Clone, Default)]
pub struct GlobList {
    patterns: Vec<Regex>,
}

impl GlobList {
    /// Compiles each non-blank pattern; matching ignores ASCII case.
    ///
    /// # Errors
    /// Returns `regex::Error` if a pattern cannot be compiled.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| Regex::new(&format!("(?i)^{}$", glob_to_regex_body(pattern))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|pattern| pattern.is_match(value))
    }
}

fn glob_to_regex_body(pattern: &str) -> String {
    let mut escaped = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' => escaped.push_str(".*"),
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Allowed `Host` and `Origin` values.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    hosts: GlobList,
    origins: GlobList,
}

impl AllowList {
    /// # Errors
    /// Returns `regex::Error` if a pattern cannot be compiled.
    pub fn new<S: AsRef<str>>(hosts: &[S], origins: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            hosts: GlobList::new(hosts)?,
            origins: GlobList::new(origins)?,
        })
    }

    #[must_use]
    pub fn host_allowed(&self, host: Option<&str>) -> bool {
        self.hosts.is_empty() || host.is_some_and(|host| self.hosts.matches(host))
    }

    /// Requests without an `Origin` header are not cross-origin and always pass.
    #[must_use]
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        origin.is_none_or(|origin| self.origins.matches(origin))
    }
}

/// CORS policy mirroring the origin allow-list.
#[must_use]
pub fn cors_layer(allow: &Arc<AllowList>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("last-event-id"),
            HeaderName::from_static("mcp-session-id"),
            HeaderName::from_static("mcp-protocol-version"),
        ])
        .expose_headers([HeaderName::from_static("mcp-session-id")])
        .max_age(Duration::from_secs(3600));

    if allow.origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let allow = Arc::clone(allow);
    cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .is_ok_and(|origin| allow.origins.matches(origin))
        },
    ))
}

/// Rejects requests whose `Host` (421) or `Origin` (403) is not allowed.
pub async fn enforce(
    State(allow): State<Arc<AllowList>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(Authority::as_str));
    if !allow.host_allowed(host) {
        warn!(host = host.unwrap_or_default(), "rejected request for disallowed host");
        return (StatusCode::MISDIRECTED_REQUEST, "Host not allowed").into_response();
    }

    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|value| value.to_str().unwrap_or_default());
    if !allow.origin_allowed(origin) {
        warn!(origin = origin.unwrap_or_default(), "rejected request from disallowed origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globs_match_whole_values_case_insensitively() {
        let list = GlobList::new(&["127.0.0.1:*", "*.onrender.com"]).unwrap();
        assert!(list.matches("127.0.0.1:8000"));
        assert!(list.matches("Leasing.OnRender.com"));
        assert!(!list.matches("127.0.0.10"));
        assert!(!list.matches("evil.com"));
        assert!(!list.matches("onrender.com.evil.com"));
    }

    #[test]
    fn empty_lists_disable_checks() {
        let allow = AllowList::new::<&str>(&[], &[]).unwrap();
        assert!(allow.host_allowed(None));
        assert!(allow.host_allowed(Some("anything:1")));
        assert!(allow.origin_allowed(Some("https://anywhere.example")));
    }

    #[test]
    fn defaults_cover_loopback() {
        let allow = AllowList::new(DEFAULT_ALLOWED_HOSTS, DEFAULT_ALLOWED_ORIGINS).unwrap();
        assert!(allow.host_allowed(Some("localhost:8000")));
        assert!(allow.host_allowed(Some("[::1]:8000")));
        assert!(!allow.host_allowed(Some("example.com")));
        assert!(!allow.host_allowed(None));
        assert!(allow.origin_allowed(None));
        assert!(allow.origin_allowed(Some("http://127.0.0.1:5173")));
        assert!(!allow.origin_allowed(Some("https://example.com")));
    }

    #[test]
    fn blank_patterns_are_ignored() {
        let list = GlobList::new(&["", "  "]).unwrap();
        assert!(list.is_empty());
    }
}

use std::{collections::HashSet, time::Instant};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{warn, Instrument};

use crate::{
    logging::{ErrorContext, LogRecord, Severity},
    AppState,
};

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("log whitelist configuration value is missing")]
    Missing,
}

/// Set of endpoints eligible for request/response logging, parsed once at
/// startup from a comma-separated list of `METHODPATH` tokens such as
/// `GET/health,POST/orders`. Matching is case-insensitive; an empty set means
/// nothing is logged.
#[derive(Debug, Clone, Default)]
pub struct EndpointWhitelist {
    entries: HashSet<String>,
}

impl EndpointWhitelist {
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(|token| token.trim().to_ascii_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        Self { entries }
    }

    /// Build the whitelist from an optional configuration value. A missing
    /// value is an error for the bootstrap to warn about; lookups against the
    /// resulting default (empty) whitelist fail closed.
    pub fn from_config(value: Option<&str>) -> Result<Self, WhitelistError> {
        match value {
            Some(raw) => Ok(Self::parse(raw)),
            None => Err(WhitelistError::Missing),
        }
    }

    pub fn contains(&self, method: &Method, path: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let key = format!("{method}{path}").to_ascii_lowercase();
        self.entries.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First path segment, used to tag all log events of one request with the
/// service it addressed. `/orders/42` yields `orders`; `/` yields none.
pub fn service_id(path: &str) -> Option<&str> {
    path.split('/').nth(1).filter(|segment| !segment.is_empty())
}

/// Request/response logging middleware.
///
/// Whitelisted requests have both bodies buffered and replayed so that the
/// continuation and the client observe exactly the bytes they would have seen
/// without interception, and exactly one structured record is written to the
/// sink after the continuation completes. Everything else passes through
/// untouched.
pub async fn log_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.whitelist.contains(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query_parameters = request
        .uri()
        .query()
        .map(|query| format!("?{query}"))
        .unwrap_or_default();
    let error_context = ErrorContext::capture(request.headers(), request.uri(), request.version());

    // Scoped to this invocation's call chain; deeper pipeline stages logging
    // inside the continuation pick the field up too.
    let span = match service_id(&path) {
        Some(id) => tracing::info_span!("intercepted_request", service_id = %id),
        None => tracing::Span::none(),
    };

    // Bodies are assumed to fit in memory; no streaming size cap here.
    let (parts, body) = request.into_parts();
    let request_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(method = %method, path = %path, error = %err, "failed to buffer request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let request_body = String::from_utf8_lossy(&request_bytes).into_owned();
    let request = Request::from_parts(parts, Body::from(request_bytes));

    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let (parts, body) = response.into_parts();
    let response_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            // The body stream failed mid-flight; there is nothing left to
            // replay to the client and no complete response to log.
            warn!(method = %method, path = %path, error = %err, "failed to buffer response body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let status = parts.status;
    let record = LogRecord {
        request_method: method,
        query_parameters,
        request_path: path,
        request_id: uuid::Uuid::new_v4().to_string(),
        request_body,
        response_body: format!(
            "{}: {}",
            status.as_u16(),
            String::from_utf8_lossy(&response_bytes)
        ),
        status_code: status.as_u16(),
        elapsed_ms,
    };
    let severity = Severity::from_status(status);
    {
        let _guard = span.enter();
        state.sink.write(
            severity,
            &record,
            (severity == Severity::Error).then_some(&error_context),
        );
    }

    // The client receives the buffered bytes verbatim, independent of what
    // the logging steps did.
    Response::from_parts(parts, Body::from(response_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_matches_case_insensitively() {
        let whitelist = EndpointWhitelist::parse("get/PING,POST/orders");
        assert!(whitelist.contains(&Method::GET, "/ping"));
        assert!(whitelist.contains(&Method::POST, "/Orders"));
        assert!(!whitelist.contains(&Method::GET, "/orders"));
    }

    #[test]
    fn whitelist_ignores_blank_tokens_and_whitespace() {
        let whitelist = EndpointWhitelist::parse(" GET/ping , ,POST/orders,");
        assert!(whitelist.contains(&Method::GET, "/ping"));
        assert!(whitelist.contains(&Method::POST, "/orders"));
    }

    #[test]
    fn missing_configuration_fails_closed() {
        let error = EndpointWhitelist::from_config(None).unwrap_err();
        assert!(matches!(error, WhitelistError::Missing));

        let whitelist = EndpointWhitelist::default();
        assert!(whitelist.is_empty());
        assert!(!whitelist.contains(&Method::GET, "/ping"));
    }

    #[test]
    fn empty_configuration_value_matches_nothing() {
        let whitelist = EndpointWhitelist::from_config(Some("")).unwrap();
        assert!(whitelist.is_empty());
        assert!(!whitelist.contains(&Method::GET, "/"));
    }

    #[test]
    fn service_id_is_the_first_path_segment() {
        assert_eq!(service_id("/orders/42"), Some("orders"));
        assert_eq!(service_id("/ping"), Some("ping"));
        assert_eq!(service_id("/"), None);
        assert_eq!(service_id(""), None);
    }
}

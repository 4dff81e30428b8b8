use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, StatusCode, Uri, Version};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Message template shared by every sink. Field names and order are part of
/// the wire contract and must not change.
pub const MESSAGE_TEMPLATE: &str = "HTTP {RequestMethod} {QueryParameters} {RequestPath} {RequestId} {RequestBody} responded {ResponseBody} {StatusCode} in {Elapsed} ms";

// Request headers attached to error-level records.
const HEADER_WHITELIST: [(&str, header::HeaderName); 3] = [
    ("Content-Type", header::CONTENT_TYPE),
    ("Content-Length", header::CONTENT_LENGTH),
    ("User-Agent", header::USER_AGENT),
];

/// Log level produced by the interceptor. Status codes above 499 classify as
/// `Error`, everything else as `Info`; no other levels are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    pub fn from_status(status: StatusCode) -> Self {
        if status.as_u16() > 499 {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

/// One structured record per intercepted request, built after the pipeline
/// continuation has fully completed. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    pub request_method: String,
    pub query_parameters: String,
    pub request_path: String,
    pub request_id: String,
    pub request_body: String,
    /// Formatted as `"<status>: <body>"`.
    pub response_body: String,
    pub status_code: u16,
    #[serde(rename = "Elapsed")]
    pub elapsed_ms: f64,
}

impl LogRecord {
    /// Render the record against [`MESSAGE_TEMPLATE`], with `Elapsed` at four
    /// decimal places.
    pub fn render(&self) -> String {
        MESSAGE_TEMPLATE
            .replace("{RequestMethod}", &self.request_method)
            .replace("{QueryParameters}", &self.query_parameters)
            .replace("{RequestPath}", &self.request_path)
            .replace("{RequestId}", &self.request_id)
            .replace("{RequestBody}", &self.request_body)
            .replace("{ResponseBody}", &self.response_body)
            .replace("{StatusCode}", &self.status_code.to_string())
            .replace("{Elapsed}", &format!("{:.4}", self.elapsed_ms))
    }
}

/// Extra request metadata attached only to error-level records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorContext {
    pub request_headers: BTreeMap<String, String>,
    pub request_host: String,
    pub request_protocol: String,
}

impl ErrorContext {
    /// Snapshot the whitelisted headers, host, and protocol version of a
    /// request. Absent headers are simply omitted.
    pub fn capture(headers: &HeaderMap, uri: &Uri, version: Version) -> Self {
        let mut request_headers = BTreeMap::new();
        for (canonical, name) in &HEADER_WHITELIST {
            if let Some(value) = headers.get(name) {
                request_headers.insert(
                    (*canonical).to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
        }

        let request_host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .or_else(|| uri.authority().map(|authority| authority.to_string()))
            .unwrap_or_default();

        Self {
            request_headers,
            request_host,
            request_protocol: format!("{version:?}"),
        }
    }
}

/// Destination for log records. The sink owns formatting, persistence, and
/// transport; the interceptor only hands records over and never retries.
pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, record: &LogRecord, error_context: Option<&ErrorContext>);
}

/// Production sink: emits one `tracing` event per record, carrying the
/// wire-contract field names. Where the event ends up (console, file, JSON
/// collector) is decided by the subscriber installed at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, record: &LogRecord, error_context: Option<&ErrorContext>) {
        let elapsed = format!("{:.4}", record.elapsed_ms);
        match severity {
            Severity::Error => {
                let context = error_context.cloned().unwrap_or_default();
                let request_headers =
                    serde_json::to_string(&context.request_headers).unwrap_or_default();
                error!(
                    RequestMethod = %record.request_method,
                    QueryParameters = %record.query_parameters,
                    RequestPath = %record.request_path,
                    RequestId = %record.request_id,
                    RequestBody = %record.request_body,
                    ResponseBody = %record.response_body,
                    StatusCode = record.status_code as u64,
                    Elapsed = %elapsed,
                    RequestHeaders = %request_headers,
                    RequestHost = %context.request_host,
                    RequestProtocol = %context.request_protocol,
                    "{}",
                    record.render()
                );
            }
            Severity::Info => {
                info!(
                    RequestMethod = %record.request_method,
                    QueryParameters = %record.query_parameters,
                    RequestPath = %record.request_path,
                    RequestId = %record.request_id,
                    RequestBody = %record.request_body,
                    ResponseBody = %record.response_body,
                    StatusCode = record.status_code as u64,
                    Elapsed = %elapsed,
                    "{}",
                    record.render()
                );
            }
        }
    }
}

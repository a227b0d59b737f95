//! RawExchangeAdapter - proxy-plugin style capture
//!
//! The proxy hands over the raw HTTP/1.x bytes of a request and its response,
//! plus the target service's host and port. Pieces that cannot be read are
//! replaced with empty values; a capture is never rejected.

use std::net::IpAddr;

use bytes::Bytes;
use contracts::{CapturedTransaction, Direction, KeyVal, TransactionSink, DEFAULT_ENVIRONMENT};
use tracing::warn;

use crate::adapter::CaptureAdapter;
use crate::error::{IngestionError, Result};
use crate::metrics::CaptureMetrics;

/// `metloSource` tag for proxy captures
pub const BURP_SUITE_SOURCE: &str = "burp_suite";

/// The proxy is the client side of every exchange it sees
pub const PROXY_SOURCE_ADDRESS: &str = "127.0.0.1";

/// One request/response pair as raw bytes
#[derive(Debug, Clone, Default)]
pub struct RawExchange {
    /// Request line, header lines, blank line, body
    pub request: Bytes,
    /// Status line, header lines, blank line, body; empty if none was received
    pub response: Bytes,
    /// Target service host
    pub host: String,
    /// Target service port
    pub port: u16,
}

impl RawExchange {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        request: impl Into<Bytes>,
        response: impl Into<Bytes>,
    ) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            host: host.into(),
            port,
        }
    }
}

/// Start line, headers and body of one HTTP message
#[derive(Debug, Default)]
struct RawMessage {
    start_line: String,
    headers: Vec<KeyVal>,
    body: Bytes,
}

impl RawMessage {
    fn parse(raw: &Bytes) -> Self {
        let (head, body) = match head_end(raw) {
            Some((head_end, body_start)) => (&raw[..head_end], raw.slice(body_start..)),
            None => (&raw[..], Bytes::new()),
        };

        let head = String::from_utf8_lossy(head);
        let mut lines = head.lines();
        let start_line = lines.next().unwrap_or_default().trim().to_string();
        let headers = KeyVal::parse_header_lines(lines);

        Self {
            start_line,
            headers,
            body,
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Offset of the blank line ending the head, and of the body
fn head_end(raw: &[u8]) -> Option<(usize, usize)> {
    let crlf = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, i + 4));
    let lf = raw.windows(2).position(|w| w == b"\n\n").map(|i| (i, i + 2));

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Method and request target from `GET /path?q=1 HTTP/1.1`
fn parse_request_line(line: &str) -> Result<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(IngestionError::EmptyRequest)?;
    let target = parts.next().unwrap_or("/");
    Ok((method, target))
}

/// Path and query from an origin-form or absolute-form target
fn split_target(target: &str) -> (&str, &str) {
    let origin = match target.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => target,
    };
    let without_fragment = origin.split('#').next().unwrap_or(origin);
    without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""))
}

/// Status code from `HTTP/1.1 200 OK`
fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Strip the port from a `Host` header value
fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [v6]:port
        return host.split_once(']').map_or(host, |(h, _)| &h[1..]);
    }
    match host.split_once(':') {
        // Bare v6 addresses carry several colons and no port
        Some((h, port)) if !port.contains(':') => h,
        _ => host,
    }
}

/// Converts raw proxy exchanges and submits them to a sink
pub struct RawExchangeAdapter<S> {
    sink: S,
    environment: String,
    metrics: CaptureMetrics,
}

impl<S: TransactionSink> RawExchangeAdapter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            metrics: CaptureMetrics::new(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

impl<S: TransactionSink> CaptureAdapter for RawExchangeAdapter<S> {
    type Capture = RawExchange;

    fn ingest_source(&self) -> &str {
        BURP_SUITE_SOURCE
    }

    fn to_transaction(&self, capture: RawExchange) -> CapturedTransaction {
        let request = RawMessage::parse(&capture.request);
        let (method, target) = match parse_request_line(&request.start_line) {
            Ok(parts) => parts,
            Err(e) => {
                self.metrics.record_parse_error();
                warn!(host = %capture.host, error = %e, "Unreadable request line");
                ("", "/")
            }
        };
        let (path, query) = split_target(target);

        let host = if capture.host.is_empty() {
            request.header("host").map(host_without_port).unwrap_or_default()
        } else {
            capture.host.as_str()
        };

        let response = RawMessage::parse(&capture.response);
        let status = if capture.response.is_empty() {
            0
        } else {
            parse_status_line(&response.start_line).unwrap_or_else(|| {
                self.metrics.record_parse_error();
                warn!(host, line = %response.start_line, "Unreadable status line");
                0
            })
        };

        // No name resolution on the capture path; hostnames are sent as-is
        let destination = match host.parse::<IpAddr>() {
            Ok(ip) => ip.to_string(),
            Err(_) => host.to_string(),
        };

        CapturedTransaction::builder()
            .method(method)
            .host(host)
            .path(path)
            .query(query)
            .request_headers(request.headers)
            .request_body(request.body)
            .status(status)
            .response_headers(response.headers)
            .response_body(response.body)
            .source(PROXY_SOURCE_ADDRESS, 0)
            .destination(destination, capture.port)
            .environment(self.environment.as_str())
            .direction(Direction::Incoming)
            .ingest_source(BURP_SUITE_SOURCE)
            .build()
    }

    fn sink(&self) -> &dyn TransactionSink {
        &self.sink
    }

    fn metrics(&self) -> &CaptureMetrics {
        &self.metrics
    }
}

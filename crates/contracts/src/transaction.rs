//! CapturedTransaction - capture adapter output
//!
//! One intercepted request/response pair plus metadata. The serde shape of
//! these types is the collector wire schema:
//!
//! ```text
//! { "request":  { "url": {"host","path","parameters":[{"name","value"}]},
//!                 "headers":[{"name","value"}], "body", "method" },
//!   "response": { "status", "headers":[...], "body" },
//!   "meta": { "source", "sourcePort", "destination", "destinationPort",
//!             "environment", "incoming", "metloSource" } }
//! ```

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Default environment tag
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Placeholder address when the host API cannot resolve one
pub const UNKNOWN_ADDRESS: &str = "0.0.0.0";

/// Name/value pair used for headers and query parameters.
///
/// Lists of `KeyVal` keep insertion order and allow repeated names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVal {
    pub name: String,
    pub value: String,
}

impl KeyVal {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a raw query string (`a=1&b=2&a=3`) into ordered pairs.
    ///
    /// Names and values are form-decoded. Pieces without `=` are skipped.
    pub fn parse_query(query: &str) -> Vec<KeyVal> {
        let query = query.strip_prefix('?').unwrap_or(query);
        query
            .split('&')
            .filter(|pair| pair.contains('='))
            .filter_map(|pair| url::form_urlencoded::parse(pair.as_bytes()).next())
            .map(|(name, value)| KeyVal::new(name, value))
            .collect()
    }

    /// Parse `Name: value` header lines into ordered pairs.
    ///
    /// Splits on the first `:` only; lines without a colon (such as an HTTP
    /// request line) and lines with an empty name are skipped.
    pub fn parse_header_lines<'a, I>(lines: I) -> Vec<KeyVal>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| line.split_once(':'))
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, value)| KeyVal::new(name.trim(), value.trim()))
            .collect()
    }

    /// Substitute an empty list when a host API fails to produce one.
    pub fn or_empty<E: fmt::Display>(field: &str, result: Result<Vec<KeyVal>, E>) -> Vec<KeyVal> {
        match result {
            Ok(values) => values,
            Err(e) => {
                warn!(field, error = %e, "Unreadable capture field, using empty list");
                Vec::new()
            }
        }
    }
}

/// Opaque request/response body.
///
/// Stored as raw bytes; encoded on the wire as UTF-8 text (lossy).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(Bytes);

impl Body {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decoded text, replacing invalid UTF-8 sequences
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.map(Body::from).unwrap_or_default())
    }
}

/// Request URL, split the way the collector indexes it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUrl {
    pub host: String,
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<KeyVal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub url: ApiUrl,
    #[serde(default)]
    pub headers: Vec<KeyVal>,
    #[serde(default)]
    pub body: Body,
    pub method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<KeyVal>,
    #[serde(default)]
    pub body: Body,
}

/// Traffic direction relative to the instrumented host.
///
/// Encoded on the wire as the boolean `incoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Direction {
    #[default]
    Incoming,
    Outgoing,
}

impl From<bool> for Direction {
    fn from(incoming: bool) -> Self {
        if incoming {
            Self::Incoming
        } else {
            Self::Outgoing
        }
    }
}

impl From<Direction> for bool {
    fn from(direction: Direction) -> Self {
        matches!(direction, Direction::Incoming)
    }
}

/// Connection metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMeta {
    pub source: String,
    pub source_port: u16,
    pub destination: String,
    pub destination_port: u16,
    pub environment: String,

    #[serde(rename = "incoming")]
    pub direction: Direction,

    /// Tag naming the adapter that produced the record (e.g. `burp_suite`)
    #[serde(rename = "metloSource", default)]
    pub ingest_source: String,

    /// Capture time; local bookkeeping only, not part of the wire schema
    #[serde(skip, default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl Default for ApiMeta {
    fn default() -> Self {
        Self {
            source: UNKNOWN_ADDRESS.to_string(),
            source_port: 0,
            destination: UNKNOWN_ADDRESS.to_string(),
            destination_port: 0,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            direction: Direction::Incoming,
            ingest_source: String::new(),
            captured_at: Utc::now(),
        }
    }
}

/// One captured request/response pair, the unit of telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedTransaction {
    pub request: ApiRequest,
    #[serde(default)]
    pub response: ApiResponse,
    #[serde(default)]
    pub meta: ApiMeta,
}

impl CapturedTransaction {
    /// Start building a transaction
    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::default()
    }

    /// Encode as the collector JSON document
    pub fn to_wire_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from the collector JSON document
    pub fn from_wire_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl fmt::Display for CapturedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} -> {}",
            self.request.method, self.request.url.host, self.request.url.path, self.response.status
        )
    }
}

/// Builder used by capture adapters.
///
/// Unset fields fall back to empty lists, empty bodies and the defaults of
/// [`ApiMeta`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: CapturedTransaction,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        let mut tx = CapturedTransaction::default();
        tx.request.method = "GET".to_string();
        Self { tx }
    }
}

impl TransactionBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.tx.request.method = method.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.tx.request.url.host = host.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.tx.request.url.path = path.into();
        self
    }

    pub fn parameters(mut self, parameters: Vec<KeyVal>) -> Self {
        self.tx.request.url.parameters = parameters;
        self
    }

    /// Parse parameters from a raw query string
    pub fn query(self, query: &str) -> Self {
        self.parameters(KeyVal::parse_query(query))
    }

    pub fn request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tx.request.headers.push(KeyVal::new(name, value));
        self
    }

    pub fn request_headers(mut self, headers: Vec<KeyVal>) -> Self {
        self.tx.request.headers = headers;
        self
    }

    pub fn request_body(mut self, body: impl Into<Body>) -> Self {
        self.tx.request.body = body.into();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.tx.response.status = status;
        self
    }

    pub fn response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tx.response.headers.push(KeyVal::new(name, value));
        self
    }

    pub fn response_headers(mut self, headers: Vec<KeyVal>) -> Self {
        self.tx.response.headers = headers;
        self
    }

    pub fn response_body(mut self, body: impl Into<Body>) -> Self {
        self.tx.response.body = body.into();
        self
    }

    pub fn source(mut self, address: impl Into<String>, port: u16) -> Self {
        self.tx.meta.source = address.into();
        self.tx.meta.source_port = port;
        self
    }

    pub fn destination(mut self, address: impl Into<String>, port: u16) -> Self {
        self.tx.meta.destination = address.into();
        self.tx.meta.destination_port = port;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.tx.meta.environment = environment.into();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.tx.meta.direction = direction;
        self
    }

    pub fn ingest_source(mut self, source: impl Into<String>) -> Self {
        self.tx.meta.ingest_source = source.into();
        self
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.tx.meta.captured_at = at;
        self
    }

    pub fn build(self) -> CapturedTransaction {
        self.tx
    }
}

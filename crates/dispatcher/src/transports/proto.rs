//! Messages of the helper's `metloingest.MetloIngest` service
//!
//! Declared by hand with prost derives; tags follow declaration order.

use contracts::{CapturedTransaction, Direction};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyVal {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiUrl {
    #[prost(string, tag = "1")]
    pub host: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(message, repeated, tag = "3")]
    pub parameters: Vec<KeyVal>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiRequest {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(message, optional, tag = "2")]
    pub url: Option<ApiUrl>,
    #[prost(message, repeated, tag = "3")]
    pub headers: Vec<KeyVal>,
    #[prost(string, tag = "4")]
    pub body: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiResponse {
    #[prost(int32, tag = "1")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    pub headers: Vec<KeyVal>,
    #[prost(string, tag = "3")]
    pub body: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiMeta {
    #[prost(string, tag = "1")]
    pub environment: String,
    #[prost(bool, tag = "2")]
    pub incoming: bool,
    #[prost(string, tag = "3")]
    pub source: String,
    #[prost(int32, tag = "4")]
    pub source_port: i32,
    #[prost(string, tag = "5")]
    pub destination: String,
    #[prost(int32, tag = "6")]
    pub destination_port: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApiTrace {
    #[prost(message, optional, tag = "1")]
    pub request: Option<ApiRequest>,
    #[prost(message, optional, tag = "2")]
    pub response: Option<ApiResponse>,
    #[prost(message, optional, tag = "3")]
    pub meta: Option<ApiMeta>,
}

/// Only the blocking verdict is decoded; analysis fields are skipped
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessTraceRes {
    #[prost(bool, tag = "1")]
    pub block: bool,
}

fn key_vals(pairs: &[contracts::KeyVal]) -> Vec<KeyVal> {
    pairs
        .iter()
        .map(|kv| KeyVal {
            name: kv.name.clone(),
            value: kv.value.clone(),
        })
        .collect()
}

impl From<&CapturedTransaction> for ApiTrace {
    fn from(tx: &CapturedTransaction) -> Self {
        Self {
            request: Some(ApiRequest {
                method: tx.request.method.clone(),
                url: Some(ApiUrl {
                    host: tx.request.url.host.clone(),
                    path: tx.request.url.path.clone(),
                    parameters: key_vals(&tx.request.url.parameters),
                }),
                headers: key_vals(&tx.request.headers),
                body: tx.request.body.to_text().into_owned(),
            }),
            response: Some(ApiResponse {
                status: i32::from(tx.response.status),
                headers: key_vals(&tx.response.headers),
                body: tx.response.body.to_text().into_owned(),
            }),
            meta: Some(ApiMeta {
                environment: tx.meta.environment.clone(),
                incoming: tx.meta.direction == Direction::Incoming,
                source: tx.meta.source.clone(),
                source_port: i32::from(tx.meta.source_port),
                destination: tx.meta.destination.clone(),
                destination_port: i32::from(tx.meta.destination_port),
            }),
        }
    }
}

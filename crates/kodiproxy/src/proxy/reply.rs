//! Response tuple shared by every stage of the proxy

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use kodiproxy_protocol::JsonRpcResponse;
use serde_json::Value;

use crate::common::{ProxyError, ProxyResult};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Status, body and headers of an HTTP answer.
///
/// Replies built locally always carry a matching `content-length`; relayed
/// replies keep whatever headers the peer sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl Reply {
    pub fn new(status: StatusCode, body: Bytes, headers: HeaderMap) -> Self {
        Self {
            status,
            body,
            headers,
        }
    }

    /// Plain text reply
    pub fn plain(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self::with_length(status, body.into(), headers)
    }

    /// JSON-RPC success envelope echoing `id`, merged over `extra` headers
    pub fn json_rpc(
        status: StatusCode,
        id: Value,
        result: Value,
        extra: HeaderMap,
    ) -> ProxyResult<Self> {
        let envelope = JsonRpcResponse::success(id, result);
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| ProxyError::Internal(format!("Failed to encode response: {}", e)))?;
        Ok(Self::json(status, Bytes::from(body), extra))
    }

    /// JSON body with content headers set
    pub fn json(status: StatusCode, body: Bytes, mut headers: HeaderMap) -> Self {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Self::with_length(status, body, headers)
    }

    fn with_length(status: StatusCode, body: Bytes, mut headers: HeaderMap) -> Self {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        Self::new(status, body, headers)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

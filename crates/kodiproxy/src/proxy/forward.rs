//! Forwarding Client
//!
//! Relays requests to the upstream JSON-RPC server. One attempt per request,
//! no retries; failures are classified once and reported to the caller.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING, UPGRADE};
use http::HeaderMap;
use kodiproxy_protocol::JsonRpcRequest;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::reply::{Reply, JSON_CONTENT_TYPE};
use crate::common::{create_http_client, ProxyError, ProxyResult};

pub struct Forwarder {
    client: reqwest::Client,
    target: String,
}

impl Forwarder {
    pub fn new(target: impl Into<String>, timeout: Duration) -> ProxyResult<Self> {
        Ok(Self {
            client: create_http_client(timeout)?,
            target: target.into(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Send `body` upstream. Non-2xx answers come back as `ProxyError::Relayed`.
    pub async fn call(&self, headers: &HeaderMap, body: Bytes) -> ProxyResult<Reply> {
        debug!("Forwarding query to jrpc server {}: {:?}", self.target, body);

        let response = self
            .client
            .post(&self.target)
            .headers(outbound_headers(headers))
            .body(body)
            .send()
            .await
            .map_err(|e| ProxyError::from_transport(&self.target, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::from_transport(&self.target, e))?;

        debug!("Received response with code {}", status);
        let reply = Reply::new(status, body, headers);
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(ProxyError::Relayed(reply))
        }
    }

    /// Relay a request verbatim; every outcome becomes a reply
    pub async fn forward(&self, headers: &HeaderMap, body: Bytes) -> Reply {
        match self.call(headers, body).await {
            Ok(reply) => reply,
            Err(err) => {
                log_failure(&err);
                err.into_reply()
            }
        }
    }

    /// Issue a fresh JSON-RPC call upstream on behalf of an overload handler
    pub async fn forward_call(
        &self,
        headers: &HeaderMap,
        id: Value,
        method: &str,
        params: Value,
    ) -> ProxyResult<Reply> {
        let request = JsonRpcRequest::new(id, method, params);
        let body = serde_json::to_vec(&request)
            .map_err(|e| ProxyError::Internal(format!("Failed to encode request: {}", e)))?;

        let mut headers = headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        self.call(&headers, Bytes::from(body)).await.inspect_err(log_failure)
    }
}

/// Inbound headers minus the ones describing the inbound connection.
/// The HTTP client recomputes `content-length` from the body.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    for name in [HOST, CONTENT_LENGTH, CONNECTION, TRANSFER_ENCODING, UPGRADE] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers
}

fn log_failure(err: &ProxyError) {
    match err {
        ProxyError::Relayed(reply) => {
            warn!("Request to the jrpc server failed with status {}", reply.status)
        }
        other => error!("Request to the jrpc server failed: {}", other),
    }
}

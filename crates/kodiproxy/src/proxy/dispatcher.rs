//! Request dispatch
//!
//! Decides per request whether the proxy answers a call itself or relays it
//! upstream untouched. Whatever happens, the caller gets a reply.

use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use kodiproxy_protocol::decode_request;
use tracing::{debug, error, info, warn};

use super::forward::Forwarder;
use super::reply::Reply;
use crate::common::error::INTERNAL_BODY;
use crate::common::ProxyError;
use crate::overload::{OverloadContext, OverloadRegistry, RequestScope};

pub struct Dispatcher {
    registry: Arc<OverloadRegistry>,
    ctx: OverloadContext,
}

impl Dispatcher {
    pub fn new(registry: OverloadRegistry, ctx: OverloadContext) -> Self {
        Self {
            registry: Arc::new(registry),
            ctx,
        }
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.ctx.forwarder
    }

    pub async fn dispatch(&self, body: Bytes, headers: HeaderMap) -> Reply {
        let request = match decode_request(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Could not decode request ({}), forwarding it as-is", e);
                return self.ctx.forwarder.forward(&headers, body).await;
            }
        };

        let Some(kind) = self.registry.get(&request.method) else {
            debug!("Passing {} through", request.method);
            return self.ctx.forwarder.forward(&headers, body).await;
        };

        info!("Overloading {} with {:?}", request.method, kind);
        let scope = RequestScope {
            id: request.id.clone(),
            headers,
        };
        let handler = kind.instantiate(&self.ctx, scope);
        let params = request.params;
        let outcome = tokio::spawn(async move { handler.handle(params).await }).await;

        let answer = match outcome {
            Ok(answer) => answer,
            Err(join_error) => {
                error!("Handler for {} died: {}", request.method, join_error);
                return Reply::plain(http::StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_BODY);
            }
        };

        answer
            .and_then(|done| Reply::json_rpc(done.status, request.id, done.result, done.headers))
            .unwrap_or_else(|err| {
                match &err {
                    ProxyError::InvalidParams(message) => {
                        warn!("{} rejected: {}", request.method, message)
                    }
                    ProxyError::Relayed(reply) => {
                        warn!("{} relaying status {}", request.method, reply.status)
                    }
                    other => error!("{} failed: {}", request.method, other),
                }
                err.into_reply()
            })
    }
}

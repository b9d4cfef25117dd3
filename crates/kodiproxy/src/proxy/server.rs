//! HTTP Listener
//!
//! Accepts JSON-RPC over HTTP on a single path, either as a POST body or as
//! the `request` query parameter of a GET, and hands it to the dispatcher.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use http::header::{HeaderValue, CONNECTION, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use super::reply::Reply;
use crate::config::ServerConfig;

/// Proxy server listening on TCP
pub struct ProxyServer {
    /// `host:port` to bind
    address: String,

    /// Path JSON-RPC is served on
    path: String,

    dispatcher: Arc<Dispatcher>,
}

impl ProxyServer {
    pub fn new(config: &ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            address: format!("{}:{}", config.host, config.port),
            path: config.path.clone(),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn router(&self) -> Router {
        router(&self.path, Arc::clone(&self.dispatcher))
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(&self.address).await?;
        info!(
            "Proxy listening on {}{}, forwarding to {}",
            listener.local_addr()?,
            self.path,
            self.dispatcher.forwarder().target()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Proxy server stopped");
        Ok(())
    }
}

pub fn router(path: &str, dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route(path, get(query_request).post(body_request))
        .fallback(not_found)
        .with_state(dispatcher)
}

async fn body_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    dispatcher.dispatch(body, headers).await
}

async fn query_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    Query(query): Query<Vec<(String, String)>>,
    mut headers: HeaderMap,
) -> Reply {
    match query.as_slice() {
        [(key, request)] if key == "request" => {
            // the query value travels on as a JSON body
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            dispatcher
                .dispatch(Bytes::from(request.clone()), headers)
                .await
        }
        _ => {
            debug!("Rejecting GET with query {:?}", query);
            Reply::plain(
                StatusCode::BAD_REQUEST,
                "Expected exactly one 'request' query parameter",
            )
        }
    }
}

async fn not_found() -> Reply {
    Reply::plain(StatusCode::NOT_FOUND, "Not found")
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        // framing belongs to this connection, not the one the reply came from
        let mut headers = self.headers;
        headers.remove(CONNECTION);
        headers.remove(TRANSFER_ENCODING);
        headers.remove("keep-alive");
        (self.status, headers, self.body).into_response()
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Failed to install Ctrl+C handler: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::{json, Value};

    use crate::devices::{AvReceiver, Devices, PowerOnPolicy, VolumeScale};
    use crate::overload::{OverloadContext, OverloadRegistry};
    use crate::proxy::Forwarder;
    use crate::testing::{serve, status, FakeDisplay, FakeLink, RecordingUpstream};

    async fn proxy(upstream: &RecordingUpstream) -> String {
        let receiver = AvReceiver::new(
            FakeLink::repeating(status().build()),
            "AUXB",
            VolumeScale::new(-80.0, -20.0),
            PowerOnPolicy::default(),
        );
        let ctx = OverloadContext {
            devices: Devices::new(Arc::new(receiver), Arc::new(FakeDisplay::default())),
            forwarder: Arc::new(
                Forwarder::new(upstream.spawn().await, Duration::from_secs(5)).unwrap(),
            ),
        };
        let dispatcher = Dispatcher::new(OverloadRegistry::standard(), ctx);
        let server = ProxyServer::new(&ServerConfig::default(), dispatcher);
        format!("http://{}", serve(server.router()).await)
    }

    fn upstream() -> RecordingUpstream {
        RecordingUpstream::replying(
            StatusCode::OK,
            r#"{"jsonrpc":"2.0","id":1,"result":"pong"}"#,
        )
    }

    #[tokio::test]
    async fn test_post_is_dispatched() {
        let upstream = upstream();
        let base = proxy(&upstream).await;

        let response = reqwest::Client::new()
            .post(format!("{}/jsonrpc", base))
            .header("content-type", "application/json")
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"JSONRPC.Ping"}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-upstream"], "kodi");
        assert_eq!(
            response.text().await.unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"result":"pong"}"#
        );
        assert_eq!(
            &upstream.requests()[0].body[..],
            br#"{"jsonrpc":"2.0","id":1,"method":"JSONRPC.Ping"}"#
        );
    }

    #[tokio::test]
    async fn test_get_is_dispatched() {
        let upstream = upstream();
        let base = proxy(&upstream).await;
        let request = json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "System.GetProperties",
            "params": {"properties": ["canreboot"]}
        })
        .to_string();

        let response = reqwest::Client::new()
            .get(format!("{}/jsonrpc", base))
            .query(&[("request", request)])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({"jsonrpc": "2.0", "id": 8, "result": {"canreboot": true}})
        );
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_pass_through_is_sent_as_json() {
        let upstream = upstream();
        let base = proxy(&upstream).await;
        let request = r#"{"jsonrpc":"2.0","id":1,"method":"JSONRPC.Ping"}"#;

        let response = reqwest::Client::new()
            .get(format!("{}/jsonrpc", base))
            .query(&[("request", request)])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let seen = upstream.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(&seen[0].body[..], request.as_bytes());
        assert_eq!(seen[0].headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_get_query_must_be_a_single_request() {
        let upstream = upstream();
        let base = proxy(&upstream).await;
        let client = reqwest::Client::new();

        for query in ["", "?other=1", "?request=%7B%7D&request=%7B%7D", "?request=%7B%7D&x=1"] {
            let response = client
                .get(format!("{}/jsonrpc{}", base, query))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {:?}", query);
        }
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let upstream = upstream();
        let base = proxy(&upstream).await;

        let response = reqwest::Client::new()
            .post(format!("{}/elsewhere", base))
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(upstream.requests().is_empty());
    }

    #[test]
    fn test_reply_drops_connection_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-upstream", HeaderValue::from_static("kodi"));

        let response = Reply::new(StatusCode::ACCEPTED, Bytes::from_static(b"ok"), headers)
            .into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().get(CONNECTION).is_none());
        assert!(response.headers().get("keep-alive").is_none());
        assert_eq!(response.headers()["x-upstream"], "kodi");
    }
}

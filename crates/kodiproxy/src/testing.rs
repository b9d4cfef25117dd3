//! Test doubles: a scripted receiver, a recording display and a throwaway
//! upstream JSON-RPC server.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};

use crate::common::ProxyResult;
use crate::devices::{AvStatus, DisplayControl, ReceiverLink, Volume};

/// Bind `app` on an ephemeral local port
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn upstream_url(app: Router) -> String {
    format!("http://{}/jsonrpc", serve(app).await)
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Upstream answering every POST with the same reply and recording requests
#[derive(Clone)]
pub struct RecordingUpstream {
    status: StatusCode,
    body: Bytes,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl RecordingUpstream {
    pub fn replying(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body: Bytes::from_static(body.as_bytes()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn spawn(&self) -> String {
        let upstream = self.clone();
        let app = Router::new().route(
            "/jsonrpc",
            post(move |headers: HeaderMap, body: Bytes| {
                let upstream = upstream.clone();
                async move {
                    upstream
                        .seen
                        .lock()
                        .unwrap()
                        .push(SeenRequest { headers, body });

                    let mut headers = HeaderMap::new();
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    headers.insert("x-upstream", HeaderValue::from_static("kodi"));
                    (upstream.status, headers, upstream.body.clone()).into_response()
                }
            }),
        );
        upstream_url(app).await
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Builder for receiver status documents
#[derive(Default)]
pub struct StatusBuilder(AvStatus);

pub fn status() -> StatusBuilder {
    StatusBuilder::default()
}

impl StatusBuilder {
    pub fn power(mut self, on: bool) -> Self {
        self.0.power = Some(on);
        self
    }

    pub fn input(mut self, input: &str) -> Self {
        self.0.input = Some(input.to_string());
        self
    }

    pub fn volume(mut self, volume: Volume) -> Self {
        self.0.volume = Some(volume);
        self
    }

    pub fn mute(mut self, mute: bool) -> Self {
        self.0.mute = Some(mute);
        self
    }

    pub fn build(self) -> AvStatus {
        self.0
    }
}

/// Receiver answering queries from a script; the last entry repeats forever
pub struct FakeLink {
    script: Mutex<VecDeque<AvStatus>>,
    commands: Mutex<Vec<String>>,
    panics: bool,
}

impl FakeLink {
    pub fn new(script: Vec<AvStatus>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            commands: Mutex::new(Vec::new()),
            panics: false,
        })
    }

    pub fn repeating(status: AvStatus) -> Arc<Self> {
        Self::new(vec![status])
    }

    /// A link whose every call panics
    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            commands: Mutex::new(Vec::new()),
            panics: true,
        })
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: &str) {
        if self.panics {
            panic!("receiver link exploded on {}", command);
        }
        self.commands.lock().unwrap().push(command.to_string());
    }
}

#[async_trait]
impl ReceiverLink for FakeLink {
    async fn query(&self, command: &str) -> ProxyResult<AvStatus> {
        self.record(command);
        let mut script = self.script.lock().unwrap();
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(status.unwrap_or_default())
    }

    async fn send(&self, command: &str) -> ProxyResult<()> {
        self.record(command);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDisplay {
    commands: Mutex<Vec<&'static str>>,
}

impl FakeDisplay {
    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl DisplayControl for FakeDisplay {
    async fn switch_on(&self) -> ProxyResult<()> {
        self.commands.lock().unwrap().push("on 0");
        Ok(())
    }

    async fn standby(&self) -> ProxyResult<()> {
        self.commands.lock().unwrap().push("standby 0");
        Ok(())
    }
}

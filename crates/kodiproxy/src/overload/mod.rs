//! Method Overloads
//!
//! A handful of JSON-RPC methods are answered by the proxy itself instead of
//! the upstream server. The registry maps those method names to a handler
//! kind; a handler is built per request, bound to the shared device clients
//! and, when it needs to delegate part of its work, to the forwarder.

pub mod power;
pub mod volume;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::common::{ProxyError, ProxyResult};
use crate::devices::Devices;
use crate::proxy::Forwarder;

pub use power::{QuitOverloader, SystemPropertiesOverloader};
pub use volume::{GetPropertiesOverloader, SetMuteOverloader, SetVolumeOverloader};

/// What a handler answers: the engine wraps `result` into the JSON-RPC envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Overloaded {
    pub status: StatusCode,
    pub result: Value,
    pub headers: HeaderMap,
}

impl Overloaded {
    pub fn ok(result: Value) -> Self {
        Self {
            status: StatusCode::OK,
            result,
            headers: HeaderMap::new(),
        }
    }
}

/// A locally answered JSON-RPC method
#[async_trait]
pub trait Overloader: Send + Sync {
    async fn handle(&self, params: Value) -> ProxyResult<Overloaded>;
}

/// Handler kinds the proxy knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadKind {
    GetProperties,
    SetMute,
    SetVolume,
    Quit,
    SystemProperties,
}

/// Long-lived collaborators handlers are built from
#[derive(Clone)]
pub struct OverloadContext {
    pub devices: Devices,
    pub forwarder: Arc<Forwarder>,
}

/// The request a handler is answering, for partial forwards
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub id: Value,
    pub headers: HeaderMap,
}

impl OverloadKind {
    pub fn instantiate(
        self,
        ctx: &OverloadContext,
        scope: RequestScope,
    ) -> Box<dyn Overloader> {
        let receiver = Arc::clone(&ctx.devices.receiver);
        match self {
            OverloadKind::GetProperties => Box::new(GetPropertiesOverloader::new(
                receiver,
                Arc::clone(&ctx.forwarder),
                scope,
            )),
            OverloadKind::SetMute => Box::new(SetMuteOverloader::new(receiver)),
            OverloadKind::SetVolume => Box::new(SetVolumeOverloader::new(receiver)),
            OverloadKind::Quit => Box::new(QuitOverloader::new(
                receiver,
                Arc::clone(&ctx.devices.display),
            )),
            OverloadKind::SystemProperties => Box::new(SystemPropertiesOverloader),
        }
    }
}

/// Method name → handler kind. Exact, case-sensitive match.
#[derive(Debug, Clone, Default)]
pub struct OverloadRegistry {
    entries: HashMap<String, OverloadKind>,
}

impl OverloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The methods the proxy intercepts in production
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("Application.GetProperties", OverloadKind::GetProperties);
        registry.register("Application.SetMute", OverloadKind::SetMute);
        registry.register("Application.SetVolume", OverloadKind::SetVolume);
        registry.register("Application.Quit", OverloadKind::Quit);
        registry.register("System.Hibernate", OverloadKind::Quit);
        registry.register("System.Shutdown", OverloadKind::Quit);
        registry.register("System.Suspend", OverloadKind::Quit);
        registry.register("System.GetProperties", OverloadKind::SystemProperties);
        registry
    }

    /// Register `kind` for `method`, replacing any previous entry
    pub fn register(&mut self, method: impl Into<String>, kind: OverloadKind) -> Option<OverloadKind> {
        self.entries.insert(method.into(), kind)
    }

    pub fn get(&self, method: &str) -> Option<OverloadKind> {
        self.entries.get(method).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `params.<key>` as a list of property names
pub(crate) fn property_names(params: &Value, key: &str) -> ProxyResult<Vec<String>> {
    let invalid = || {
        ProxyError::InvalidParams(format!(
            "Invalid {} value: {}",
            key,
            params.get(key).map_or_else(|| "missing".to_string(), Value::to_string)
        ))
    };

    params
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(String::from).ok_or_else(invalid))
        .collect()
}

//! Volume and mute overloads, answered by the AV receiver

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{property_names, Overloaded, Overloader, RequestScope};
use crate::common::{ProxyError, ProxyResult};
use crate::devices::AvReceiver;
use crate::proxy::Forwarder;

/// `Application.SetVolume`: a percentage, or "increment"/"decrement"
pub struct SetVolumeOverloader {
    receiver: Arc<AvReceiver>,
}

impl SetVolumeOverloader {
    pub fn new(receiver: Arc<AvReceiver>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl Overloader for SetVolumeOverloader {
    async fn handle(&self, params: Value) -> ProxyResult<Overloaded> {
        let volume = match params.get("volume") {
            Some(Value::Number(n)) => {
                let percent = n.as_f64().unwrap_or_default();
                self.receiver.set_volume(percent).await?
            }
            Some(Value::String(s)) if s == "increment" => self.receiver.step_volume(true).await?,
            Some(Value::String(s)) if s == "decrement" => self.receiver.step_volume(false).await?,
            other => {
                return Err(ProxyError::InvalidParams(format!(
                    "Invalid volume value: {}",
                    describe(other)
                )))
            }
        };
        Ok(Overloaded::ok(json!(volume)))
    }
}

/// `Application.SetMute`: a boolean, or "toggle"
pub struct SetMuteOverloader {
    receiver: Arc<AvReceiver>,
}

impl SetMuteOverloader {
    pub fn new(receiver: Arc<AvReceiver>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl Overloader for SetMuteOverloader {
    async fn handle(&self, params: Value) -> ProxyResult<Overloaded> {
        let mute = match params.get("mute") {
            Some(Value::Bool(mute)) => *mute,
            Some(Value::String(s)) if s == "toggle" => !self.receiver.get_mute().await?,
            other => {
                return Err(ProxyError::InvalidParams(format!(
                    "Invalid mute value: {}",
                    describe(other)
                )))
            }
        };
        let muted = self.receiver.set_mute(mute).await?;
        Ok(Overloaded::ok(json!(muted)))
    }
}

/// `Application.GetProperties`: volume and mute come from the receiver,
/// everything else from upstream, in one combined answer.
pub struct GetPropertiesOverloader {
    receiver: Arc<AvReceiver>,
    forwarder: Arc<Forwarder>,
    scope: RequestScope,
}

const METHOD: &str = "Application.GetProperties";
const RECEIVER_PROPERTIES: [&str; 2] = ["volume", "muted"];

impl GetPropertiesOverloader {
    pub fn new(receiver: Arc<AvReceiver>, forwarder: Arc<Forwarder>, scope: RequestScope) -> Self {
        Self {
            receiver,
            forwarder,
            scope,
        }
    }

    async fn receiver_properties(&self, wanted: &[String]) -> ProxyResult<Map<String, Value>> {
        let reading = self.receiver.get_volume().await?;
        let mut result = Map::new();
        for property in wanted {
            let value = match property.as_str() {
                "volume" => reading.percent.map(|p| json!(p)),
                _ => reading.muted.map(Value::Bool),
            };
            let value = value.ok_or_else(|| {
                ProxyError::Internal(format!("receiver did not report {}", property))
            })?;
            result.insert(property.clone(), value);
        }
        Ok(result)
    }

    async fn upstream_properties(&self, wanted: Vec<String>) -> ProxyResult<Map<String, Value>> {
        debug!("Forwarding properties {:?}", wanted);
        let reply = self
            .forwarder
            .forward_call(
                &self.scope.headers,
                self.scope.id.clone(),
                METHOD,
                json!({ "properties": wanted }),
            )
            .await?;

        let body: Value = serde_json::from_slice(&reply.body).map_err(|e| {
            ProxyError::Internal(format!("Unreadable answer from jrpc server: {}", e))
        })?;
        match body.get("result") {
            Some(Value::Object(result)) => Ok(result.clone()),
            _ => {
                // a JSON-RPC error envelope: the client gets it as upstream sent it
                warn!("jrpc server did not answer {} with a result", METHOD);
                Err(ProxyError::Relayed(reply))
            }
        }
    }
}

#[async_trait]
impl Overloader for GetPropertiesOverloader {
    async fn handle(&self, params: Value) -> ProxyResult<Overloaded> {
        let mut local = Vec::new();
        let mut remote = Vec::new();
        for property in property_names(&params, "properties")? {
            let bucket = if RECEIVER_PROPERTIES.contains(&property.as_str()) {
                &mut local
            } else {
                &mut remote
            };
            if !bucket.contains(&property) {
                bucket.push(property);
            }
        }

        let mut result = Map::new();
        if !local.is_empty() {
            result.extend(self.receiver_properties(&local).await?);
        }
        if !remote.is_empty() {
            result.extend(self.upstream_properties(remote).await?);
        }
        Ok(Overloaded::ok(Value::Object(result)))
    }
}

fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "missing".to_string(), Value::to_string)
}

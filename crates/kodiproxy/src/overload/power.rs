//! Power related overloads

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{property_names, Overloaded, Overloader};
use crate::common::ProxyResult;
use crate::devices::{AvReceiver, DisplayControl};

/// `System.GetProperties`: only rebooting is advertised
pub struct SystemPropertiesOverloader;

#[async_trait]
impl Overloader for SystemPropertiesOverloader {
    async fn handle(&self, params: Value) -> ProxyResult<Overloaded> {
        let result: Map<String, Value> = property_names(&params, "properties")?
            .into_iter()
            .map(|key| {
                let allowed = key == "canreboot";
                (key, Value::Bool(allowed))
            })
            .collect();
        Ok(Overloaded::ok(Value::Object(result)))
    }
}

/// `Application.Quit` and the `System` sleep methods: turn the room off
/// instead of the media center.
pub struct QuitOverloader {
    receiver: Arc<AvReceiver>,
    display: Arc<dyn DisplayControl>,
}

impl QuitOverloader {
    pub fn new(receiver: Arc<AvReceiver>, display: Arc<dyn DisplayControl>) -> Self {
        Self { receiver, display }
    }
}

#[async_trait]
impl Overloader for QuitOverloader {
    async fn handle(&self, _params: Value) -> ProxyResult<Overloaded> {
        let powered = self.receiver.set_power(false).await?;
        if powered {
            warn!("Receiver stayed on");
        }
        self.display.standby().await?;
        info!("Room switched off");
        Ok(Overloaded::ok(json!("OK")))
    }
}

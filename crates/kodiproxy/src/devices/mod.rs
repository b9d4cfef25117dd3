//! Device Capability Clients
//!
//! One client per physical device, each exposing idempotent get/set
//! operations over that device's own protocol.

pub mod cec;
pub mod receiver;
pub mod status;

use std::sync::Arc;

pub use cec::{CecClient, DisplayControl};
pub use receiver::{AvReceiver, HttpLink, PowerOnPolicy, PowerState, ReceiverLink, VolumeScale};
pub use status::{AvStatus, Volume};

use crate::common::ProxyResult;
use crate::config::Config;

/// The devices overload handlers act on, shared read-only by all requests
#[derive(Clone)]
pub struct Devices {
    pub receiver: Arc<AvReceiver>,
    pub display: Arc<dyn DisplayControl>,
}

impl Devices {
    pub fn new(receiver: Arc<AvReceiver>, display: Arc<dyn DisplayControl>) -> Self {
        Self { receiver, display }
    }

    pub fn from_config(config: &Config) -> ProxyResult<Self> {
        Ok(Self::new(
            Arc::new(AvReceiver::from_config(&config.receiver)?),
            Arc::new(CecClient::from_config(&config.display)),
        ))
    }
}

//! kodiproxy
//!
//! Transparent JSON-RPC proxy in front of a media center. Most calls are
//! relayed untouched; volume, mute and power calls are answered by driving
//! the AV receiver and the display instead.

pub mod common;
pub mod config;
pub mod devices;
pub mod logging;
pub mod overload;
pub mod proxy;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use config::Config;
use devices::Devices;
use overload::{OverloadContext, OverloadRegistry};
use proxy::{Dispatcher, Forwarder, ProxyServer};

/// Wire the proxy together from `config`
pub fn build_server(config: &Config) -> anyhow::Result<ProxyServer> {
    let devices = Devices::from_config(config).context("Failed to set up devices")?;
    let forwarder = Forwarder::new(config.jrpc.target.clone(), config.jrpc.timeout())
        .context("Failed to set up the forwarding client")?;

    let registry = OverloadRegistry::standard();
    info!("Intercepting {} methods", registry.len());

    let ctx = OverloadContext {
        devices,
        forwarder: Arc::new(forwarder),
    };
    Ok(ProxyServer::new(&config.server, Dispatcher::new(registry, ctx)))
}

/// Run the proxy until Ctrl-C
pub async fn run(config: &Config) -> anyhow::Result<()> {
    build_server(config)?
        .serve()
        .await
        .context("Proxy server failed")
}

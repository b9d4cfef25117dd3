//! AV receiver capability client
//!
//! Speaks the receiver's `goform` HTTP API. Every read is a fresh status
//! request; nothing is cached between calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::status::{AvStatus, Volume};
use crate::common::{create_http_client, ProxyError, ProxyResult};
use crate::config::ReceiverConfig;
use crate::proxy::Reply;

const STATUS: &str = "formMainZone_MainZoneXmlStatus.xml";
const POWER: &str = "formiPhoneAppPower.xml?1+Power";
const SOURCE: &str = "formiPhoneAppDirect.xml?SI";
const VOLUME: &str = "formiPhoneAppVolume.xml?1+";
const MUTE: &str = "formiPhoneAppMute.xml?1+Mute";

/// Raw command channel to the receiver
#[async_trait]
pub trait ReceiverLink: Send + Sync {
    /// Send a command and decode the status document it answers with
    async fn query(&self, command: &str) -> ProxyResult<AvStatus>;

    /// Send a command whose answer is not worth reading
    async fn send(&self, command: &str) -> ProxyResult<()>;
}

/// `ReceiverLink` over plain HTTP GETs
pub struct HttpLink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLink {
    pub fn new(ip: &str, port: Option<u16>, timeout: Duration) -> ProxyResult<Self> {
        let address = match port {
            Some(port) => format!("{}:{}", ip, port),
            None => ip.to_string(),
        };
        Ok(Self {
            client: create_http_client(timeout)?,
            base_url: format!("http://{}/goform/", address),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, command: &str) -> ProxyResult<bytes::Bytes> {
        let url = format!("{}{}", self.base_url, command);
        debug!("Receiver command: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProxyError::from_transport(&self.base_url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::from_transport(&self.base_url, e))?;

        if !status.is_success() {
            warn!("Receiver answered {} to {}", status, command);
            return Err(ProxyError::Relayed(Reply::new(status, body, headers)));
        }
        Ok(body)
    }
}

#[async_trait]
impl ReceiverLink for HttpLink {
    async fn query(&self, command: &str) -> ProxyResult<AvStatus> {
        let body = self.get(command).await?;
        AvStatus::parse(&body).map_err(|e| ProxyError::Transport {
            target: self.base_url.clone(),
            message: format!("unreadable status document: {}", e),
        })
    }

    async fn send(&self, command: &str) -> ProxyResult<()> {
        self.get(command).await.map(|_| ())
    }
}

/// Affine mapping between receiver dB and the 0-100 scale clients use
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeScale {
    pub min_db: f64,
    pub max_db: f64,
}

impl VolumeScale {
    pub fn new(min_db: f64, max_db: f64) -> Self {
        Self { min_db, max_db }
    }

    pub fn to_percent(&self, volume: Volume) -> u8 {
        match volume {
            Volume::Floor => 0,
            Volume::Db(db) => {
                let db = db.clamp(self.min_db, self.max_db);
                let percent = (db - self.min_db) / (self.max_db - self.min_db) * 100.0;
                percent.round().clamp(0.0, 100.0) as u8
            }
        }
    }

    /// The receiver only takes whole dB steps.
    pub fn to_db(&self, percent: f64) -> f64 {
        let percent = percent.clamp(0.0, 100.0);
        let db = (percent / 100.0 * (self.max_db - self.min_db) + self.min_db).trunc();
        db.clamp(self.min_db, self.max_db)
    }

    pub fn clamp_db(&self, db: f64) -> f64 {
        db.clamp(self.min_db, self.max_db)
    }
}

/// Where the receiver stands with respect to the input we care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    OnWrongInput,
    OnDesiredInput,
}

impl PowerState {
    pub fn of(status: &AvStatus, desired_input: &str) -> Self {
        match (status.power, status.input.as_deref()) {
            (Some(true), Some(input)) if input == desired_input => PowerState::OnDesiredInput,
            (Some(true), _) => PowerState::OnWrongInput,
            _ => PowerState::Off,
        }
    }
}

/// Volume and mute read from a single status request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeReading {
    pub percent: Option<u8>,
    pub muted: Option<bool>,
}

/// Retry budget for switching inputs after power on
#[derive(Debug, Clone, Copy)]
pub struct PowerOnPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PowerOnPolicy {
    fn default() -> Self {
        Self {
            attempts: 8,
            delay: Duration::from_millis(500),
        }
    }
}

/// The AV receiver
pub struct AvReceiver {
    link: Arc<dyn ReceiverLink>,
    desired_input: String,
    scale: VolumeScale,
    power_on: PowerOnPolicy,
}

impl AvReceiver {
    pub fn new(
        link: Arc<dyn ReceiverLink>,
        desired_input: impl Into<String>,
        scale: VolumeScale,
        power_on: PowerOnPolicy,
    ) -> Self {
        Self {
            link,
            desired_input: desired_input.into(),
            scale,
            power_on,
        }
    }

    /// Receiver driven over HTTP as described by `config`
    pub fn from_config(config: &ReceiverConfig) -> ProxyResult<Self> {
        let ip = config
            .ip
            .as_deref()
            .ok_or_else(|| ProxyError::Internal("receiver.ip is not configured".into()))?;
        let link = HttpLink::new(ip, config.port, config.timeout())?;
        info!("Receiver at {} (input {})", link.base_url(), config.desired_input);

        Ok(Self::new(
            Arc::new(link),
            config.desired_input.clone(),
            VolumeScale::new(config.min_volume, config.max_volume),
            PowerOnPolicy {
                attempts: config.power_on_attempts,
                delay: config.power_on_delay(),
            },
        ))
    }

    pub async fn status(&self) -> ProxyResult<AvStatus> {
        self.link.query(STATUS).await
    }

    /// On, and on our input
    pub async fn get_power(&self) -> ProxyResult<bool> {
        let status = self.status().await?;
        Ok(PowerState::of(&status, &self.desired_input) == PowerState::OnDesiredInput)
    }

    pub async fn set_power(&self, on: bool) -> ProxyResult<bool> {
        if on {
            self.power_on().await
        } else {
            self.power_off().await
        }
    }

    /// Power on and switch to the desired input.
    ///
    /// Input switching lags behind power on, so the input is re-selected until
    /// it sticks or the attempt budget runs out. Reports success either way.
    async fn power_on(&self) -> ProxyResult<bool> {
        let mut status = self.status().await?;
        if status.power != Some(true) {
            info!("Powering receiver on");
            self.link.send(&format!("{}On", POWER)).await?;
        }

        let select = format!("{}{}", SOURCE, self.desired_input);
        let mut attempts = 0;
        while status.input.as_deref() != Some(self.desired_input.as_str())
            && attempts < self.power_on.attempts
        {
            attempts += 1;
            debug!("Selecting input {} (attempt {})", self.desired_input, attempts);
            self.link.send(&select).await?;
            tokio::time::sleep(self.power_on.delay).await;
            status = self.status().await?;
        }

        match PowerState::of(&status, &self.desired_input) {
            PowerState::OnDesiredInput => info!("Receiver on input {}", self.desired_input),
            state => warn!(
                "Receiver still {:?} after {} input selections",
                state, attempts
            ),
        }
        Ok(true)
    }

    /// Standby, unless the receiver is busy with another input.
    /// Returns the power flag observed after the action.
    async fn power_off(&self) -> ProxyResult<bool> {
        let status = self.status().await?;
        if status.input.as_deref() != Some(self.desired_input.as_str()) {
            info!(
                "Receiver on input {:?}, leaving it on",
                status.input.as_deref().unwrap_or("unknown")
            );
            return Ok(status.power.unwrap_or(false));
        }

        info!("Putting receiver in standby");
        let after = self.link.query(&format!("{}Standby", POWER)).await?;
        let power = match after.power {
            Some(power) => power,
            None => self.status().await?.power.unwrap_or(false),
        };
        Ok(power)
    }

    pub async fn get_mute(&self) -> ProxyResult<bool> {
        self.status()
            .await?
            .mute
            .ok_or_else(|| missing("mute state"))
    }

    /// Returns the mute state the receiver reports afterwards
    pub async fn set_mute(&self, mute: bool) -> ProxyResult<bool> {
        let command = format!("{}{}", MUTE, if mute { "On" } else { "Off" });
        self.link
            .query(&command)
            .await?
            .mute
            .ok_or_else(|| missing("mute state"))
    }

    pub async fn get_volume(&self) -> ProxyResult<VolumeReading> {
        let status = self.status().await?;
        Ok(VolumeReading {
            percent: status.volume.map(|v| self.scale.to_percent(v)),
            muted: status.mute,
        })
    }

    /// Set an absolute level; returns the level reported afterwards
    pub async fn set_volume(&self, percent: f64) -> ProxyResult<u8> {
        let db = self.scale.to_db(percent);
        self.apply_volume(db).await
    }

    /// Move one dB up or down, within bounds
    pub async fn step_volume(&self, up: bool) -> ProxyResult<u8> {
        let current = match self.status().await?.volume {
            Some(Volume::Db(db)) => db,
            Some(Volume::Floor) => self.scale.min_db,
            None => return Err(missing("volume")),
        };
        let step = if up { 1.0 } else { -1.0 };
        self.apply_volume(self.scale.clamp_db(current + step)).await
    }

    async fn apply_volume(&self, db: f64) -> ProxyResult<u8> {
        let command = format!("{}{:.1}", VOLUME, db);
        let volume = self
            .link
            .query(&command)
            .await?
            .volume
            .ok_or_else(|| missing("volume"))?;
        Ok(self.scale.to_percent(volume))
    }
}

fn missing(what: &str) -> ProxyError {
    ProxyError::Internal(format!("receiver did not report its {}", what))
}

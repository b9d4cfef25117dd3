//! CEC display control
//!
//! The display is driven through `cec-client` in single-command mode: one
//! process per command, the command written on its stdin.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::common::{ProxyError, ProxyResult};
use crate::config::DisplayConfig;

/// Power control of the display
#[async_trait]
pub trait DisplayControl: Send + Sync {
    async fn switch_on(&self) -> ProxyResult<()>;
    async fn standby(&self) -> ProxyResult<()>;
}

/// Bound on one `cec-client` run, from spawn to exit
pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CecClient {
    enabled: bool,
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CecClient {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            enabled: true,
            command: command.into(),
            args,
            timeout: DEFAULT_DISPLAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            enabled: config.enabled,
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }

    async fn pipe(&self, line: &str) -> ProxyResult<()> {
        if !self.enabled {
            debug!("Display control disabled, not sending {:?}", line);
            return Ok(());
        }

        info!("Display command: {}", line);
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("could not start: {}", e)))?;

        let exchange = async {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(line.as_bytes())
                    .await
                    .map_err(|e| self.failure(format!("could not write command: {}", e)))?;
                // dropping stdin closes it, which ends single-command mode
            }
            child.wait().await.map_err(|e| self.failure(e.to_string()))
        };

        let status = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(status) => status?,
            Err(_) => {
                // the child is killed when dropped
                warn!("{} did not exit within {:?}", self.command, self.timeout);
                return Err(ProxyError::Timeout {
                    target: self.command.clone(),
                });
            }
        };
        if !status.success() {
            return Err(self.failure(format!("exited with {}", status)));
        }
        Ok(())
    }

    fn failure(&self, message: String) -> ProxyError {
        ProxyError::Transport {
            target: self.command.clone(),
            message,
        }
    }
}

#[async_trait]
impl DisplayControl for CecClient {
    async fn switch_on(&self) -> ProxyResult<()> {
        self.pipe("on 0").await
    }

    async fn standby(&self) -> ProxyResult<()> {
        self.pipe("standby 0").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_is_piped() {
        let client = CecClient::new("cat", vec![]);
        client.switch_on().await.unwrap();
        client.standby().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let client = CecClient::new("kodiproxy-no-such-cec-client", vec![]);
        assert!(matches!(
            client.standby().await,
            Err(ProxyError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn test_disabled_is_noop() {
        let config = DisplayConfig {
            enabled: false,
            command: "kodiproxy-no-such-cec-client".into(),
            args: vec![],
            timeout_secs: 5,
        };
        CecClient::from_config(&config).standby().await.unwrap();
    }

    #[tokio::test]
    async fn test_hung_client_times_out() {
        let client = CecClient::new("sleep", vec!["30".into()])
            .with_timeout(Duration::from_millis(200));

        let outcome = tokio::time::timeout(Duration::from_secs(5), client.standby())
            .await
            .expect("display call was not bounded");

        match outcome {
            Err(err @ ProxyError::Timeout { .. }) => {
                assert_eq!(err.status(), http::StatusCode::REQUEST_TIMEOUT)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_timeout_from_config() {
        let config = DisplayConfig {
            timeout_secs: 2,
            ..DisplayConfig::default()
        };
        assert_eq!(CecClient::from_config(&config).timeout, Duration::from_secs(2));
        assert_eq!(
            CecClient::new("cec-client", vec![]).timeout,
            DEFAULT_DISPLAY_TIMEOUT
        );
    }
}

//! Common Error Types
//!
//! Every failure the proxy can hit while answering a request ends up as one
//! of these variants, and every variant knows the HTTP reply it turns into.

use http::StatusCode;

use crate::proxy::Reply;

pub const TIMEOUT_BODY: &str = "Request to the jrpc server timed out";
pub const TRANSPORT_BODY: &str = "Unknown error";
pub const INTERNAL_BODY: &str = "Unknown error occurred";

/// Error types for the proxy
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Connect or read timeout talking to `target`
    #[error("request to {target} timed out")]
    Timeout { target: String },

    /// The other side answered, but not with success; relayed as-is
    #[error("peer answered with status {}", .0.status)]
    Relayed(Reply),

    /// DNS, refused connection, protocol violation, unreadable body...
    #[error("transport error talking to {target}: {message}")]
    Transport { target: String, message: String },

    /// Bad parameter value from the client
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Anything else going wrong inside the proxy
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// Classify a failed HTTP exchange with `target`
    pub fn from_transport(target: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout {
                target: target.to_string(),
            }
        } else {
            ProxyError::Transport {
                target: target.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ProxyError::Relayed(reply) => reply.status,
            ProxyError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into the reply sent to the client. Internal details stay out of the body.
    pub fn into_reply(self) -> Reply {
        let status = self.status();
        match self {
            ProxyError::Relayed(reply) => reply,
            ProxyError::Timeout { .. } => Reply::plain(status, TIMEOUT_BODY),
            ProxyError::Transport { .. } => Reply::plain(status, TRANSPORT_BODY),
            ProxyError::InvalidParams(message) => Reply::plain(status, message),
            ProxyError::Internal(_) => Reply::plain(status, INTERNAL_BODY),
        }
    }
}

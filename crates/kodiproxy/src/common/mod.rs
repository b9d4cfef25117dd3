//! Common Utilities
//!
//! Error type and HTTP client construction shared by the proxy and the device clients.

pub mod error;
pub mod http;

pub use error::{ProxyError, ProxyResult};
pub use http::create_http_client;

//! JSON-RPC Proxy
//!
//! HTTP listener, request dispatcher and the forwarding client that talks to
//! the upstream media center.

pub mod dispatcher;
pub mod forward;
pub mod reply;
pub mod server;

pub use dispatcher::Dispatcher;
pub use forward::Forwarder;
pub use reply::{Reply, JSON_CONTENT_TYPE};
pub use server::ProxyServer;

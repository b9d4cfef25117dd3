pub mod jsonrpc;

pub use jsonrpc::{decode_request, DecodeError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

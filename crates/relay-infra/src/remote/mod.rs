//! Remote action sources: HTTP endpoints and LangServe-style chains.

pub mod chain;
pub mod http;
pub mod types;

pub use chain::RemoteChain;
pub use http::HttpRemoteEndpoint;

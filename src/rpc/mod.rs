pub mod bump;
pub mod client;
pub mod params;
pub mod scripted;
pub mod search;
pub mod transport;

// Re-exports for convenience
pub use client::MarketplaceClient;
pub use scripted::ScriptedTransport;
pub use transport::{HttpRpcTransport, RpcRequest, RpcTransport};

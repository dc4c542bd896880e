// fibridge-api: Async Rust client for the TryFi vendor API

pub mod auth;
pub mod client;
pub mod details;
pub mod error;
pub mod transport;

pub use client::FiClient;
pub use details::DetailSnapshot;
pub use error::Error;
pub use transport::TransportConfig;

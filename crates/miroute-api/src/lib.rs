// miroute-api: Async Rust client for the Xiaomi MiWiFi (Luci) router HTTP API

pub mod api;
pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

pub use api::LuciApi;
pub use client::LuciClient;
pub use error::Error;
pub use transport::TransportConfig;

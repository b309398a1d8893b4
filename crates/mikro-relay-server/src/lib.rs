pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hash;
pub mod mikro;
pub mod query;
pub mod server;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub mikro: mikro::MikroClient,
    /// Optional key protecting the bulk sync endpoint.
    pub sync_key: Option<String>,
}

pub use config::{MikroCredentials, ServerConfig, UpstreamConfig};
pub use error::RelayError;
pub use server::{router, run, serve};

//! Script Gateway Library
//!
//! Gated HTTP front for launching scripts from a single directory.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod scripts;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;

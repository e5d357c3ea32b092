//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer composition)
//!     → request.rs (request ID)
//!     → middleware/logging.rs, then the security gates
//!     → handlers.rs (health, root, run, list, describe)
//!     → response.rs (error → status + JSON detail)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, Gates, GatewayServer};

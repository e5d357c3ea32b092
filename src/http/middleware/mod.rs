//! Middleware owned by the HTTP layer.

pub mod logging;

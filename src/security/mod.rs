//! Security subsystem: the admission gates in front of every handler.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http/middleware/logging.rs (always; logs start and outcome)
//!     → rate_limit.rs (per-IP token bucket, per endpoint class)   → 429
//!     → access_control.rs (CIDR allow-list)                        → 403
//!     → auth.rs (static API key set)                               → 401
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Cheap checks first; the first failing gate short-circuits
//! - Fail closed: unparseable addresses and missing keys are rejected
//! - Each gate owns only its own state and can be tested alone

pub mod access_control;
pub mod auth;
pub mod rate_limit;

pub use access_control::{AllowListEntry, CidrAllowList};
pub use auth::KeyAuthenticator;
pub use rate_limit::{Decision, EndpointClass, RateLimiter};

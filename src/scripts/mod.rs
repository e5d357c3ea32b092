//! Script subsystem: discovery and execution of external targets.
//!
//! # Data Flow
//! ```text
//! name (+ parameters)
//!     → sanitize.rs (name traversal check, argument construction)
//!     → registry.rs (resolve within the scripts directory, help text)
//!     → dispatcher.rs (launch under timeout, classify outcome)
//!     → launcher.rs (argument-vector process spawn, kill on timeout)
//!     → target.rs (ScriptTarget / DispatchResult, output decoding)
//! ```
//!
//! # Design Decisions
//! - Names are validated before any filesystem access
//! - No shell: parameters reach the target as discrete argv entries
//! - A non-zero exit is data, not an error; only infrastructure fails

pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod registry;
pub mod sanitize;
pub mod target;

pub use dispatcher::ProcessDispatcher;
pub use error::ScriptError;
pub use registry::ScriptRegistry;
pub use target::{DispatchResult, ScriptTarget};

//! Driftbox agent.
//!
//! Loads an [`AgentConfig`], opens the local store, ledger and session into a
//! [`Runtime`], and serves framed requests from a control process through an
//! [`Agent`]. Requests are dispatched to the reconciliation engine by
//! [`handle`].

pub mod agent;
pub mod config;
pub mod error;
pub mod handler;
pub mod runtime;

pub use agent::{Agent, ConnectionSummary};
pub use config::{AgentConfig, DEFAULT_CONTROL_ADDR};
pub use error::{AgentError, AgentResult};
pub use handler::handle;
pub use runtime::Runtime;

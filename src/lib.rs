//! Session tracking for per-worktree tmux sessions.
//!
//! - [`naming`] maps (project, worktree, branch) to bounded session IDs and back.
//! - [`StateStore`] keeps the durable session records.
//! - [`ProcessMonitor`] polls sessions and classifies what their process is doing.
//! - [`discovery`] reconciles live tmux sessions with both.

pub mod config;
pub mod discovery;
pub mod error;
pub mod monitor;
pub mod naming;
pub mod store;
pub mod tmux;

pub use config::{Config, MonitorConfig};
pub use error::{Result, SessionError};
pub use monitor::{ProcessMonitor, ProcessState, StateChange};
pub use store::{PersistedSession, StateStore};
pub use tmux::{SessionBackend, TmuxClient, TmuxSession};

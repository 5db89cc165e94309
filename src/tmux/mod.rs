mod client;

pub use client::TmuxClient;

use serde::{Deserialize, Serialize};

/// Represents a tmux session as listed by `tmux list-sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxSession {
    /// Session name (our session ID when we created it)
    pub name: String,
    /// Working directory the session was started in
    pub path: String,
    /// Unix timestamp when session was created
    pub created_at: u64,
    /// Number of attached clients
    pub attached_clients: usize,
}

/// Everything the monitor and store need from the terminal multiplexer and OS.
///
/// Implemented by [`TmuxClient`]; tests use an in-memory fake.
#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    /// Most recent visible content of the session's primary pane.
    async fn capture_output(&self, session_id: &str) -> anyhow::Result<String>;

    /// PID of the process running in the session's primary pane.
    async fn resolve_pid(&self, session_id: &str) -> anyhow::Result<u32>;

    async fn session_exists(&self, session_id: &str) -> anyhow::Result<bool>;

    /// Raw scheduler state of `pid` as reported by `ps -o stat=`.
    async fn process_status(&self, pid: u32) -> anyhow::Result<String>;
}

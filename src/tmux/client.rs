use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

use super::{SessionBackend, TmuxSession};

/// Client for interacting with tmux via CLI
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
    /// Path to ps binary
    ps_path: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
            ps_path: "ps".to_string(),
        }
    }

    /// Use a specific tmux binary.
    pub fn with_tmux_path(mut self, path: impl Into<String>) -> Self {
        self.tmux_path = path.into();
        self
    }

    /// List all tmux sessions
    pub async fn list_sessions(&self) -> Result<Vec<TmuxSession>> {
        // Format: session_name|session_path|session_created|session_attached
        let output = Command::new(&self.tmux_path)
            .args([
                "list-sessions",
                "-F",
                "#{session_name}|#{session_path}|#{session_created}|#{session_attached}",
            ])
            .output()
            .await
            .context("Failed to execute tmux list-sessions")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_no_server(&stderr) {
                return Ok(Vec::new());
            }
            anyhow::bail!("tmux list-sessions failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_session_line).collect())
    }
}

#[async_trait::async_trait]
impl SessionBackend for TmuxClient {
    async fn capture_output(&self, session_id: &str) -> Result<String> {
        let output = Command::new(&self.tmux_path)
            .args(["capture-pane", "-p", "-t", session_id])
            .output()
            .await
            .context("Failed to capture pane")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tmux capture-pane failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn resolve_pid(&self, session_id: &str) -> Result<u32> {
        let output = Command::new(&self.tmux_path)
            .args(["list-panes", "-t", session_id, "-F", "#{pane_pid}"])
            .output()
            .await
            .context("Failed to execute tmux list-panes")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tmux list-panes failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| anyhow::anyhow!("session {session_id} has no panes"))?;

        first
            .parse()
            .with_context(|| format!("Invalid pane pid {first:?}"))
    }

    async fn session_exists(&self, session_id: &str) -> Result<bool> {
        let output = Command::new(&self.tmux_path)
            .args(["has-session", "-t", session_id])
            .stdout(Stdio::null())
            .output()
            .await
            .context("Failed to execute tmux has-session")?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_no_server(&stderr) || stderr.contains("can't find session") {
            return Ok(false);
        }
        anyhow::bail!("tmux has-session failed: {}", stderr.trim());
    }

    async fn process_status(&self, pid: u32) -> Result<String> {
        let output = Command::new(&self.ps_path)
            .args(["-o", "stat=", "-p", &pid.to_string()])
            .stderr(Stdio::null())
            .output()
            .await
            .context("Failed to execute ps")?;

        let stat = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || stat.is_empty() {
            anyhow::bail!("process {pid} not found");
        }
        Ok(stat)
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running") || stderr.contains("no sessions")
}

fn parse_session_line(line: &str) -> Option<TmuxSession> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 4 {
        return None;
    }

    Some(TmuxSession {
        name: parts[0].to_string(),
        path: parts[1].to_string(),
        created_at: parts[2].parse().unwrap_or(0),
        attached_clients: parts[3].parse().unwrap_or(0),
    })
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::monitor::patterns::DEFAULT_OUTPUT_LINES;

/// Settings for [`crate::ProcessMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between two polls of the same session
    pub poll_interval: Duration,
    /// Upper bound on any single tmux or ps call
    pub command_timeout: Duration,
    /// Transitions kept per session
    pub history_limit: usize,
    /// Trailing output lines fed to the pattern table
    pub output_lines: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            command_timeout: Duration::from_secs(2),
            history_limit: 100,
            output_lines: DEFAULT_OUTPUT_LINES,
        }
    }
}

/// Daemon-level settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_path: PathBuf,
    pub tmux_path: String,
    pub discovery_interval: Duration,
    /// Store entries untouched for this long are checked against tmux on startup
    pub stale_after: Duration,
    pub monitor: MonitorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            tmux_path: "tmux".to_string(),
            discovery_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(7 * 24 * 60 * 60),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `WTS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("WTS_STATE_PATH").filter(|p| !p.is_empty()) {
            config.state_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WTS_TMUX_PATH").filter(|p| !p.is_empty()) {
            config.tmux_path = path;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "WTS_POLL_INTERVAL_MS") {
            config.monitor.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "WTS_COMMAND_TIMEOUT_MS") {
            config.monitor.command_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "WTS_DISCOVERY_INTERVAL_MS") {
            config.discovery_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "WTS_STALE_AFTER_SECS") {
            config.stale_after = Duration::from_secs(secs);
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".worktree-sentry")
        .join("sessions.json")
}

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified activity of a session's foreground process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Not yet classified, or no signal matched
    #[default]
    Unknown,
    /// Sitting at a prompt
    Idle,
    /// Actively processing
    Busy,
    /// Blocked on user input or I/O
    Waiting,
    /// Reported an error or died
    Error,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Unknown => "unknown",
            ProcessState::Idle => "idle",
            ProcessState::Busy => "busy",
            ProcessState::Waiting => "waiting",
            ProcessState::Error => "error",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(ProcessState::Unknown),
            "idle" => Ok(ProcessState::Idle),
            "busy" => Ok(ProcessState::Busy),
            "waiting" => Ok(ProcessState::Waiting),
            "error" => Ok(ProcessState::Error),
            other => Err(format!("unknown process state: {other}")),
        }
    }
}

/// One accepted transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: ProcessState,
    pub to: ProcessState,
    pub timestamp: DateTime<Utc>,
    /// Which signal caused it ("output", "process", ...)
    pub trigger: String,
}

/// In-memory record for a session under monitoring.
#[derive(Debug, Clone)]
pub struct MonitoredSession {
    pub session_id: String,
    pub pid: u32,
    pub state: ProcessState,
    pub last_change: DateTime<Utc>,
    history: VecDeque<StateChange>,
    history_limit: usize,
}

impl MonitoredSession {
    pub fn new(session_id: String, pid: u32, history_limit: usize) -> Self {
        Self {
            session_id,
            pid,
            state: ProcessState::Unknown,
            last_change: Utc::now(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Move to `to`, returning the recorded change, or `None` for a self-transition.
    pub fn transition(&mut self, to: ProcessState, trigger: &str) -> Option<StateChange> {
        if to == self.state {
            return None;
        }

        let change = StateChange {
            from: self.state,
            to,
            timestamp: Utc::now(),
            trigger: trigger.to_string(),
        };

        self.state = to;
        self.last_change = change.timestamp;
        self.history.push_back(change.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        Some(change)
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<StateChange> {
        self.history.iter().cloned().collect()
    }
}

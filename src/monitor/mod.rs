//! Process state monitoring.
//!
//! Each monitored session gets its own polling task. A poll captures the pane
//! output and matches it against the pattern table; when that says nothing
//! useful, the scheduler state of the pane's process decides instead.
//! Accepted transitions are recorded, pushed to registered hooks and, when a
//! store is attached, written through to it.

pub mod patterns;
pub mod process;
pub mod state;

pub use patterns::{analyze_output, PatternTable, StatePattern};
pub use state::{MonitoredSession, ProcessState, StateChange};

use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{Result, SessionError};
use crate::store::{StateStore, FIELD_LAST_ACCESS, FIELD_LAST_STATE};
use crate::tmux::SessionBackend;

/// Observer for accepted transitions: `(session_id, from, to)`.
pub type StateHook =
    Arc<dyn Fn(&str, ProcessState, ProcessState) -> anyhow::Result<()> + Send + Sync>;

const TRIGGER_OUTPUT: &str = "output";
const TRIGGER_PROCESS: &str = "process";

struct Registration {
    session: MonitoredSession,
    cancel: CancellationToken,
}

struct Shared {
    backend: Arc<dyn SessionBackend>,
    config: MonitorConfig,
    patterns: PatternTable,
    store: Option<Arc<StateStore>>,
    sessions: RwLock<HashMap<String, Registration>>,
    hooks: RwLock<Vec<StateHook>>,
}

/// Watches sessions and classifies what their foreground process is doing.
pub struct ProcessMonitor {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessMonitor {
    /// Create a monitor. With a store, transitions update `last_state` and
    /// `last_access` of the matching stored session.
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        config: MonitorConfig,
        store: Option<Arc<StateStore>>,
    ) -> Self {
        let patterns = PatternTable::default().with_window(config.output_lines);
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                patterns,
                store,
                sessions: RwLock::new(HashMap::new()),
                hooks: RwLock::new(Vec::new()),
            }),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the output pattern table. Only possible before any session is
    /// monitored. The table's window is reset to `output_lines`.
    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => {
                shared.patterns = patterns.with_window(shared.config.output_lines)
            }
            None => warn!("Pattern table can only be replaced before monitoring starts"),
        }
        self
    }

    /// Resolve the session's PID and start polling it.
    pub async fn start_monitoring(&self, session_id: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::validation("monitor", "already shut down"));
        }
        if self.shared.is_registered(session_id) {
            return Err(SessionError::AlreadyMonitoring(session_id.to_string()));
        }

        let pid = self
            .shared
            .external("resolve pane pid", self.shared.backend.resolve_pid(session_id))
            .await?;

        let cancel = self.cancel.child_token();
        {
            let mut sessions = self.shared.write_sessions();
            if sessions.contains_key(session_id) {
                return Err(SessionError::AlreadyMonitoring(session_id.to_string()));
            }
            sessions.insert(
                session_id.to_string(),
                Registration {
                    session: MonitoredSession::new(
                        session_id.to_string(),
                        pid,
                        self.shared.config.history_limit,
                    ),
                    cancel: cancel.clone(),
                },
            );
        }

        info!(session_id, pid, "Started monitoring");

        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.shared),
            session_id.to_string(),
            cancel,
        ));
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers.retain(|w| !w.is_finished());
        workers.push(handle);

        Ok(())
    }

    pub fn stop_monitoring(&self, session_id: &str) -> Result<()> {
        let registration = self
            .shared
            .write_sessions()
            .remove(session_id)
            .ok_or_else(|| SessionError::NotMonitoring(session_id.to_string()))?;
        registration.cancel.cancel();

        info!(session_id, "Stopped monitoring");
        Ok(())
    }

    pub fn is_monitoring(&self, session_id: &str) -> bool {
        self.shared.is_registered(session_id)
    }

    pub fn monitored_sessions(&self) -> Vec<String> {
        self.shared.read_sessions().keys().cloned().collect()
    }

    pub fn get_process_state(&self, session_id: &str) -> Result<ProcessState> {
        self.shared.with_session(session_id, |s| s.state)
    }

    pub fn get_process_pid(&self, session_id: &str) -> Result<u32> {
        self.shared.with_session(session_id, |s| s.pid)
    }

    /// Recent transitions, oldest first.
    pub fn state_history(&self, session_id: &str) -> Result<Vec<StateChange>> {
        self.shared.with_session(session_id, MonitoredSession::history)
    }

    /// Add an observer. Hooks run in registration order on every accepted
    /// transition; a hook that errors or panics is logged and skipped.
    pub fn register_state_hook<F>(&self, hook: F)
    where
        F: Fn(&str, ProcessState, ProcessState) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared
            .hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(hook));
    }

    /// Classify the session now and commit the result if it differs from the
    /// current state.
    pub async fn detect_state_change(&self, session_id: &str) -> Result<(bool, ProcessState)> {
        self.shared.detect_state_change(session_id).await
    }

    /// Cancel every polling task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.shared.write_sessions().clear();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in workers {
            if let Err(error) = worker.await {
                warn!(%error, "Monitor task ended abnormally");
            }
        }
        info!("Process monitor shut down");
    }
}

impl Drop for ProcessMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Shared {
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Registration>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Registration>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_registered(&self, session_id: &str) -> bool {
        self.read_sessions().contains_key(session_id)
    }

    fn with_session<T>(&self, session_id: &str, f: impl FnOnce(&MonitoredSession) -> T) -> Result<T> {
        self.read_sessions()
            .get(session_id)
            .map(|r| f(&r.session))
            .ok_or_else(|| SessionError::NotMonitoring(session_id.to_string()))
    }

    /// Run a backend call under the command timeout.
    async fn external<T>(
        &self,
        operation: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T> {
        match timeout(self.config.command_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(SessionError::external(operation, error)),
            Err(_) => Err(SessionError::external(
                operation,
                anyhow::anyhow!("timed out after {:?}", self.config.command_timeout),
            )),
        }
    }

    async fn detect_state_change(&self, session_id: &str) -> Result<(bool, ProcessState)> {
        let (pid, current) = self.with_session(session_id, |s| (s.pid, s.state))?;

        let (state, trigger) = self.classify(session_id, pid).await?;
        if state == current {
            return Ok((false, state));
        }

        match self.update_session_state(session_id, state, trigger)? {
            Some(change) => {
                self.notify(session_id, &change);
                if let Some(store) = &self.store {
                    write_through(Arc::clone(store), session_id, change).await;
                }
                Ok((true, state))
            }
            None => Ok((false, state)),
        }
    }

    /// Combined detection: output patterns first, then the process table.
    async fn classify(&self, session_id: &str, pid: u32) -> Result<(ProcessState, &'static str)> {
        let from_output = self
            .external("capture pane output", self.backend.capture_output(session_id))
            .await
            .map(|content| self.patterns.analyze(&content));

        if let Ok(&state) = from_output.as_ref() {
            if state != ProcessState::Unknown {
                return Ok((state, TRIGGER_OUTPUT));
            }
        }

        let from_process = self
            .external("query process state", self.backend.process_status(pid))
            .await
            .map(|stat| process::state_from_ps_stat(&stat));

        match (from_output, from_process) {
            (_, Ok(state)) => Ok((state, TRIGGER_PROCESS)),
            (Ok(state), Err(error)) => {
                debug!(session_id, pid, %error, "Process query failed");
                Ok((state, TRIGGER_OUTPUT))
            }
            (Err(output), Err(process)) => Err(SessionError::DetectionFailed {
                output: output.to_string(),
                process: process.to_string(),
            }),
        }
    }

    /// Commit a new state under the table lock.
    fn update_session_state(
        &self,
        session_id: &str,
        state: ProcessState,
        trigger: &str,
    ) -> Result<Option<StateChange>> {
        let mut sessions = self.write_sessions();
        let registration = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotMonitoring(session_id.to_string()))?;
        Ok(registration.session.transition(state, trigger))
    }

    fn notify(&self, session_id: &str, change: &StateChange) {
        info!(
            session_id,
            from = %change.from,
            to = %change.to,
            trigger = %change.trigger,
            "Process state changed"
        );

        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner()).clone();
        for (index, hook) in hooks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| hook(session_id, change.from, change.to))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(session_id, hook = index, error = %error, "State hook failed"),
                Err(_) => warn!(session_id, hook = index, "State hook panicked"),
            }
        }
    }
}

/// Persist the transition on the blocking pool; the store does synchronous file IO.
async fn write_through(store: Arc<StateStore>, session_id: &str, change: StateChange) {
    let id = session_id.to_string();
    let task = tokio::task::spawn_blocking(move || record_transition(&store, &id, &change));
    if let Err(error) = task.await {
        warn!(session_id, %error, "State write-through task failed");
    }
}

fn record_transition(store: &StateStore, session_id: &str, change: &StateChange) {
    let mut updates = HashMap::new();
    updates.insert(
        FIELD_LAST_STATE.to_string(),
        serde_json::Value::String(change.to.as_str().to_string()),
    );
    updates.insert(
        FIELD_LAST_ACCESS.to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );

    match store.update_session(session_id, updates) {
        Ok(()) => {}
        Err(SessionError::NotFound(_)) => {
            debug!(session_id, "Session not in store, skipping state write-through")
        }
        Err(error) => warn!(session_id, %error, "Failed to persist process state"),
    }
}

async fn poll_loop(shared: Arc<Shared>, session_id: String, cancel: CancellationToken) {
    // first poll one interval after start, not immediately
    let period = shared.config.poll_interval;
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = tick.tick() => {}
        }

        if !shared.is_registered(&session_id) {
            break;
        }

        if let Err(error) = shared.detect_state_change(&session_id).await {
            if error.is_not_found() {
                break;
            }
            debug!(session_id = %session_id, %error, "Poll failed");
        }
    }

    debug!(session_id = %session_id, "Monitor task completed");
}

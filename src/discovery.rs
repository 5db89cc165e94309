//! Reconcile live tmux sessions with the store and the monitor.

use std::collections::HashSet;

use chrono::DateTime;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::monitor::ProcessMonitor;
use crate::naming;
use crate::store::{PersistedSession, StateStore};
use crate::tmux::TmuxSession;

/// One discovery pass over the listed tmux sessions.
///
/// Sessions carrying our ID format are recorded in the store if missing and
/// monitored. Monitored sessions absent from `sessions` are stopped. A session
/// that can't be recorded is still monitored.
pub async fn sync_sessions(
    sessions: &[TmuxSession],
    store: &StateStore,
    monitor: &ProcessMonitor,
) -> Result<()> {
    let ours: Vec<&TmuxSession> = sessions
        .iter()
        .filter(|s| naming::validate_session_id(&s.name))
        .collect();
    let live: HashSet<&str> = ours.iter().map(|s| s.name.as_str()).collect();

    for session in &ours {
        if store.get_session(&session.name).is_err() {
            if let Err(e) = adopt(store, session) {
                warn!(session_id = %session.name, error = %e, "Could not record session");
            }
        }
        if !monitor.is_monitoring(&session.name) {
            if let Err(e) = monitor.start_monitoring(&session.name).await {
                debug!(session_id = %session.name, error = %e, "Could not start monitoring");
            }
        }
    }

    for id in monitor.monitored_sessions() {
        if !live.contains(id.as_str()) {
            monitor.stop_monitoring(&id)?;
        }
    }

    Ok(())
}

/// Record a tmux session we have no stored entry for.
fn adopt(store: &StateStore, session: &TmuxSession) -> Result<()> {
    let (project, worktree, branch) = naming::parse_session_id(&session.name)?;

    let mut record = PersistedSession::new(project, worktree, branch, &session.path);
    record.id = session.name.clone();
    record.name = session.name.clone();
    if let Some(created) = DateTime::from_timestamp(session.created_at as i64, 0) {
        record.created_at = created;
    }

    info!(session_id = %record.id, "Adopting existing tmux session");
    store.add_session(record)
}

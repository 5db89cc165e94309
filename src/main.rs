use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use worktree_sentry::discovery::sync_sessions;
use worktree_sentry::{Config, ProcessMonitor, ProcessState, StateStore, TmuxClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env();

    let store = Arc::new(StateStore::load(&config.state_path).with_context(|| {
        format!("Failed to load state from {}", config.state_path.display())
    })?);
    let client = Arc::new(TmuxClient::new().with_tmux_path(config.tmux_path.clone()));

    match store
        .cleanup_stale_entries(config.stale_after, client.as_ref())
        .await
    {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Dropped sessions that no longer exist"),
        Err(e) => warn!(error = %e, "Stale session cleanup failed"),
    }

    let monitor = ProcessMonitor::new(client.clone(), config.monitor.clone(), Some(store.clone()));
    monitor.register_state_hook(|session_id, from, to| {
        if to == ProcessState::Error {
            warn!(session_id, %from, "Session reported an error");
        }
        Ok(())
    });

    info!(
        state_path = %store.path().display(),
        sessions = store.len(),
        "Worktree sentry started"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut discovery = tokio::time::interval(config.discovery_interval);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            _ = discovery.tick() => {
                match client.list_sessions().await {
                    Ok(sessions) => {
                        if let Err(e) = sync_sessions(&sessions, &store, &monitor).await {
                            warn!(error = %e, "Session discovery failed");
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to list tmux sessions"),
                }
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}

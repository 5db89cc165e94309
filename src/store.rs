//! Durable record of the sessions we manage.
//!
//! The whole map is rewritten on every mutation: serialized as indented JSON
//! to a sibling temp file, then renamed over the real path, so readers never
//! see a half-written file. A file that fails to parse is copied aside to
//! `<path>.backup.<timestamp>` and the store starts empty.
//!
//! A mutation whose write fails is reported as an error but is not rolled
//! back; memory stays ahead of disk until the next successful write.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::monitor::ProcessState;
use crate::naming::{generate_session_id, sanitize};
use crate::tmux::SessionBackend;

/// `update_session` key for [`PersistedSession::last_access`] (RFC 3339 string)
pub const FIELD_LAST_ACCESS: &str = "last_access";
/// `update_session` key for [`PersistedSession::last_state`]
pub const FIELD_LAST_STATE: &str = "last_state";
/// `update_session` key for [`PersistedSession::directory`]
pub const FIELD_DIRECTORY: &str = "directory";
/// `update_session` key for [`PersistedSession::branch`]
pub const FIELD_BRANCH: &str = "branch";

/// Stored metadata for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub id: String,
    pub name: String,
    pub project: String,
    pub worktree: String,
    pub branch: String,
    pub directory: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    #[serde(default)]
    pub last_state: ProcessState,
    /// Extra environment for processes started in the session
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment: HashMap<String, String>,
    /// Open-ended extension data; unknown `update_session` keys land here
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, Value>,
}

impl PersistedSession {
    /// New record whose ID and name are derived from the triple.
    pub fn new(
        project: impl Into<String>,
        worktree: impl Into<String>,
        branch: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        let (project, worktree, branch) = (project.into(), worktree.into(), branch.into());
        let id = generate_session_id(&project, &worktree, &branch);
        let now = Utc::now();

        Self {
            name: id.clone(),
            id,
            project,
            worktree,
            branch,
            directory: directory.into(),
            created_at: now,
            last_access: now,
            last_state: ProcessState::Unknown,
            environment: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    fn identity(&self) -> (String, String, String) {
        (
            sanitize(&self.project),
            sanitize(&self.worktree),
            sanitize(&self.branch),
        )
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize)]
struct StateFileRef<'a> {
    sessions: BTreeMap<&'a str, &'a PersistedSession>,
}

#[derive(Deserialize)]
struct StateFile {
    #[serde(default)]
    sessions: HashMap<String, PersistedSession>,
}

/// File-backed session map, safe to share between tasks in one process.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, PersistedSession>>,
}

impl StateStore {
    /// Open the store at `path`, creating the file if it does not exist.
    ///
    /// A corrupt file never fails the load: it is backed up and the store
    /// starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let store = Self::empty(path);
                store.persist(&store.write())?;
                info!(path = %store.path.display(), "Created new state file");
                return Ok(store);
            }
            Err(source) => return Err(SessionError::Io { path, source }),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty(path));
        }

        match serde_json::from_slice::<StateFile>(&bytes) {
            Ok(file) => {
                debug!(path = %path.display(), sessions = file.sessions.len(), "Loaded state file");
                Ok(Self {
                    path,
                    sessions: RwLock::new(file.sessions),
                })
            }
            Err(error) => {
                let backup = backup_path(&path);
                match fs::copy(&path, &backup) {
                    Ok(_) => warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        %error,
                        "State file is corrupt, backed it up and starting empty"
                    ),
                    Err(copy_error) => warn!(
                        path = %path.display(),
                        %error,
                        %copy_error,
                        "State file is corrupt and could not be backed up, starting empty"
                    ),
                }
                Ok(Self::empty(path))
            }
        }
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Insert (or replace) a session and persist.
    pub fn add_session(&self, session: PersistedSession) -> Result<()> {
        if session.id.trim().is_empty() {
            return Err(SessionError::validation("session id", "must not be empty"));
        }

        let mut sessions = self.write();
        if let Some(existing) = sessions.get(&session.id) {
            if existing.identity() != session.identity() {
                let (project, worktree, branch) = existing.identity();
                return Err(SessionError::IdCollision {
                    id: session.id,
                    existing: format!("{project}/{worktree}/{branch}"),
                });
            }
        }

        debug!(session_id = %session.id, "Adding session");
        sessions.insert(session.id.clone(), session);
        self.persist(&sessions)
    }

    pub fn remove_session(&self, id: &str) -> Result<()> {
        let mut sessions = self.write();
        if sessions.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        debug!(session_id = id, "Removed session");
        self.persist(&sessions)
    }

    /// Apply a set of field updates.
    ///
    /// `last_access`, `last_state`, `directory` and `branch` update the typed
    /// fields; every other key is stored in `metadata` as given. Nothing is
    /// applied if a typed field has a value of the wrong shape.
    pub fn update_session(&self, id: &str, updates: HashMap<String, Value>) -> Result<()> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let mut staged = session.clone();
        for (key, value) in updates {
            match key.as_str() {
                FIELD_LAST_ACCESS => staged.last_access = typed_field(FIELD_LAST_ACCESS, value)?,
                FIELD_LAST_STATE => staged.last_state = typed_field(FIELD_LAST_STATE, value)?,
                FIELD_DIRECTORY => staged.directory = typed_field(FIELD_DIRECTORY, value)?,
                FIELD_BRANCH => staged.branch = typed_field(FIELD_BRANCH, value)?,
                _ => {
                    staged.metadata.insert(key, value);
                }
            }
        }
        *session = staged;

        self.persist(&sessions)
    }

    /// Mark a session as accessed now.
    pub fn touch(&self, id: &str) -> Result<()> {
        let mut updates = HashMap::new();
        updates.insert(FIELD_LAST_ACCESS.to_string(), serde_json::to_value(Utc::now())?);
        self.update_session(id, updates)
    }

    /// Independent copy of one session.
    pub fn get_session(&self, id: &str) -> Result<PersistedSession> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn list_sessions(&self) -> Vec<PersistedSession> {
        self.read().values().cloned().collect()
    }

    pub fn sessions_by_project(&self, project: &str) -> Vec<PersistedSession> {
        self.filter(|s| s.project == project)
    }

    pub fn sessions_by_worktree(&self, worktree: &str) -> Vec<PersistedSession> {
        self.filter(|s| s.worktree == worktree)
    }

    /// Drop entries older than `max_age` whose tmux session is gone.
    ///
    /// An entry whose existence check errors is treated as gone. Returns the
    /// number of entries removed.
    pub async fn cleanup_stale_entries(
        &self,
        max_age: Duration,
        backend: &dyn SessionBackend,
    ) -> Result<usize> {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let candidates: Vec<String> = self
            .read()
            .values()
            .filter(|s| s.last_access < cutoff)
            .map(|s| s.id.clone())
            .collect();

        let mut gone = Vec::new();
        for id in candidates {
            match backend.session_exists(&id).await {
                Ok(true) => {}
                Ok(false) => gone.push(id),
                Err(error) => {
                    debug!(session_id = %id, %error, "Existence check failed, treating as gone");
                    gone.push(id);
                }
            }
        }

        if gone.is_empty() {
            return Ok(0);
        }

        let mut sessions = self.write();
        let mut removed = 0;
        for id in &gone {
            // skip entries touched while we were asking tmux
            let still_stale = sessions.get(id).is_some_and(|s| s.last_access < cutoff);
            if still_stale {
                sessions.remove(id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Removed stale sessions");
            self.persist(&sessions)?;
        }
        Ok(removed)
    }

    fn filter(&self, pred: impl Fn(&PersistedSession) -> bool) -> Vec<PersistedSession> {
        self.read().values().filter(|s| pred(s)).cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, PersistedSession>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, PersistedSession>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the map to disk. Callers hold the write lock.
    fn persist(&self, sessions: &HashMap<String, PersistedSession>) -> Result<()> {
        let file = StateFileRef {
            sessions: sessions.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = temp_path(&self.path);
        fs::write(&temp_path, json).map_err(|source| SessionError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), sessions = sessions.len(), "Persisted state");
        Ok(())
    }
}

fn typed_field<T: serde::de::DeserializeOwned>(field: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| SessionError::validation(field, e.to_string()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup.{}", Utc::now().format("%Y%m%d%H%M%S%3f")));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        (dir, path)
    }

    fn sample() -> PersistedSession {
        let mut session = PersistedSession::new("myapp", "main", "feature/auth", "/src/myapp");
        session.environment.insert("RUST_LOG".into(), "debug".into());
        session
            .metadata
            .insert("agent".into(), Value::String("claude".into()));
        session
    }

    struct FakeTmux {
        alive: HashSet<String>,
        broken: HashSet<String>,
        checked: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SessionBackend for FakeTmux {
        async fn capture_output(&self, _: &str) -> anyhow::Result<String> {
            anyhow::bail!("unused")
        }
        async fn resolve_pid(&self, _: &str) -> anyhow::Result<u32> {
            anyhow::bail!("unused")
        }
        async fn session_exists(&self, id: &str) -> anyhow::Result<bool> {
            self.checked.lock().unwrap().push(id.to_string());
            if self.broken.contains(id) {
                anyhow::bail!("tmux exploded");
            }
            Ok(self.alive.contains(id))
        }
        async fn process_status(&self, _: u32) -> anyhow::Result<String> {
            anyhow::bail!("unused")
        }
    }

    #[test]
    fn test_load_creates_missing_file() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_load_creates_parent_dirs() {
        let (dir, _) = setup();
        let path = dir.path().join("nested").join("deeper").join("state.json");
        StateStore::load(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_empty_file() {
        let (dir, path) = setup();
        fs::write(&path, "").unwrap();
        let store = StateStore::load(&path).unwrap();
        assert!(store.is_empty());

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup."))
            .count();
        assert_eq!(backups, 0);
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let (dir, path) = setup();
        fs::write(&path, b"\x00\x01 definitely { not json").unwrap();

        let store = StateStore::load(&path).unwrap();
        assert!(store.is_empty());

        let prefix = format!("{}.backup.", path.file_name().unwrap().to_string_lossy());
        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read(backups[0].path()).unwrap(),
            b"\x00\x01 definitely { not json"
        );
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        let fetched = store.get_session(&session.id).unwrap();
        assert_eq!(fetched, session);
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        let mut copy = store.get_session(&session.id).unwrap();
        copy.environment.insert("EVIL".into(), "1".into());
        copy.metadata.clear();
        copy.branch = "other".into();

        let again = store.get_session(&session.id).unwrap();
        assert_eq!(again, session);
    }

    #[test]
    fn test_add_rejects_empty_id() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let mut session = sample();
        session.id = String::new();
        let err = store.add_session(session).unwrap_err();
        assert!(matches!(err, SessionError::Validation { .. }));
    }

    #[test]
    fn test_add_detects_id_collision() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let first = sample();
        store.add_session(first.clone()).unwrap();

        let mut other = PersistedSession::new("otherapp", "main", "dev", "/src/other");
        other.id = first.id.clone();
        let err = store.add_session(other).unwrap_err();
        assert!(matches!(err, SessionError::IdCollision { .. }));

        // same triple replaces
        let mut replacement = sample();
        replacement.name = "renamed".into();
        store.add_session(replacement).unwrap();
        assert_eq!(store.get_session(&first.id).unwrap().name, "renamed");
    }

    #[test]
    fn test_persists_across_reload() {
        let (_dir, path) = setup();
        let session = sample();
        {
            let store = StateStore::load(&path).unwrap();
            store.add_session(session.clone()).unwrap();
        }
        let store = StateStore::load(&path).unwrap();
        assert_eq!(store.get_session(&session.id).unwrap(), session);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_file_is_indented_and_keyed_by_id() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["sessions"][&session.id]["branch"], "feature/auth");
        assert_eq!(doc["sessions"][&session.id]["last_state"], "unknown");
    }

    #[test]
    fn test_null_maps_load_as_empty() {
        let (_dir, path) = setup();
        let json = r#"{
          "sessions": {
            "wts-a-b-c": {
              "id": "wts-a-b-c",
              "name": "wts-a-b-c",
              "project": "a",
              "worktree": "b",
              "branch": "c",
              "directory": "/tmp",
              "created_at": "2024-01-01T00:00:00Z",
              "last_access": "2024-01-01T00:00:00Z",
              "environment": null,
              "future_field": 7
            }
          }
        }"#;
        fs::write(&path, json).unwrap();

        let store = StateStore::load(&path).unwrap();
        let session = store.get_session("wts-a-b-c").unwrap();
        assert!(session.environment.is_empty());
        assert!(session.metadata.is_empty());
        assert_eq!(session.last_state, ProcessState::Unknown);
    }

    #[test]
    fn test_remove_session() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        store.remove_session(&session.id).unwrap();
        assert!(store.get_session(&session.id).unwrap_err().is_not_found());
        assert!(store.remove_session(&session.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let err = store.update_session("wts-x-y-z", HashMap::new()).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_update_typed_fields_and_metadata() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        let when: DateTime<Utc> = "2030-05-06T07:08:09Z".parse().unwrap();
        let mut updates = HashMap::new();
        updates.insert(FIELD_LAST_ACCESS.to_string(), serde_json::json!(when));
        updates.insert(FIELD_LAST_STATE.to_string(), serde_json::json!("busy"));
        updates.insert(FIELD_DIRECTORY.to_string(), serde_json::json!("/elsewhere"));
        updates.insert(FIELD_BRANCH.to_string(), serde_json::json!("feature/other"));
        updates.insert("pr_number".to_string(), serde_json::json!(42));
        store.update_session(&session.id, updates).unwrap();

        let updated = store.get_session(&session.id).unwrap();
        assert_eq!(updated.last_access, when);
        assert_eq!(updated.last_state, ProcessState::Busy);
        assert_eq!(updated.directory, PathBuf::from("/elsewhere"));
        assert_eq!(updated.branch, "feature/other");
        assert_eq!(updated.metadata["pr_number"], serde_json::json!(42));
        assert_eq!(updated.metadata["agent"], serde_json::json!("claude"));
        assert!(!updated.metadata.contains_key(FIELD_BRANCH));
    }

    #[test]
    fn test_update_with_bad_value_applies_nothing() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let session = sample();
        store.add_session(session.clone()).unwrap();

        let mut updates = HashMap::new();
        updates.insert(FIELD_LAST_STATE.to_string(), serde_json::json!("sleepy"));
        updates.insert("note".to_string(), serde_json::json!("hello"));
        let err = store.update_session(&session.id, updates).unwrap_err();
        assert!(matches!(err, SessionError::Validation { .. }));
        assert_eq!(store.get_session(&session.id).unwrap(), session);
    }

    #[test]
    fn test_failed_persist_leaves_memory_ahead_of_disk() {
        let (dir, _) = setup();
        let sub = dir.path().join("state");
        let path = sub.join("sessions.json");
        let store = StateStore::load(&path).unwrap();

        fs::remove_dir_all(&sub).unwrap();
        let session = sample();
        let err = store.add_session(session.clone()).unwrap_err();
        assert!(matches!(err, SessionError::Io { .. }));

        // not rolled back
        assert_eq!(store.get_session(&session.id).unwrap(), session);

        // next successful write reconciles
        fs::create_dir_all(&sub).unwrap();
        store.touch(&session.id).unwrap();
        let reloaded = StateStore::load(&path).unwrap();
        assert!(reloaded.get_session(&session.id).is_ok());
    }

    #[test]
    fn test_filters() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        store
            .add_session(PersistedSession::new("app", "main", "a", "/a"))
            .unwrap();
        store
            .add_session(PersistedSession::new("app", "wt2", "b", "/b"))
            .unwrap();
        store
            .add_session(PersistedSession::new("lib", "main", "c", "/c"))
            .unwrap();

        assert_eq!(store.list_sessions().len(), 3);
        assert_eq!(store.sessions_by_project("app").len(), 2);
        assert_eq!(store.sessions_by_worktree("main").len(), 2);
        assert!(store.sessions_by_project("nope").is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_stale_entries() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        let old: DateTime<Utc> = "2020-01-01T00:00:00Z".parse().unwrap();

        let mut alive = PersistedSession::new("app", "main", "alive", "/a");
        alive.last_access = old;
        let mut dead = PersistedSession::new("app", "main", "dead", "/a");
        dead.last_access = old;
        let mut broken = PersistedSession::new("app", "main", "broken", "/a");
        broken.last_access = old;
        let fresh = PersistedSession::new("app", "main", "fresh", "/a");

        for s in [&alive, &dead, &broken, &fresh] {
            store.add_session(s.clone()).unwrap();
        }

        let tmux = FakeTmux {
            alive: HashSet::from([alive.id.clone()]),
            broken: HashSet::from([broken.id.clone()]),
            checked: Mutex::new(Vec::new()),
        };

        let removed = store
            .cleanup_stale_entries(Duration::from_secs(3600), &tmux)
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.get_session(&alive.id).is_ok());
        assert!(store.get_session(&fresh.id).is_ok());
        assert!(store.get_session(&dead.id).is_err());
        assert!(store.get_session(&broken.id).is_err());

        // fresh entries are never checked
        assert!(!tmux.checked.lock().unwrap().contains(&fresh.id));

        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_without_removals_does_not_write() {
        let (_dir, path) = setup();
        let store = StateStore::load(&path).unwrap();
        store.add_session(sample()).unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        let tmux = FakeTmux {
            alive: HashSet::new(),
            broken: HashSet::new(),
            checked: Mutex::new(Vec::new()),
        };
        let removed = store
            .cleanup_stale_entries(Duration::from_secs(3600), &tmux)
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }
}

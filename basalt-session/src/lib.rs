#![deny(missing_docs)]
//! Session persistence for the basalt agent runtime (spec §4.4).
//!
//! Each session is a single JSON document under the store's root
//! directory, written via a temp-file-and-rename pattern to avoid torn
//! reads. Reads tolerate missing or corrupt files rather than erroring —
//! a session lost to disk corruption should not crash the run that
//! discovers it, only skip it.

use std::path::{Path, PathBuf};

use basalt_types::{Role, Session, StorageError};
use chrono::{DateTime, Utc};

/// One entry in `list()`'s chronological summary (spec §4.4).
#[derive(Debug, Clone)]
pub struct SessionListing {
    /// Session id.
    pub id: String,
    /// When the session was created.
    pub start_time: DateTime<Utc>,
    /// Working directory the session was started from, if known.
    pub cwd: Option<String>,
    /// Text of the first user message, if any.
    pub first_prompt: Option<String>,
}

/// JSON-file-backed session store rooted at a single directory.
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Construct a store rooted at `root`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Create a new, empty active session rooted at `cwd`, with best-effort
    /// git branch detection. Does not persist it — call `save` to do that.
    pub async fn create(&self, cwd: Option<String>) -> Session {
        let id = uuid::Uuid::new_v4().to_string();
        let mut session = Session::new(id, Utc::now());
        session.metadata.cwd = cwd.clone();
        session.metadata.git_branch = match cwd {
            Some(dir) => detect_git_branch(Path::new(&dir)).await,
            None => None,
        };
        session
    }

    /// Persist `session` as a single JSON document, replacing any prior
    /// contents for this id atomically (spec §4.4).
    ///
    /// # Errors
    /// Returns `StorageError` if the temp file cannot be written or the
    /// rename into place fails.
    pub async fn save(&self, session: &Session) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&session.metadata.id);
        let tmp_path = self.root.join(format!(".{}.tmp-{}", session.metadata.id, uuid::Uuid::new_v4()));

        let contents = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(path)
    }

    /// Load a session by id. Returns `Ok(None)` if the file is missing or
    /// fails to parse (spec §4.4 "Reads tolerate missing or corrupt
    /// files").
    ///
    /// # Errors
    /// Returns `StorageError` only for I/O failures other than "not found".
    pub async fn load(&self, id: &str) -> Result<Option<Session>, StorageError> {
        let path = self.path_for(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "corrupt session file, skipping");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every persisted session, most recently created first. Corrupt
    /// files are skipped rather than failing the whole listing.
    ///
    /// # Errors
    /// Returns `StorageError` only if the root directory itself cannot be
    /// read (and already exists).
    pub async fn list(&self) -> Result<Vec<SessionListing>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut listings = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };
            if id.starts_with('.') {
                continue; // stray temp file from an interrupted write
            }
            if let Some(session) = self.load(id).await? {
                listings.push(SessionListing {
                    id: session.metadata.id.clone(),
                    start_time: session.metadata.created_at,
                    cwd: session.metadata.cwd.clone(),
                    first_prompt: first_user_text(&session),
                });
            }
        }
        listings.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(listings)
    }

    /// Load the most recently created session, if any exist.
    ///
    /// # Errors
    /// Returns `StorageError` for the same reasons as `list`/`load`.
    pub async fn resume_last(&self) -> Result<Option<Session>, StorageError> {
        let listings = self.list().await?;
        match listings.first() {
            Some(listing) => self.load(&listing.id).await,
            None => Ok(None),
        }
    }
}

fn first_user_text(session: &Session) -> Option<String> {
    session
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.text())
        .filter(|t| !t.is_empty())
}

/// Best-effort, non-fatal git branch detection for a working directory
/// (spec §4.4). Returns `None` on any failure — not a git repo, `git` not
/// on `PATH`, detached HEAD producing no clean name, etc.
async fn detect_git_branch(cwd: &Path) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .arg("rev-parse")
        .arg("--abbrev-ref")
        .arg("HEAD")
        .current_dir(cwd)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8(output.stdout).ok()?;
    let branch = branch.trim();
    if branch.is_empty() || branch == "HEAD" {
        return None;
    }
    Some(branch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::Message;

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let session = store.create(None).await;
        let id = session.metadata.id.clone();

        store.save(&session).await.unwrap();
        let loaded = store.load(&id).await.unwrap().expect("session should load");
        assert_eq!(loaded.metadata.id, id);
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_corrupt_file_returns_none_not_err() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("bad.json"), b"{ not json").await.unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_sorts_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let mut older = store.create(None).await;
        older.metadata.created_at = Utc::now() - chrono::Duration::hours(2);
        store.save(&older).await.unwrap();

        let newer = store.create(None).await;
        store.save(&newer).await.unwrap();

        let listings = store.list().await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, newer.metadata.id);
    }

    #[tokio::test]
    async fn resume_last_returns_most_recent_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let mut session = store.create(None).await;
        session.messages.push(Message::user_text("hello"));
        store.save(&session).await.unwrap();

        let resumed = store.resume_last().await.unwrap().expect("a session exists");
        assert_eq!(resumed.metadata.id, session.metadata.id);
    }

    #[tokio::test]
    async fn resume_last_on_empty_store_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.resume_last().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_user_text_skips_assistant_messages() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let mut session = store.create(None).await;
        session.messages.push(Message::assistant_text("ignored"));
        session.messages.push(Message::user_text("the real prompt"));
        store.save(&session).await.unwrap();

        let listings = store.list().await.unwrap();
        assert_eq!(listings[0].first_prompt.as_deref(), Some("the real prompt"));
    }
}

//! Persistent session storage backed by JSON files.

use crate::error::SessionError;
use crate::types::SessionData;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Longest session id kept verbatim in a file name.
const MAX_SESSION_ID_LEN: usize = 128;

/// File-based session store. Each session is a JSON file in `sessions_dir`.
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    /// Create a new store under `cache_dir`, ensuring the sessions directory exists.
    pub async fn new(cache_dir: &Path) -> Result<Self, SessionError> {
        let sessions_dir = cache_dir.join("sessions");
        tokio::fs::create_dir_all(&sessions_dir).await?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Load a session snapshot. Missing or corrupt records read as a fresh session.
    pub async fn load(&self, session_id: &str) -> Result<SessionData, SessionError> {
        let path = self.session_path(session_id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionData::new(Utc::now()));
            }
            Err(e) => {
                tracing::warn!("Failed to read session {}: {}", path.display(), e);
                return Ok(SessionData::new(Utc::now()));
            }
        };
        match serde_json::from_str::<SessionData>(&data) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!("Discarding corrupt session {}: {}", path.display(), e);
                Ok(SessionData::new(Utc::now()))
            }
        }
    }

    /// Save a session to disk (atomic write: .tmp → rename).
    ///
    /// The temp name carries the process id so concurrent writers never
    /// share a temp file; the last rename wins.
    pub async fn save(&self, session_id: &str, data: &SessionData) -> Result<(), SessionError> {
        let path = self.session_path(session_id)?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Run one read-modify-write cycle and return the closure's result.
    pub async fn update<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionData) -> R,
    ) -> Result<R, SessionError> {
        let mut data = self.load(session_id).await?;
        let result = f(&mut data);
        self.save(session_id, &data).await?;
        Ok(result)
    }

    /// Track a modified file. Returns false if it was already tracked.
    pub async fn add_modified_file(
        &self,
        session_id: &str,
        path: &str,
    ) -> Result<bool, SessionError> {
        let mut data = self.load(session_id).await?;
        if !data.add_modified_file(path) {
            return Ok(false);
        }
        self.save(session_id, &data).await?;
        Ok(true)
    }

    pub async fn record_skill_activation(
        &self,
        session_id: &str,
        skill: &str,
    ) -> Result<(), SessionError> {
        let now = Utc::now();
        self.update(session_id, |data| data.record_activation(skill, now))
            .await
    }

    pub async fn is_recently_activated(
        &self,
        session_id: &str,
        skill: &str,
        window: Duration,
    ) -> Result<bool, SessionError> {
        let data = self.load(session_id).await?;
        Ok(data.is_recently_activated(skill, to_chrono(window), Utc::now()))
    }

    /// Bump the tool use counter and return the new value.
    pub async fn increment_tool_use_count(&self, session_id: &str) -> Result<u64, SessionError> {
        self.update(session_id, SessionData::increment_tool_use_count)
            .await
    }

    /// Drop cooldown entries older than `max_age`. Returns how many were removed.
    pub async fn prune_stale_activations(
        &self,
        session_id: &str,
        max_age: Duration,
    ) -> Result<usize, SessionError> {
        let mut data = self.load(session_id).await?;
        let removed = data.prune_stale_activations(to_chrono(max_age), Utc::now());
        if removed > 0 {
            self.save(session_id, &data).await?;
        }
        Ok(removed)
    }

    pub async fn set_current_prompt_skills(
        &self,
        session_id: &str,
        names: &[String],
    ) -> Result<(), SessionError> {
        self.update(session_id, |data| data.set_current_prompt_skills(names))
            .await
    }

    pub async fn add_active_domains(
        &self,
        session_id: &str,
        names: &[String],
    ) -> Result<(), SessionError> {
        self.update(session_id, |data| data.add_active_domains(names))
            .await
    }

    /// Delete a session record. Deleting an absent session is not an error.
    pub async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        let path = self.session_path(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Garbage-collect session records across all sessions.
    ///
    /// Records whose file is older than `retention` are removed, as are
    /// abandoned temp files. If more than `max_sessions` records remain,
    /// the oldest are removed until the count fits. Returns how many
    /// session records were removed.
    pub async fn cleanup_old_sessions(
        &self,
        retention: Duration,
        max_sessions: usize,
    ) -> Result<usize, SessionError> {
        let now = SystemTime::now();
        let mut kept: Vec<(PathBuf, SystemTime)> = Vec::new();
        let mut removed = 0;

        let mut entries = tokio::fs::read_dir(&self.sessions_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let is_record = name_str.ends_with(".json");
            let is_tmp = name_str.ends_with(".tmp");
            if !is_record && !is_tmp {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or_default();

            if age > retention {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) if is_record => removed += 1,
                    Ok(()) => {}
                    Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
                }
            } else if is_record {
                kept.push((path, modified));
            }
        }

        if kept.len() > max_sessions {
            kept.sort_by(|a, b| a.1.cmp(&b.1));
            let excess = kept.len() - max_sessions;
            for (path, _) in kept.into_iter().take(excess) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {removed} old session record(s)");
        }
        Ok(removed)
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, SessionError> {
        let file_stem = sanitize_session_id(session_id)?;
        Ok(self.sessions_dir.join(format!("{file_stem}.json")))
    }
}

/// Map a host-supplied session id onto a safe file stem.
///
/// Ids made only of `[A-Za-z0-9_-]` are used as-is. Any other id has the
/// offending characters replaced and a digest of the raw id appended, so
/// `a.b` and `a_b` never share a record.
fn sanitize_session_id(session_id: &str) -> Result<String, SessionError> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(SessionError::InvalidSessionId {
            id: session_id.to_string(),
        });
    }
    let is_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if session_id.chars().all(is_safe) {
        return Ok(session_id.to_string());
    }

    let stem: String = session_id
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect();
    let digest = Sha256::digest(session_id.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{stem}-{suffix}"))
}

/// Convert a std window to chrono, saturating on overflow.
pub fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

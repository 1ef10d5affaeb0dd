// src/session/artifacts.rs
// On-disk persistence of browser session state between invocations. Cookies
// and local-storage items are kept in separate JSON files so either side can
// be disabled on its own.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::SessionSnapshot;

pub const COOKIE_FILENAME: &str = "cookie_data.json";
pub const LOCAL_STORAGE_FILENAME: &str = "local_storage_data.json";

pub struct ArtifactStore {
    cookie_path: PathBuf,
    local_storage_path: PathBuf,
    persist_cookies: bool,
    persist_local_storage: bool,
}

impl ArtifactStore {
    pub fn new(state_dir: &Path, persist_cookies: bool, persist_local_storage: bool) -> Self {
        Self {
            cookie_path: state_dir.join(COOKIE_FILENAME),
            local_storage_path: state_dir.join(LOCAL_STORAGE_FILENAME),
            persist_cookies,
            persist_local_storage,
        }
    }

    pub fn enabled(&self) -> bool {
        self.persist_cookies || self.persist_local_storage
    }

    /// Load whatever artifacts exist. Absent or unreadable files fall through
    /// to an empty snapshot, which means a fresh login.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let mut snapshot = SessionSnapshot::default();

        if self.persist_cookies {
            match read_json(&self.cookie_path) {
                Some(cookies) => snapshot.cookies = cookies,
                None => debug!(path = %self.cookie_path.display(), "no cookie artifact"),
            }
        }
        if self.persist_local_storage {
            match read_json(&self.local_storage_path) {
                Some(items) => snapshot.local_storage = items,
                None => debug!(
                    path = %self.local_storage_path.display(),
                    "no local storage artifact"
                ),
            }
        }

        if snapshot.is_empty() {
            None
        } else {
            Some(snapshot)
        }
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if self.persist_cookies {
            let data = serde_json::to_string_pretty(&snapshot.cookies)?;
            fs::write(&self.cookie_path, data)
                .with_context(|| format!("writing {}", self.cookie_path.display()))?;
            debug!(count = snapshot.cookies.len(), "cookie artifact saved");
        }
        if self.persist_local_storage {
            let data = serde_json::to_string_pretty(&snapshot.local_storage)?;
            fs::write(&self.local_storage_path, data)
                .with_context(|| format!("writing {}", self.local_storage_path.display()))?;
            debug!(
                count = snapshot.local_storage.len(),
                "local storage artifact saved"
            );
        }
        Ok(())
    }

    /// Delete persisted artifacts so a poisoned session is never reused.
    pub fn clear(&self) {
        if self.persist_cookies {
            remove_quietly(&self.cookie_path);
        }
        if self.persist_local_storage {
            remove_quietly(&self.local_storage_path);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let data = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "artifact unreadable, ignoring");
            None
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "artifact cleared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot clear artifact"),
    }
}

// src/dedup.rs
// Fingerprint history: the set of entry fingerprints seen on a previous run.
// An entry passes the gate when its fingerprint is not in the set (always
// deny-list semantics). Persisting replaces the file with the fingerprints
// of the current run's full candidate list, so the history tracks what the
// feed currently shows rather than accumulating forever.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::notification::NotificationEntry;

pub const HISTORY_FILENAME: &str = "checksum_history.txt";

#[derive(Debug, Default)]
pub struct FingerprintHistory {
    seen: HashSet<String>,
}

impl FingerprintHistory {
    /// Read the line-delimited history file. Absent or unreadable history is
    /// an empty set; the run then treats everything as new.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => {
                let seen: HashSet<String> = data
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                debug!(count = seen.len(), "fingerprint history loaded");
                Self { seen }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no usable fingerprint history");
                Self::default()
            }
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Entries whose fingerprint has not been seen on a prior run, in input order.
pub fn filter_unseen(
    entries: &[NotificationEntry],
    history: &FingerprintHistory,
) -> Vec<NotificationEntry> {
    let unseen: Vec<NotificationEntry> = entries
        .iter()
        .filter(|e| !history.contains(&e.fingerprint))
        .cloned()
        .collect();
    debug!(
        total = entries.len(),
        unseen = unseen.len(),
        "dedup gate applied"
    );
    unseen
}

/// Replace the history file with the fingerprints of `entries`, one per
/// line, UTF-8, no header. Call only after delivery succeeded.
pub fn persist(path: &Path, entries: &[NotificationEntry]) -> Result<()> {
    let mut written = HashSet::new();
    let lines: Vec<&str> = entries
        .iter()
        .map(|e| e.fingerprint.as_str())
        .filter(|fp| written.insert(*fp))
        .collect();
    let data = lines.join("\n");
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    debug!(count = lines.len(), path = %path.display(), "fingerprint history saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotificationEntry, NotificationKind};

    fn entry(body: &str) -> NotificationEntry {
        NotificationEntry::new(
            NotificationKind::GeneralNotice,
            "08.11.2021".into(),
            String::new(),
            body.into(),
            None,
        )
    }

    #[test]
    fn absent_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = FingerprintHistory::load(&dir.path().join("missing.txt"));
        assert!(history.is_empty());
    }

    #[test]
    fn unseen_filter_drops_known_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILENAME);
        let old = [entry("a"), entry("b")];
        persist(&path, &old).unwrap();

        let history = FingerprintHistory::load(&path);
        assert_eq!(history.len(), 2);

        let current = [entry("b"), entry("c")];
        let unseen = filter_unseen(&current, &history);
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].body, "c");
    }

    #[test]
    fn persist_replaces_prior_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILENAME);
        persist(&path, &[entry("a"), entry("b")]).unwrap();
        persist(&path, &[entry("c")]).unwrap();

        let history = FingerprintHistory::load(&path);
        assert_eq!(history.len(), 1);
        assert!(history.contains(&entry("c").fingerprint));
        assert!(!history.contains(&entry("a").fingerprint));
    }

    #[test]
    fn empty_candidate_list_persists_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILENAME);
        persist(&path, &[entry("a")]).unwrap();
        persist(&path, &[]).unwrap();
        assert!(FingerprintHistory::load(&path).is_empty());
    }
}

// src/notification.rs
use sha2::{Digest, Sha256};

/// Closed set of feed entry categories. The feed renders other labels too;
/// anything that is not a video upload is treated as a general notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    VideoUpload,
    GeneralNotice,
}

/// One feed item, created fresh each run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEntry {
    pub kind: NotificationKind,
    /// Date token exactly as the feed displays it; an opaque key, never parsed.
    pub occurred_on: String,
    /// Required for a video upload, may be empty for a notice.
    pub title: String,
    /// Full rendered text of the entry; the canonical content for identity.
    pub body: String,
    /// Detail page URL, present only for video uploads.
    pub asset_link: Option<String>,
    /// External video URL, populated by link resolution.
    pub resolved_media_link: Option<String>,
    /// Content hash of `body`; the dedup identity key.
    pub fingerprint: String,
    /// Set once a dispatch attempt for this entry has fully succeeded.
    pub delivered: bool,
}

impl NotificationEntry {
    pub fn new(
        kind: NotificationKind,
        occurred_on: String,
        title: String,
        body: String,
        asset_link: Option<String>,
    ) -> Self {
        let fingerprint = fingerprint(&body);
        Self {
            kind,
            occurred_on,
            title,
            body,
            asset_link,
            resolved_media_link: None,
            fingerprint,
            delivered: false,
        }
    }
}

/// Lowercase hex SHA-256 of the entry body. Two entries with the same body
/// are the same notification, whatever their date or title says.
pub fn fingerprint(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

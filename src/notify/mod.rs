// src/notify/mod.rs
pub mod telegram;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::notification::NotificationEntry;

/// Message constraints of a delivery channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelProfile {
    /// Hard cap on one message, in characters.
    pub max_message_len: usize,
    /// What a line break looks like in the channel's markup.
    pub line_break: &'static str,
}

/// One delivery channel. `post` returns `Err` both when the channel rejects
/// the message and when transport fails; the dispatcher does not distinguish.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn profile(&self) -> ChannelProfile;

    async fn post(&self, destination: &str, text: &str) -> Result<()>;
}

/// Render one entry for a channel: body, then (for resolved videos) a blank
/// line and the media link; `&`, `<`, `>` escaped for the channel markup and
/// newlines rewritten to the channel's line break.
///
/// When the escaped text exceeds the cap, the *unescaped* original is
/// truncated to the cap instead; truncating the escaped form could cut an
/// entity reference in half.
pub fn format_message(entry: &NotificationEntry, profile: &ChannelProfile) -> String {
    let mut raw = entry.body.clone();
    if let Some(link) = &entry.resolved_media_link {
        raw.push_str("\n\n");
        raw.push_str(link);
    }

    let escaped = html_escape::encode_text(&raw).replace('\n', profile.line_break);
    if escaped.chars().count() <= profile.max_message_len {
        escaped
    } else {
        raw.chars().take(profile.max_message_len).collect()
    }
}

/// Post every entry, in extraction order, to every destination. The first
/// rejected or undeliverable post fails the whole batch; messages already
/// posted stay posted.
pub async fn dispatch<N: Notifier>(
    entries: &mut [NotificationEntry],
    destinations: &[String],
    notifier: &N,
) -> Result<()> {
    let profile = notifier.profile();
    for entry in entries.iter_mut() {
        let text = format_message(entry, &profile);
        for destination in destinations {
            notifier
                .post(destination, &text)
                .await
                .with_context(|| format!("posting to {destination}"))?;
        }
        entry.delivered = true;
        debug!(fingerprint = %entry.fingerprint, "entry delivered");
    }
    Ok(())
}

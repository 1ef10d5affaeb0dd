// src/pipeline.rs
// One full pass: authenticate → extract → dedup → resolve → dispatch →
// persist. Stages run strictly in sequence on one exclusively-owned browser
// session. A run either completes (history advanced, artifacts refreshed) or
// fails with a stage-distinct error; there is no partial-success status.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::config::BotConfig;
use crate::dedup::{self, FingerprintHistory, HISTORY_FILENAME};
use crate::extract;
use crate::notify::telegram::TelegramNotifier;
use crate::notify::{self, Notifier};
use crate::resolve;
use crate::session::artifacts::ArtifactStore;
use crate::session::cdp::{CdpSession, LaunchOptions};
use crate::session::BrowserSession;
use crate::site;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("login failed")]
    Login,
    #[error("feed extraction failed")]
    Extraction,
    #[error("link resolution failed")]
    LinkResolution,
    #[error("delivery failed: {0:#}")]
    Delivery(#[source] anyhow::Error),
    #[error("history persistence failed: {0:#}")]
    HistoryPersist(#[source] anyhow::Error),
    #[error("unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl RunError {
    /// Stage-distinct process exit code, observable by the invoking scheduler.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Unexpected(_) => 1,
            RunError::Config(_) => 2,
            RunError::Login => 3,
            RunError::Extraction => 4,
            RunError::LinkResolution => 5,
            RunError::Delivery(_) => 6,
            RunError::HistoryPersist(_) => 7,
        }
    }
}

/// What a completed pass did, for the closing log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    /// Entries surviving the temporal + content filters.
    pub candidates: usize,
    /// Entries that passed the dedup gate and were delivered.
    pub delivered: usize,
}

/// Run the pipeline against an already-established session and channel.
/// Persisted session artifacts are cleared on any failure so the next
/// invocation starts from a clean login.
pub async fn run<S: BrowserSession, N: Notifier>(
    session: &S,
    notifier: &N,
    config: &BotConfig,
) -> Result<RunReport, RunError> {
    let artifacts = ArtifactStore::new(
        &config.state_dir,
        config.persist_cookies,
        config.persist_local_storage,
    );
    let result = run_stages(session, notifier, config, &artifacts).await;
    if result.is_err() {
        artifacts.clear();
    }
    result
}

async fn run_stages<S: BrowserSession, N: Notifier>(
    session: &S,
    notifier: &N,
    config: &BotConfig,
    artifacts: &ArtifactStore,
) -> Result<RunReport, RunError> {
    // Re-apply persisted session state before the first probe. A stale or
    // broken snapshot only costs us a full login, so failures are non-fatal.
    if artifacts.enabled() {
        if let Some(snapshot) = artifacts.load() {
            session.navigate(site::HOME_URL).await?;
            if let Err(e) = session.restore(&snapshot).await {
                warn!(error = %e, "could not restore session artifacts");
            }
        }
    }

    if !auth::authenticate(session, &config.login, &config.password).await? {
        return Err(RunError::Login);
    }

    let candidates = extract::extract(
        session,
        config.date_filter().as_ref(),
        config.title_filter().as_ref(),
    )
    .await?
    .ok_or(RunError::Extraction)?;

    let history = FingerprintHistory::load(&history_path(config));
    let mut passed = dedup::filter_unseen(&candidates, &history);
    info!(
        candidates = candidates.len(),
        unseen = passed.len(),
        "feed extracted"
    );

    if !resolve::resolve_links(session, &mut passed).await? {
        return Err(RunError::LinkResolution);
    }

    notify::dispatch(&mut passed, &config.telegram_chat_ids, notifier)
        .await
        .map_err(RunError::Delivery)?;

    // Mark everything seen this run as seen for the next one. Only reached
    // after delivery, so a failed run forces a re-delivery attempt instead
    // of losing a notification.
    dedup::persist(&history_path(config), &candidates).map_err(RunError::HistoryPersist)?;

    // Leave the browser on the home page so the snapshot reflects a neutral,
    // logged-in state.
    if let Err(e) = session.navigate(site::HOME_URL).await {
        warn!(error = %e, "could not reload home before snapshot");
    }
    if artifacts.enabled() {
        let snapshot = session.snapshot().await?;
        artifacts.save(&snapshot)?;
    }

    Ok(RunReport {
        candidates: candidates.len(),
        delivered: passed.len(),
    })
}

pub fn history_path(config: &BotConfig) -> PathBuf {
    config.state_dir.join(HISTORY_FILENAME)
}

/// Launch the real browser and channel bindings, run one pass, and reduce
/// the outcome to a process exit code.
pub async fn execute(config: &BotConfig) -> i32 {
    let options = LaunchOptions {
        headless: config.headless,
        user_data_dir: config.user_data_dir.clone(),
        wait_timeout: Duration::from_millis(config.wait_timeout_ms),
    };
    let session = match CdpSession::launch(&options).await {
        Ok(session) => session,
        Err(e) => {
            let err = RunError::Unexpected(e);
            error!(error = %err, "browser launch failed");
            return err.exit_code();
        }
    };

    let notifier = TelegramNotifier::new(config.telegram_bot_token.clone());

    let code = match run(&session, &notifier, config).await {
        Ok(report) => {
            info!(
                candidates = report.candidates,
                delivered = report.delivered,
                "run complete"
            );
            0
        }
        Err(err) => {
            error!(error = %err, "run failed");
            err.exit_code()
        }
    };

    debug!("closing browser session");
    session
        .close(Duration::from_millis(config.wait_before_quit_ms))
        .await;
    code
}

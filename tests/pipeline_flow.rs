// tests/pipeline_flow.rs
// End-to-end passes over a scripted site: filtering, dedup, link resolution,
// delivery, and what the history file holds afterwards.

use std::path::Path;

use moneytab_notify_bot::config::BotConfig;
use moneytab_notify_bot::dedup::{self, FingerprintHistory};
use moneytab_notify_bot::notification::fingerprint;
use moneytab_notify_bot::pipeline::{self, RunError};
use moneytab_notify_bot::session::artifacts::{ArtifactStore, COOKIE_FILENAME};
use moneytab_notify_bot::session::{SessionSnapshot, StoredCookie};
use moneytab_notify_bot::testing::{MockEntry, MockFrame, MockNotifier, MockSession, MockState};

const DETAIL_URL: &str = "https://www.money-tab.com/video/ep2";
const MEDIA_URL: &str = "https://youtu.be/ep2";

fn test_config(state_dir: &Path) -> BotConfig {
    BotConfig {
        login: "user".into(),
        password: "pass".into(),
        telegram_bot_token: "123:abc".into(),
        telegram_chat_ids: vec!["42".into()],
        state_dir: state_dir.to_path_buf(),
        title_filter: Some("^Episode 1".into()),
        ..BotConfig::default()
    }
}

fn scripted_feed() -> MockState {
    MockState {
        accepts: Some(("user".into(), "pass".into())),
        feed_entries: vec![
            MockEntry::video("08.11.2021", "Episode 1", "video one body", "https://www.money-tab.com/video/ep1"),
            MockEntry::video("08.11.2021", "Episode 2", "video two body", DETAIL_URL),
            MockEntry::notice("09.11.2021", "", "maintenance notice body"),
        ],
        detail_frames: [(DETAIL_URL.to_string(), MockFrame::with_canonical(MEDIA_URL))].into(),
        ..MockState::default()
    }
}

#[tokio::test]
async fn first_run_delivers_filtered_candidates_and_persists_history() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = MockSession::new(scripted_feed());
    let notifier = MockNotifier::new();

    let report = pipeline::run(&session, &notifier, &config).await.unwrap();
    assert_eq!(report.candidates, 2); // Episode 1 dropped by the title filter
    assert_eq!(report.delivered, 2);

    let posts = notifier.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].0, "42");
    // The resolved media link rides along after a blank line.
    assert_eq!(posts[0].1, format!("video two body\n\n{MEDIA_URL}"));
    assert_eq!(posts[1].1, "maintenance notice body");

    let history = FingerprintHistory::load(&pipeline::history_path(&config));
    assert_eq!(history.len(), 2);
    assert!(history.contains(&fingerprint("video two body")));
    assert!(history.contains(&fingerprint("maintenance notice body")));
    assert!(!history.contains(&fingerprint("video one body")));
}

#[tokio::test]
async fn second_run_with_unchanged_feed_delivers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let first = MockSession::new(scripted_feed());
    pipeline::run(&first, &MockNotifier::new(), &config)
        .await
        .unwrap();

    let second = MockSession::new(scripted_feed());
    let notifier = MockNotifier::new();
    let report = pipeline::run(&second, &notifier, &config).await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.delivered, 0);
    assert!(notifier.posts().is_empty());
}

#[tokio::test]
async fn history_covers_candidates_the_dedup_gate_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // Seed history with one of the two candidates; the other is new.
    let seeded = [moneytab_notify_bot::NotificationEntry::new(
        moneytab_notify_bot::NotificationKind::VideoUpload,
        "08.11.2021".into(),
        "Episode 2".into(),
        "video two body".into(),
        None,
    )];
    dedup::persist(&pipeline::history_path(&config), &seeded).unwrap();

    let session = MockSession::new(scripted_feed());
    let notifier = MockNotifier::new();
    let report = pipeline::run(&session, &notifier, &config).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(notifier.posts().len(), 1);

    // Full replacement: the deduped-away candidate is still in the new file.
    let history = FingerprintHistory::load(&pipeline::history_path(&config));
    assert_eq!(history.len(), 2);
    assert!(history.contains(&fingerprint("video two body")));
    assert!(history.contains(&fingerprint("maintenance notice body")));
}

#[tokio::test]
async fn unresolvable_media_link_aborts_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut state = scripted_feed();
    // Player frame exists but carries no canonical link and no nested frame.
    state.detail_frames =
        [(DETAIL_URL.to_string(), MockFrame::default())].into();
    let session = MockSession::new(state);
    let notifier = MockNotifier::new();

    let err = pipeline::run(&session, &notifier, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::LinkResolution));
    assert_eq!(err.exit_code(), 5);
    assert!(notifier.posts().is_empty());
    assert!(!pipeline::history_path(&config).exists());
}

#[tokio::test]
async fn nested_frame_fallback_resolves_the_double_wrapped_embed() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut state = scripted_feed();
    state.detail_frames = [(
        DETAIL_URL.to_string(),
        MockFrame::wrapping(MockFrame::with_canonical(MEDIA_URL)),
    )]
    .into();
    let session = MockSession::new(state);
    let notifier = MockNotifier::new();

    pipeline::run(&session, &notifier, &config).await.unwrap();
    assert_eq!(
        notifier.posts()[0].1,
        format!("video two body\n\n{MEDIA_URL}")
    );
}

#[tokio::test]
async fn delivery_failure_leaves_history_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = MockSession::new(scripted_feed());
    // First post succeeds, second is rejected.
    let notifier = MockNotifier::failing_after(1);

    let err = pipeline::run(&session, &notifier, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Delivery(_)));
    assert_eq!(err.exit_code(), 6);

    // Partial delivery is not rolled back, and nothing was marked seen, so
    // the next run retries the whole batch.
    assert_eq!(notifier.posts().len(), 1);
    assert!(!pipeline::history_path(&config).exists());
}

#[tokio::test]
async fn login_failure_clears_persisted_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let store = ArtifactStore::new(dir.path(), true, true);
    store
        .save(&SessionSnapshot {
            cookies: vec![StoredCookie {
                name: "sid".into(),
                value: "stale".into(),
                domain: ".money-tab.com".into(),
                path: "/".into(),
                http_only: true,
                secure: true,
            }],
            local_storage: Default::default(),
        })
        .unwrap();

    // Site rejects every credential pair.
    let state = MockState {
        accepts: None,
        login_error: Some("帳號或密碼錯誤".into()),
        ..scripted_feed()
    };
    let session = MockSession::new(state);

    let err = pipeline::run(&session, &MockNotifier::new(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Login));
    assert_eq!(err.exit_code(), 3);
    assert!(!dir.path().join(COOKIE_FILENAME).exists());
}

#[tokio::test]
async fn restored_artifacts_skip_the_login_form() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let store = ArtifactStore::new(dir.path(), true, true);
    store
        .save(&SessionSnapshot {
            cookies: vec![StoredCookie {
                name: "sid".into(),
                value: "valid".into(),
                domain: ".money-tab.com".into(),
                path: "/".into(),
                http_only: true,
                secure: true,
            }],
            local_storage: Default::default(),
        })
        .unwrap();

    let state = MockState {
        accepts: None, // the form would reject; only the cookie can log in
        restore_authenticates: true,
        ..scripted_feed()
    };
    let session = MockSession::new(state);
    let notifier = MockNotifier::new();

    let report = pipeline::run(&session, &notifier, &config).await.unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(session.state(|s| s.restored.len()), 1);
    assert!(!session.state(|s| s.login_form_open));
}

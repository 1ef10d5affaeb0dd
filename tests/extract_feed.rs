// tests/extract_feed.rs
// Extraction semantics: redirect vs. empty feed, classification, filter
// application, and the abort-on-malformed-entry contract.

use moneytab_notify_bot::extract::extract;
use moneytab_notify_bot::filter::NotificationFilter;
use moneytab_notify_bot::notification::{fingerprint, NotificationKind};
use moneytab_notify_bot::testing::{MockEntry, MockSession, MockState};

fn logged_in_feed(entries: Vec<MockEntry>) -> MockSession {
    MockSession::new(MockState {
        logged_in: true,
        feed_entries: entries,
        ..MockState::default()
    })
}

#[tokio::test]
async fn redirected_feed_returns_none_not_empty() {
    // Not logged in: the feed page bounces back to the home page.
    let session = MockSession::new(MockState::default());
    let result = extract(&session, None, None).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn authenticated_empty_feed_returns_empty_list() {
    let session = logged_in_feed(Vec::new());
    let result = extract(&session, None, None).await.unwrap();
    assert_eq!(result.unwrap(), Vec::new());
}

#[tokio::test]
async fn entries_are_classified_and_kept_in_document_order() {
    let session = logged_in_feed(vec![
        MockEntry::notice("01.12.2021", "", "notice first"),
        MockEntry::video("02.12.2021", "Ep 5", "video second", "https://www.money-tab.com/video/5"),
        MockEntry::notice("03.12.2021", "", "notice third"),
    ]);
    let entries = extract(&session, None, None).await.unwrap().unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, NotificationKind::GeneralNotice);
    assert_eq!(entries[1].kind, NotificationKind::VideoUpload);
    assert_eq!(entries[2].kind, NotificationKind::GeneralNotice);
    assert_eq!(entries[0].body, "notice first");
    assert_eq!(entries[1].asset_link.as_deref(), Some("https://www.money-tab.com/video/5"));
    assert!(entries[0].asset_link.is_none());
    // Fingerprints are in place straight out of extraction.
    assert_eq!(entries[1].fingerprint, fingerprint("video second"));
}

#[tokio::test]
async fn date_filter_applies_to_every_kind() {
    let session = logged_in_feed(vec![
        MockEntry::video("01.12.2021", "Ep 1", "old video", "https://www.money-tab.com/video/1"),
        MockEntry::notice("01.12.2021", "", "old notice"),
        MockEntry::video("02.12.2021", "Ep 2", "new video", "https://www.money-tab.com/video/2"),
    ]);
    let deny_old = NotificationFilter::parse("^01.12.2021");
    let entries = extract(&session, Some(&deny_old), None).await.unwrap().unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].body, "new video");
}

#[tokio::test]
async fn title_filter_exempts_general_notices() {
    let session = logged_in_feed(vec![
        MockEntry::video("01.12.2021", "Weekly recap", "video body", "https://www.money-tab.com/video/7"),
        MockEntry::notice("01.12.2021", "Weekly recap", "notice body"),
    ]);
    let deny_recap = NotificationFilter::parse("^Weekly recap");
    let entries = extract(&session, None, Some(&deny_recap)).await.unwrap().unwrap();

    // The video is filtered on title; the notice with the same title is not.
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, NotificationKind::GeneralNotice);
    assert_eq!(entries[0].body, "notice body");
}

#[tokio::test]
async fn malformed_entry_aborts_the_whole_extraction() {
    let session = MockSession::new(MockState {
        logged_in: true,
        feed_entries: vec![
            MockEntry::notice("01.12.2021", "", "fine"),
            MockEntry::notice("02.12.2021", "", "broken"),
        ],
        malformed_items: [1usize].into(),
        ..MockState::default()
    });
    let result = extract(&session, None, None).await.unwrap();
    assert!(result.is_none());
}

// tests/dispatch_fanout.rs
// Dispatcher contract: extraction order, entry-major fan-out over the
// destination list, and stop-on-first-failure with no rollback.

use moneytab_notify_bot::notification::{NotificationEntry, NotificationKind};
use moneytab_notify_bot::notify::dispatch;
use moneytab_notify_bot::testing::MockNotifier;

fn entries() -> Vec<NotificationEntry> {
    vec![
        NotificationEntry::new(
            NotificationKind::GeneralNotice,
            "01.12.2021".into(),
            String::new(),
            "first body".into(),
            None,
        ),
        NotificationEntry::new(
            NotificationKind::GeneralNotice,
            "02.12.2021".into(),
            String::new(),
            "second body".into(),
            None,
        ),
    ]
}

#[tokio::test]
async fn every_entry_reaches_every_destination_in_order() {
    let mut batch = entries();
    let destinations = vec!["11".to_string(), "22".to_string()];
    let notifier = MockNotifier::new();

    dispatch(&mut batch, &destinations, &notifier).await.unwrap();

    let posts = notifier.posts();
    let expected = [
        ("11", "first body"),
        ("22", "first body"),
        ("11", "second body"),
        ("22", "second body"),
    ];
    assert_eq!(posts.len(), expected.len());
    for ((dest, text), (want_dest, want_text)) in posts.iter().zip(expected) {
        assert_eq!(dest, want_dest);
        assert_eq!(text, want_text);
    }
    assert!(batch.iter().all(|e| e.delivered));
}

#[tokio::test]
async fn first_rejected_post_fails_the_batch_without_rollback() {
    let mut batch = entries();
    let destinations = vec!["11".to_string(), "22".to_string()];
    // Entry #1 goes out to both destinations, then the channel starts
    // rejecting: entry #2 never completes.
    let notifier = MockNotifier::failing_after(2);

    let err = dispatch(&mut batch, &destinations, &notifier).await;
    assert!(err.is_err());

    assert_eq!(notifier.posts().len(), 2);
    assert!(batch[0].delivered);
    assert!(!batch[1].delivered);
}

#[tokio::test]
async fn markup_is_escaped_for_the_channel() {
    let mut batch = vec![NotificationEntry::new(
        NotificationKind::GeneralNotice,
        "01.12.2021".into(),
        String::new(),
        "tier <VIP> & up".into(),
        None,
    )];
    let notifier = MockNotifier::new();
    dispatch(&mut batch, &["9".to_string()], &notifier)
        .await
        .unwrap();
    assert_eq!(notifier.posts()[0].1, "tier &lt;VIP&gt; &amp; up");
}

/// Message store tests: pairing, append validation, read-marking,
/// echo reconciliation, and the one-way hide transition
use vanishlink_core::error::ChatError;
use vanishlink_core::store::{ChatStore, Message};
use vanishlink_core::types::{DeliveryStatus, UserProfile, VanishOptions};

fn alice() -> UserProfile {
    UserProfile::new("alice", "Alice", false)
}

fn bob_premium() -> UserProfile {
    UserProfile::new("bob", "Bob", true)
}

fn inbound(id: &str, sender: &str, text: &str, timestamp: i64) -> Message {
    Message {
        id: id.to_string(),
        sender_id: sender.to_string(),
        text: text.to_string(),
        timestamp,
        is_read: false,
        is_vanished: false,
        vanish_after: None,
        hidden: false,
        delivery: DeliveryStatus::Delivered,
    }
}

#[tokio::test]
async fn test_self_pairing_rejected() {
    let store = ChatStore::new();
    let result = store.create_conversation("alice", "alice").await;
    assert!(matches!(result, Err(ChatError::InvalidPairing)));
}

#[tokio::test]
async fn test_timestamps_strictly_increase() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let mut last = 0;
    for i in 0..5 {
        let msg = store
            .append_message(
                &conv.id,
                &alice(),
                &format!("msg {}", i),
                VanishOptions::default(),
                10,
            )
            .await
            .unwrap();
        assert!(msg.timestamp > last, "timestamps must strictly increase");
        last = msg.timestamp;
    }
}

#[tokio::test]
async fn test_non_participant_append_rejected_and_log_untouched() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let mallory = UserProfile::new("mallory", "Mallory", false);
    let result = store
        .append_message(&conv.id, &mallory, "sup", VanishOptions::default(), 10)
        .await;

    assert!(matches!(result, Err(ChatError::NotParticipant(ref id)) if id == "mallory"));
    let snapshot = store.conversation(&conv.id).await.unwrap();
    assert!(snapshot.messages.is_empty());
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let result = store
        .append_message(&conv.id, &alice(), "   \n\t ", VanishOptions::default(), 10)
        .await;
    assert!(matches!(result, Err(ChatError::EmptyText)));
}

#[tokio::test]
async fn test_append_to_inactive_conversation_rejected() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    assert!(store.end_conversation(&conv.id).await.unwrap());
    // Second end is a no-op
    assert!(!store.end_conversation(&conv.id).await.unwrap());

    let result = store
        .append_message(&conv.id, &alice(), "too late", VanishOptions::default(), 10)
        .await;
    assert!(matches!(result, Err(ChatError::ConversationInactive)));

    // Messages are kept, not deleted
    assert!(store.conversation(&conv.id).await.is_some());
}

#[tokio::test]
async fn test_mark_read_skips_own_messages_and_is_idempotent() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let a_msg = store
        .append_message(&conv.id, &alice(), "hi", VanishOptions::default(), 10)
        .await
        .unwrap();
    let b_msg = store
        .append_message(&conv.id, &bob_premium(), "hello", VanishOptions::default(), 10)
        .await
        .unwrap();
    assert!(b_msg.timestamp > a_msg.timestamp);

    // Bob reads: Alice's message flips, Bob's own stays unread
    let flipped = store.mark_read(&conv.id, "bob").await.unwrap();
    assert_eq!(flipped, 1);

    let snapshot = store.conversation(&conv.id).await.unwrap();
    let alice_msg = snapshot.messages.iter().find(|m| m.id == a_msg.id).unwrap();
    let bob_msg = snapshot.messages.iter().find(|m| m.id == b_msg.id).unwrap();
    assert!(alice_msg.is_read);
    assert!(!bob_msg.is_read);

    // Calling again changes nothing
    let flipped_again = store.mark_read(&conv.id, "bob").await.unwrap();
    assert_eq!(flipped_again, 0);
}

#[tokio::test]
async fn test_vanish_requires_premium() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let denied = store
        .append_message(&conv.id, &alice(), "secret", VanishOptions::after(5), 10)
        .await;
    assert!(matches!(denied, Err(ChatError::PermissionDenied)));

    let allowed = store
        .append_message(&conv.id, &bob_premium(), "secret", VanishOptions::after(5), 10)
        .await
        .unwrap();
    assert!(allowed.is_vanished);
    assert_eq!(allowed.vanish_after, Some(5));
}

#[tokio::test]
async fn test_vanish_default_countdown_applies() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let msg = store
        .append_message(
            &conv.id,
            &bob_premium(),
            "secret",
            VanishOptions {
                vanish: true,
                after_secs: None,
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(msg.vanish_after, Some(10));
}

#[tokio::test]
async fn test_echo_reconciliation_by_id() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let sent = store
        .append_message(&conv.id, &alice(), "hi", VanishOptions::default(), 10)
        .await
        .unwrap();
    assert_eq!(sent.delivery, DeliveryStatus::Pending);

    // Server echo with the same id: no double insert, delivery upgraded
    let echo = inbound(&sent.id, "alice", "hi", sent.timestamp);
    let applied = store.apply_inbound(&conv.id, echo).await.unwrap();
    assert!(applied.is_none());

    let snapshot = store.conversation(&conv.id).await.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].delivery, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn test_inbound_from_stranger_rejected() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let result = store
        .apply_inbound(&conv.id, inbound("x1", "mallory", "hi", 1))
        .await;
    assert!(matches!(result, Err(ChatError::NotParticipant(_))));
}

#[tokio::test]
async fn test_inbound_timestamp_never_regresses() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let first = store
        .append_message(&conv.id, &alice(), "hi", VanishOptions::default(), 10)
        .await
        .unwrap();

    // Peer clock far behind ours
    let applied = store
        .apply_inbound(&conv.id, inbound("b1", "bob", "hello", 1))
        .await
        .unwrap()
        .unwrap();
    assert!(applied.timestamp > first.timestamp);
}

#[tokio::test]
async fn test_hide_is_one_way() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let msg = store
        .append_message(&conv.id, &bob_premium(), "secret", VanishOptions::after(5), 10)
        .await
        .unwrap();

    assert!(store.hide_message(&conv.id, &msg.id).await);
    // Already hidden: the transition fires at most once
    assert!(!store.hide_message(&conv.id, &msg.id).await);

    let visible = store.visible_messages(&conv.id).await;
    assert!(visible.is_empty());
    // Still in the underlying log
    let snapshot = store.conversation(&conv.id).await.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.messages[0].hidden);
}

#[tokio::test]
async fn test_hide_ignores_plain_messages_and_missing_targets() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();

    let plain = store
        .append_message(&conv.id, &alice(), "hi", VanishOptions::default(), 10)
        .await
        .unwrap();

    assert!(!store.hide_message(&conv.id, &plain.id).await);
    assert!(!store.hide_message(&conv.id, "no-such-message").await);
    assert!(!store.hide_message("no-such-conversation", &plain.id).await);
}

#[tokio::test]
async fn test_updated_at_bumped_on_append() {
    let store = ChatStore::new();
    let conv = store.create_conversation("alice", "bob").await.unwrap();
    let before = conv.updated_at;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .append_message(&conv.id, &alice(), "hi", VanishOptions::default(), 10)
        .await
        .unwrap();

    let snapshot = store.conversation(&conv.id).await.unwrap();
    assert!(snapshot.updated_at > before);
}

//! End-to-end reconciliation: frames produced by the delivery pipeline fed
//! into the client-side conversation state.

use async_trait::async_trait;
use chat_client::{ConversationAction, ConversationState};
use chat_events::ChannelEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use quantum_chat_service::error::AppResult;
use quantum_chat_service::models::UserProfile;
use quantum_chat_service::services::asset_store::AssetStore;
use quantum_chat_service::services::{MessageService, SendMessagePayload};
use quantum_chat_service::store::MemoryStore;
use quantum_chat_service::websocket::PresenceRegistry;

struct StaticAssetStore;

#[async_trait]
impl AssetStore for StaticAssetStore {
    async fn store_image(&self, _data: Vec<u8>, _content_type: &str) -> AppResult<String> {
        Ok("https://assets.example/chat-media/fixed.png".to_string())
    }
}

async fn next_message_push(rx: &mut UnboundedReceiver<String>) -> chat_events::MessageRecord {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection channel closed");
        if let ChannelEvent::NewMessage { message } = serde_json::from_str(&frame).unwrap() {
            return message;
        }
    }
}

#[tokio::test]
async fn pushed_frames_reconcile_into_client_state() {
    let store = MemoryStore::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    store
        .add_user(UserProfile {
            id: alice,
            full_name: "Alice".into(),
            email: "alice@example.com".into(),
            profile_pic: None,
            bio: None,
        })
        .await;
    store
        .add_user(UserProfile {
            id: bob,
            full_name: "Bob".into(),
            email: "bob@example.com".into(),
            profile_pic: None,
            bio: None,
        })
        .await;

    let registry = PresenceRegistry::new();
    let (_, mut alice_rx) = registry.connect(alice).await;
    let (_, mut bob_rx) = registry.connect(bob).await;

    // both clients have each other's conversation open
    let mut alice_state = ConversationState::new(alice);
    alice_state.open_conversation(bob, vec![]);
    let mut bob_state = ConversationState::new(bob);
    bob_state.open_conversation(alice, vec![]);

    let ack = MessageService::send_message(
        &store,
        &store,
        &StaticAssetStore,
        &registry,
        alice,
        bob,
        SendMessagePayload {
            text: Some("hello bob".into()),
            image: None,
        },
    )
    .await
    .unwrap();

    // sender folds in the synchronous ack, then receives her own echo —
    // the id-keyed insert keeps the list at one entry
    alice_state.record_send_ack(ack.clone());
    let echo = next_message_push(&mut alice_rx).await;
    assert_eq!(echo.id, ack.id);
    assert_eq!(alice_state.handle_new_message(echo), None);
    assert_eq!(alice_state.messages().len(), 1);
    assert_eq!(
        alice_state.messages()[0].message_text.as_deref(),
        Some("hello bob"),
        "sender view decrypts through the shared pair key"
    );

    // receiver gets the push, decrypts, marks seen and acks
    let pushed = next_message_push(&mut bob_rx).await;
    let action = bob_state.handle_new_message(pushed);
    assert_eq!(action, Some(ConversationAction::MarkSeen(ack.id)));
    assert_eq!(
        bob_state.messages()[0].message_text.as_deref(),
        Some("hello bob")
    );
    assert!(bob_state.messages()[0].seen);

    // the socket-driven ack reaches the store through the seen mark
    MessageService::mark_message_seen(&store, ack.id).await.unwrap();
    let history = MessageService::conversation_with(&store, bob, alice).await.unwrap();
    assert!(history[0].seen);
}

use async_trait::async_trait;
use chat_events::ChannelEvent;
use uuid::Uuid;

use quantum_chat_service::error::{AppError, AppResult};
use quantum_chat_service::models::UserProfile;
use quantum_chat_service::services::asset_store::AssetStore;
use quantum_chat_service::services::{MessageService, SendMessagePayload};
use quantum_chat_service::store::{MemoryStore, MessageStore};
use quantum_chat_service::websocket::PresenceRegistry;

const UPLOADED_URL: &str = "https://assets.example/chat-media/fixed.png";

struct StaticAssetStore;

#[async_trait]
impl AssetStore for StaticAssetStore {
    async fn store_image(&self, _data: Vec<u8>, _content_type: &str) -> AppResult<String> {
        Ok(UPLOADED_URL.to_string())
    }
}

struct FailingAssetStore;

#[async_trait]
impl AssetStore for FailingAssetStore {
    async fn store_image(&self, _data: Vec<u8>, _content_type: &str) -> AppResult<String> {
        Err(AppError::AssetStore("upload failed".into()))
    }
}

fn profile(name: &str) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        profile_pic: None,
        bio: None,
    }
}

async fn seeded_store() -> (MemoryStore, Uuid, Uuid) {
    let store = MemoryStore::new();
    let alice = profile("Alice");
    let bob = profile("Bob");
    let (a, b) = (alice.id, bob.id);
    store.add_user(alice).await;
    store.add_user(bob).await;
    (store, a, b)
}

fn text_payload(text: &str) -> SendMessagePayload {
    SendMessagePayload {
        text: Some(text.to_string()),
        image: None,
    }
}

#[tokio::test]
async fn empty_payload_is_rejected_with_nothing_persisted() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    for payload in [
        SendMessagePayload::default(),
        text_payload("   "),
    ] {
        let result = MessageService::send_message(
            &store, &store, &StaticAssetStore, &registry, alice, bob, payload,
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    assert!(store.conversation_between(alice, bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_receiver_is_rejected_with_nothing_persisted() {
    let (store, alice, _) = seeded_store().await;
    let registry = PresenceRegistry::new();
    let stranger = Uuid::new_v4();

    let result = MessageService::send_message(
        &store,
        &store,
        &StaticAssetStore,
        &registry,
        alice,
        stranger,
        text_payload("anyone there?"),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound)));
    assert!(store.conversation_between(alice, stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn send_to_offline_peer_is_durable_and_unseen() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    let ack = MessageService::send_message(
        &store,
        &store,
        &StaticAssetStore,
        &registry,
        alice,
        bob,
        text_payload("hello bob"),
    )
    .await
    .unwrap();

    // stored ciphertext, not plaintext
    let stored_text = ack.message_text.as_deref().unwrap();
    assert!(stored_text.contains(":QKD:"));
    assert_ne!(stored_text, "hello bob");

    let history = store.conversation_between(bob, alice).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].seen);
    assert_eq!(history[0].id, ack.id);

    // the recipient can decrypt with the same identifier pair
    let decrypted =
        chat_crypto::decrypt(stored_text, &bob.to_string(), &alice.to_string());
    assert_eq!(decrypted, "hello bob");
}

#[tokio::test]
async fn history_fetch_marks_peer_messages_seen() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    for text in ["one", "two", "three"] {
        MessageService::send_message(
            &store, &store, &StaticAssetStore, &registry, alice, bob,
            text_payload(text),
        )
        .await
        .unwrap();
    }
    assert_eq!(store.unseen_count_from(alice, bob).await.unwrap(), 3);

    let history = MessageService::conversation_with(&store, bob, alice).await.unwrap();
    assert_eq!(history.len(), 3);

    assert_eq!(
        store.unseen_count_from(alice, bob).await.unwrap(),
        0,
        "read-on-fetch must mark everything the peer sent"
    );
}

#[tokio::test]
async fn live_push_reaches_receiver_and_senders_other_session() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    let (_, mut alice_rx) = registry.connect(alice).await;
    let (_, mut bob_rx) = registry.connect(bob).await;

    let ack = MessageService::send_message(
        &store,
        &store,
        &StaticAssetStore,
        &registry,
        alice,
        bob,
        text_payload("ping"),
    )
    .await
    .unwrap();

    for rx in [&mut bob_rx, &mut alice_rx] {
        loop {
            let frame = rx.recv().await.expect("push frame");
            match serde_json::from_str::<ChannelEvent>(&frame).unwrap() {
                ChannelEvent::NewMessage { message } => {
                    assert_eq!(message.id, ack.id);
                    break;
                }
                ChannelEvent::PresenceChanged { .. } => continue,
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn raw_upload_is_stored_then_encrypted() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    let ack = MessageService::send_message(
        &store,
        &store,
        &StaticAssetStore,
        &registry,
        alice,
        bob,
        SendMessagePayload {
            text: None,
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
        },
    )
    .await
    .unwrap();

    let stored_image = ack.message_image.as_deref().unwrap();
    assert!(stored_image.contains(":QKD:"));
    assert_eq!(
        chat_crypto::decrypt(stored_image, &alice.to_string(), &bob.to_string()),
        UPLOADED_URL
    );
}

#[tokio::test]
async fn asset_store_failure_aborts_before_persistence() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    let result = MessageService::send_message(
        &store,
        &store,
        &FailingAssetStore,
        &registry,
        alice,
        bob,
        SendMessagePayload {
            text: Some("with a picture".to_string()),
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::AssetStore(_))));
    assert!(store.conversation_between(alice, bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn single_message_mark_seen_is_monotonic() {
    let (store, alice, bob) = seeded_store().await;
    let registry = PresenceRegistry::new();

    let ack = MessageService::send_message(
        &store, &store, &StaticAssetStore, &registry, alice, bob,
        text_payload("mark me"),
    )
    .await
    .unwrap();

    MessageService::mark_message_seen(&store, ack.id).await.unwrap();
    let history = store.conversation_between(alice, bob).await.unwrap();
    assert!(history[0].seen);

    // marking again stays seen
    MessageService::mark_message_seen(&store, ack.id).await.unwrap();
    assert!(store.conversation_between(alice, bob).await.unwrap()[0].seen);
}

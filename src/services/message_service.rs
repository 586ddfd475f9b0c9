//! Message delivery pipeline: validate → upload → encrypt → persist → push.
//!
//! The store and asset-store calls are the only suspension points in a
//! send; recipient connections are resolved through the registry after
//! persistence completes, never from a snapshot taken before an await.

use chat_events::{ChannelEvent, MessageRecord};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::asset_store::{self, AssetStore};
use crate::store::{MessageStore, UserStore};
use crate::websocket::PresenceRegistry;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessagePayload {
    pub text: Option<String>,
    pub image: Option<String>,
}

impl SendMessagePayload {
    fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn is_empty(&self) -> bool {
        self.text().is_none() && self.image.is_none()
    }
}

pub struct MessageService;

impl MessageService {
    /// Send one message. Returns the persisted record as the synchronous
    /// acknowledgment; live pushes to both parties are best-effort.
    pub async fn send_message(
        store: &dyn MessageStore,
        users: &dyn UserStore,
        assets: &dyn AssetStore,
        registry: &PresenceRegistry,
        sender_id: Uuid,
        receiver_id: Uuid,
        payload: SendMessagePayload,
    ) -> AppResult<MessageRecord> {
        if payload.is_empty() {
            return Err(AppError::BadRequest("message cannot be empty".into()));
        }
        if !users.user_exists(receiver_id).await? {
            return Err(AppError::NotFound);
        }

        let sender_key = sender_id.to_string();
        let receiver_key = receiver_id.to_string();

        // Raw uploads go to the asset store first; a failure here aborts
        // the send with nothing persisted.
        let image_url = match payload.image.as_deref() {
            Some(image) if asset_store::is_raw_upload(image) => {
                let (data, content_type) = asset_store::decode_data_uri(image)?;
                Some(assets.store_image(data, &content_type).await?)
            }
            Some(reference) => Some(reference.to_string()),
            None => None,
        };

        let record = MessageRecord {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            message_text: payload
                .text()
                .map(|t| chat_crypto::encrypt(t, &sender_key, &receiver_key)),
            message_image: image_url
                .map(|url| chat_crypto::encrypt(&url, &sender_key, &receiver_key)),
            seen: false,
            created_at: Utc::now(),
        };

        store.insert_message(&record).await?;

        // Registry lookups happen after the insert completed, so devices
        // that (re)connected during the store write still get the push.
        let frame = ChannelEvent::NewMessage {
            message: record.clone(),
        }
        .to_frame();

        if !registry.send_to_user(receiver_id, frame.clone()).await {
            debug!(receiver_id = %receiver_id, "receiver offline, message delivered on next fetch");
        }
        if receiver_id != sender_id {
            // sender's own channel too, to sync other open sessions
            registry.send_to_user(sender_id, frame).await;
        }

        Ok(record)
    }

    /// Full history with a peer, oldest first. Read-on-fetch: every message
    /// the peer sent is marked seen as a side effect of this call.
    pub async fn conversation_with(
        store: &dyn MessageStore,
        me: Uuid,
        peer: Uuid,
    ) -> AppResult<Vec<MessageRecord>> {
        let messages = store.conversation_between(me, peer).await?;
        let marked = store.mark_conversation_seen(peer, me).await?;
        if marked > 0 {
            debug!(peer = %peer, marked, "history fetch marked messages seen");
        }
        Ok(messages)
    }

    /// Single-message seen mark for the socket-driven path.
    pub async fn mark_message_seen(store: &dyn MessageStore, message_id: Uuid) -> AppResult<()> {
        store.mark_seen(message_id).await?;
        Ok(())
    }
}

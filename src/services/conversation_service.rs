//! Peer directory for the conversation list: every other user with
//! presence, the server-computed unseen count, and a last-message summary.
//! The unseen counts returned here are the canonical source; clients only
//! mirror them between loads.

use std::collections::{HashMap, HashSet};

use chat_events::IMAGE_PLACEHOLDER;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserProfile;
use crate::store::{MessageStore, UserStore};
use crate::websocket::PresenceRegistry;

#[derive(Debug, Clone, Serialize)]
pub struct PeerEntry {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub online: bool,
}

/// Summary text is the stored ciphertext (or the image placeholder); the
/// client decrypts for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageSummary {
    pub text: String,
    pub time: DateTime<Utc>,
    pub sender_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDirectory {
    pub users: Vec<PeerEntry>,
    pub unseen_messages: HashMap<Uuid, i64>,
    pub last_messages: HashMap<Uuid, LastMessageSummary>,
}

pub struct ConversationService;

impl ConversationService {
    pub async fn list_peers(
        store: &dyn MessageStore,
        users: &dyn UserStore,
        registry: &PresenceRegistry,
        me: Uuid,
    ) -> AppResult<PeerDirectory> {
        let profiles = users.list_profiles_except(me).await?;
        let online: HashSet<Uuid> = registry.online_users().await.into_iter().collect();

        let mut unseen_messages = HashMap::new();
        let mut last_messages = HashMap::new();
        let mut entries = Vec::with_capacity(profiles.len());

        for profile in profiles {
            let peer = profile.id;

            let unseen = store.unseen_count_from(peer, me).await?;
            if unseen > 0 {
                unseen_messages.insert(peer, unseen);
            }

            if let Some(last) = store.last_message_between(me, peer).await? {
                let text = match (&last.message_text, &last.message_image) {
                    (Some(text), _) => text.clone(),
                    (None, Some(_)) => IMAGE_PLACEHOLDER.to_string(),
                    (None, None) => String::new(),
                };
                last_messages.insert(
                    peer,
                    LastMessageSummary {
                        text,
                        time: last.created_at,
                        sender_id: last.sender_id,
                    },
                );
            }

            entries.push(PeerEntry {
                online: online.contains(&peer),
                profile,
            });
        }

        Ok(PeerDirectory {
            users: entries,
            unseen_messages,
            last_messages,
        })
    }
}

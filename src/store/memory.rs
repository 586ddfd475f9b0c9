use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chat_events::MessageRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserProfile;
use crate::store::{MessageStore, UserStore};

/// In-memory store implementing both store traits. Backs the test suite
/// and storeless local runs; not durable.
#[derive(Default, Clone)]
pub struct MemoryStore {
    messages: Arc<RwLock<Vec<MessageRecord>>>,
    users: Arc<RwLock<HashMap<Uuid, UserProfile>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id, profile);
    }
}

fn between(record: &MessageRecord, a: Uuid, b: Uuid) -> bool {
    (record.sender_id == a && record.receiver_id == b)
        || (record.sender_id == b && record.receiver_id == a)
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, record: &MessageRecord) -> AppResult<()> {
        self.messages.write().await.push(record.clone());
        Ok(())
    }

    async fn conversation_between(&self, a: Uuid, b: Uuid) -> AppResult<Vec<MessageRecord>> {
        let mut records: Vec<MessageRecord> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| between(m, a, b))
            .cloned()
            .collect();
        records.sort_by_key(|m| m.created_at);
        Ok(records)
    }

    async fn mark_seen(&self, message_id: Uuid) -> AppResult<bool> {
        let mut messages = self.messages.write().await;
        for record in messages.iter_mut() {
            if record.id == message_id && !record.seen {
                record.seen = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_conversation_seen(&self, sender: Uuid, receiver: Uuid) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for record in messages.iter_mut() {
            if record.sender_id == sender && record.receiver_id == receiver && !record.seen {
                record.seen = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unseen_count_from(&self, sender: Uuid, receiver: Uuid) -> AppResult<i64> {
        let count = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.sender_id == sender && m.receiver_id == receiver && !m.seen)
            .count();
        Ok(count as i64)
    }

    async fn last_message_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<MessageRecord>> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| between(m, a, b))
            .max_by_key(|m| m.created_at)
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.read().await.contains_key(&id))
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list_profiles_except(&self, id: Uuid) -> AppResult<Vec<UserProfile>> {
        let mut profiles: Vec<UserProfile> = self
            .users
            .read()
            .await
            .values()
            .filter(|p| p.id != id)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }
}

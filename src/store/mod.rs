//! Trait seam over the durable store. The persistence engine is opaque to
//! the pipeline: services only see these traits, backed by Postgres in
//! production and by [`memory::MemoryStore`] in tests.

use async_trait::async_trait;
use chat_events::MessageRecord;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserProfile;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist an immutable message record.
    async fn insert_message(&self, record: &MessageRecord) -> AppResult<()>;

    /// Full conversation between two users, oldest first.
    async fn conversation_between(&self, a: Uuid, b: Uuid) -> AppResult<Vec<MessageRecord>>;

    /// Mark one message seen. `seen` only ever transitions false→true.
    /// Returns whether a row was updated.
    async fn mark_seen(&self, message_id: Uuid) -> AppResult<bool>;

    /// Mark every message from `sender` to `receiver` seen (read-on-fetch).
    /// Returns the number of rows updated.
    async fn mark_conversation_seen(&self, sender: Uuid, receiver: Uuid) -> AppResult<u64>;

    /// Server-computed unseen count: messages from `sender` to `receiver`
    /// with `seen = false`.
    async fn unseen_count_from(&self, sender: Uuid, receiver: Uuid) -> AppResult<i64>;

    /// Most recent message between two users, if any.
    async fn last_message_between(&self, a: Uuid, b: Uuid)
        -> AppResult<Option<MessageRecord>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_exists(&self, id: Uuid) -> AppResult<bool>;

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<UserProfile>>;

    /// Every known user except `id`, for the peer directory.
    async fn list_profiles_except(&self, id: Uuid) -> AppResult<Vec<UserProfile>>;
}

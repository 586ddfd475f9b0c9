use async_trait::async_trait;
use chat_events::MessageRecord;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserProfile;
use crate::store::{MessageStore, UserStore};

/// Durable store backed by Postgres. One struct implements both store
/// traits so a single pool serves the whole pipeline.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &Row) -> MessageRecord {
    MessageRecord {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        message_text: row.get("message_text"),
        message_image: row.get("message_image"),
        seen: row.get("seen"),
        created_at: row.get("created_at"),
    }
}

fn profile_from_row(row: &Row) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        profile_pic: row.get("profile_pic"),
        bio: row.get("bio"),
    }
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn insert_message(&self, record: &MessageRecord) -> AppResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO messages (id, sender_id, receiver_id, message_text, message_image, seen, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &record.id,
                    &record.sender_id,
                    &record.receiver_id,
                    &record.message_text,
                    &record.message_image,
                    &record.seen,
                    &record.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn conversation_between(&self, a: Uuid, b: Uuid) -> AppResult<Vec<MessageRecord>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, sender_id, receiver_id, message_text, message_image, seen, created_at
                FROM messages
                WHERE (sender_id = $1 AND receiver_id = $2)
                   OR (sender_id = $2 AND receiver_id = $1)
                ORDER BY created_at ASC
                "#,
                &[&a, &b],
            )
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn mark_seen(&self, message_id: Uuid) -> AppResult<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE messages SET seen = TRUE WHERE id = $1 AND seen = FALSE",
                &[&message_id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn mark_conversation_seen(&self, sender: Uuid, receiver: Uuid) -> AppResult<u64> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE messages SET seen = TRUE WHERE sender_id = $1 AND receiver_id = $2 AND seen = FALSE",
                &[&sender, &receiver],
            )
            .await?;
        Ok(updated)
    }

    async fn unseen_count_from(&self, sender: Uuid, receiver: Uuid) -> AppResult<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM messages WHERE sender_id = $1 AND receiver_id = $2 AND seen = FALSE",
                &[&sender, &receiver],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn last_message_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<MessageRecord>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, sender_id, receiver_id, message_text, message_image, seen, created_at
                FROM messages
                WHERE (sender_id = $1 AND receiver_id = $2)
                   OR (sender_id = $2 AND receiver_id = $1)
                ORDER BY created_at DESC
                LIMIT 1
                "#,
                &[&a, &b],
            )
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)", &[&id])
            .await?;
        Ok(row.get(0))
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, full_name, email, profile_pic, bio FROM users WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn list_profiles_except(&self, id: Uuid) -> AppResult<Vec<UserProfile>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, full_name, email, profile_pic, bio FROM users WHERE id <> $1 ORDER BY full_name ASC",
                &[&id],
            )
            .await?;
        Ok(rows.iter().map(profile_from_row).collect())
    }
}

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::error::{AppError, AppResult};

pub async fn init_pool(database_url: &str) -> AppResult<Pool> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e| AppError::Config(format!("DATABASE_URL parse: {e}")))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    let pool = Pool::builder(manager)
        .max_size(16)
        .build()
        .map_err(|e| AppError::StartServer(format!("pool build: {e}")))?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

// Idempotent DDL run at startup. The users table is owned by the identity
// service; it is created here only so local runs work against an empty
// database.
async fn ensure_schema(pool: &Pool) -> AppResult<()> {
    let client = pool.get().await?;
    client
        .batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                profile_pic TEXT,
                bio TEXT
            );

            CREATE TABLE IF NOT EXISTS messages (
                id UUID PRIMARY KEY,
                sender_id UUID NOT NULL,
                receiver_id UUID NOT NULL,
                message_text TEXT,
                message_image TEXT,
                seen BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE INDEX IF NOT EXISTS idx_messages_dyad
                ON messages (sender_id, receiver_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_messages_unseen
                ON messages (receiver_id, seen);
            "#,
        )
        .await?;
    Ok(())
}

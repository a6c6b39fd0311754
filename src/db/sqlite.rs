use super::{SessionStore, StoreData};
use crate::error::{Error, Result};
use crate::models::Session;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, migrate::MigrateDatabase};

/// One row per session; the session itself is kept as a JSON body.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                key TEXT PRIMARY KEY,
                host TEXT NOT NULL,
                stage TEXT NOT NULL,
                version INTEGER NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn load(&self) -> Result<StoreData> {
        let rows = sqlx::query("SELECT key, body FROM sessions ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        let mut data = StoreData::default();
        for row in rows {
            let key = row.get::<String, _>("key");
            let body = row.get::<String, _>("body");
            data.sessions.insert(key, serde_json::from_str(&body)?);
        }
        Ok(data)
    }

    async fn get(&self, key: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT body FROM sessions WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.get::<String, _>("body"))?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, session: &Session) -> Result<u64> {
        let mut stored = session.clone();
        stored.version = session.version + 1;
        let body = serde_json::to_string(&stored)?;
        let updated_at = Utc::now().to_rfc3339();

        let result = if session.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO sessions (key, host, stage, version, body, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(key) DO NOTHING
                "#,
            )
            .bind(key)
            .bind(&stored.host)
            .bind(stored.stage.as_str())
            .bind(stored.version as i64)
            .bind(&body)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE sessions
                SET host = ?, stage = ?, version = ?, body = ?, updated_at = ?
                WHERE key = ? AND version = ?
                "#,
            )
            .bind(&stored.host)
            .bind(stored.stage.as_str())
            .bind(stored.version as i64)
            .bind(&body)
            .bind(&updated_at)
            .bind(key)
            .bind(session.version as i64)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(key.to_string()));
        }
        debug!("Stored session '{}' at version {}", key, stored.version);
        Ok(stored.version)
    }
}

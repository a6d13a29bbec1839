//! SQLite cache backend.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use mailmirror_imap::{Uid, UidValidity};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::HeaderRecord;
use super::store::CacheStore;
use crate::Result;

/// Repository for mirrored folder state, backed by `SQLite`.
///
/// Headers are stored as JSON documents; the UID set of each folder is a
/// single JSON array so that "never stored" and "stored empty" stay distinct.
#[derive(Debug, Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Default database location under the platform cache directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailmirror")
            .join("cache.db")
    }

    /// Open the database at [`Self::default_path`], creating its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Self::new(&path.to_string_lossy()).await
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cached_headers (
                folder TEXT NOT NULL,
                uid INTEGER NOT NULL,
                header_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (folder, uid)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cached_uids (
                folder TEXT PRIMARY KEY,
                uids_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cached_uid_validity (
                folder TEXT PRIMARY KEY,
                uid_validity INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl CacheStore for CacheRepository {
    async fn get_header(&self, folder: &str, uid: Uid) -> Result<Option<HeaderRecord>> {
        let row = sqlx::query(
            r"SELECT header_json FROM cached_headers WHERE folder = ? AND uid = ?",
        )
        .bind(folder)
        .bind(uid.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("header_json");
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn set_header(&self, folder: &str, header: &HeaderRecord) -> Result<()> {
        let json = serde_json::to_string(header)?;
        sqlx::query(
            r"
            INSERT INTO cached_headers (folder, uid, header_json, cached_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(folder, uid) DO UPDATE SET
                header_json = excluded.header_json,
                cached_at = excluded.cached_at
            ",
        )
        .bind(folder)
        .bind(header.uid.get())
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_header(&self, folder: &str, uid: Uid) -> Result<()> {
        sqlx::query(r"DELETE FROM cached_headers WHERE folder = ? AND uid = ?")
            .bind(folder)
            .bind(uid.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_uids(&self, folder: &str) -> Result<Option<BTreeSet<Uid>>> {
        let row = sqlx::query(r"SELECT uids_json FROM cached_uids WHERE folder = ?")
            .bind(folder)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("uids_json");
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn set_uids(&self, folder: &str, uids: &BTreeSet<Uid>) -> Result<()> {
        let json = serde_json::to_string(uids)?;
        sqlx::query(
            r"
            INSERT INTO cached_uids (folder, uids_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(folder) DO UPDATE SET
                uids_json = excluded.uids_json,
                updated_at = excluded.updated_at
            ",
        )
        .bind(folder)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_uid_validity(&self, folder: &str) -> Result<Option<UidValidity>> {
        let row = sqlx::query(r"SELECT uid_validity FROM cached_uid_validity WHERE folder = ?")
            .bind(folder)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| UidValidity::new(row.get::<u32, _>("uid_validity"))))
    }

    async fn set_uid_validity(&self, folder: &str, validity: UidValidity) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO cached_uid_validity (folder, uid_validity)
            VALUES (?, ?)
            ON CONFLICT(folder) DO UPDATE SET uid_validity = excluded.uid_validity
            ",
        )
        .bind(folder)
        .bind(validity.get())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn invalidate(&self, folder: &str) -> Result<()> {
        sqlx::query(r"DELETE FROM cached_headers WHERE folder = ?")
            .bind(folder)
            .execute(&self.pool)
            .await?;

        sqlx::query(r"DELETE FROM cached_uids WHERE folder = ?")
            .bind(folder)
            .execute(&self.pool)
            .await?;

        sqlx::query(r"DELETE FROM cached_uid_validity WHERE folder = ?")
            .bind(folder)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! Database operations for Recast

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::types::StoredPost;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database at `db_path`, creating file and schema if absent.
    ///
    /// Migrations are tracked, so calling this repeatedly is safe; this is
    /// the bootstrap entry the binaries rely on.
    pub async fn open(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Use forward slashes for the SQLite URL and mode=rwc so the
        // database file is created on first run
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Append a batch of captured posts in a single transaction.
    ///
    /// All-or-nothing: any failure rolls the whole batch back.
    pub async fn insert_posts(&self, posts: &[StoredPost]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

        for post in posts {
            let mentions = serde_json::to_string(&post.mentioned_handles)
                .unwrap_or_else(|_| "[]".to_string());
            let used = if post.used { 1 } else { 0 };
            let deleted = if post.deleted { 1 } else { 0 };

            sqlx::query(
                r#"
                INSERT INTO posts (author_account_id, author_handle, remote_post_id, body_text,
                                   mentioned_handles, canonical_url, created_at, extracted_at,
                                   used, deleted)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(post.author_account_id)
            .bind(&post.author_handle)
            .bind(post.remote_post_id)
            .bind(&post.body_text)
            .bind(mentions)
            .bind(&post.canonical_url)
            .bind(post.created_at)
            .bind(post.extracted_at)
            .bind(used)
            .bind(deleted)
            .execute(&mut *tx)
            .await
            .map_err(DbError::SqlxError)?;
        }

        tx.commit().await.map_err(DbError::SqlxError)?;
        Ok(())
    }

    /// Most recently posted row for an author, by remote post id.
    ///
    /// This is the ingestion watermark: only posts newer than it are fetched.
    pub async fn latest_for_author(&self, author_account_id: i64) -> Result<Option<StoredPost>> {
        let row = sqlx::query(
            r#"
            SELECT record_id, author_account_id, author_handle, remote_post_id, body_text,
                   mentioned_handles, canonical_url, created_at, extracted_at, used, deleted
            FROM posts
            WHERE author_account_id = ?
            ORDER BY remote_post_id DESC
            LIMIT 1
            "#,
        )
        .bind(author_account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| row_to_post(&r)))
    }

    /// One eligible row (unused, not flagged deleted) for an author, picked
    /// uniformly at random among all matches.
    pub async fn random_candidate(&self, author_account_id: i64) -> Result<Option<StoredPost>> {
        let row = sqlx::query(
            r#"
            SELECT record_id, author_account_id, author_handle, remote_post_id, body_text,
                   mentioned_handles, canonical_url, created_at, extracted_at, used, deleted
            FROM posts
            WHERE author_account_id = ? AND used = 0 AND deleted = 0
            ORDER BY RANDOM()
            LIMIT 1
            "#,
        )
        .bind(author_account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| row_to_post(&r)))
    }

    /// Flag a row as republished; it will never be selected again.
    pub async fn mark_used(&self, record_id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET used = 1 WHERE record_id = ?")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Flag a row as deleted remotely; it will never be selected again.
    pub async fn mark_deleted(&self, record_id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET deleted = 1 WHERE record_id = ?")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Bulk administrative reset. The only path that physically deletes rows.
    pub async fn purge_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts")
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected())
    }
}

fn row_to_post(r: &SqliteRow) -> StoredPost {
    let mentioned_handles: Vec<String> =
        serde_json::from_str(&r.get::<String, _>("mentioned_handles")).unwrap_or_default();

    StoredPost {
        record_id: Some(r.get("record_id")),
        author_account_id: r.get("author_account_id"),
        author_handle: r.get("author_handle"),
        remote_post_id: r.get("remote_post_id"),
        body_text: r.get("body_text"),
        mentioned_handles,
        canonical_url: r.get("canonical_url"),
        created_at: r.get("created_at"),
        extracted_at: r.get("extracted_at"),
        used: r.get::<i64, _>("used") != 0,
        deleted: r.get::<i64, _>("deleted") != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Database { pool }
    }

    fn test_post(author_account_id: i64, remote_post_id: i64) -> StoredPost {
        StoredPost {
            record_id: None,
            author_account_id,
            author_handle: "@someone".to_string(),
            remote_post_id,
            body_text: Some(format!("post {}", remote_post_id)),
            mentioned_handles: vec![],
            canonical_url: format!(
                "https://twitter.com/twitter/statuses/{}",
                remote_post_id
            ),
            created_at: 1_600_000_000 + remote_post_id,
            extracted_at: 1_700_000_000,
            used: false,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn test_inserted_rows_have_flags_cleared() {
        let db = test_db().await;

        let posts: Vec<StoredPost> = (1..=5).map(|id| test_post(10, id)).collect();
        db.insert_posts(&posts).await.unwrap();

        for _ in 0..5 {
            let candidate = db.random_candidate(10).await.unwrap().unwrap();
            assert!(!candidate.used);
            assert!(!candidate.deleted);
        }
    }

    #[tokio::test]
    async fn test_latest_for_author_orders_by_remote_post_id() {
        let db = test_db().await;

        // Insertion order is deliberately not id order
        let posts = vec![test_post(10, 5), test_post(10, 9), test_post(10, 3)];
        db.insert_posts(&posts).await.unwrap();

        let latest = db.latest_for_author(10).await.unwrap().unwrap();
        assert_eq!(latest.remote_post_id, 9);
    }

    #[tokio::test]
    async fn test_latest_for_author_empty_store() {
        let db = test_db().await;
        assert!(db.latest_for_author(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_for_author_scoped_to_author() {
        let db = test_db().await;

        db.insert_posts(&[test_post(10, 100), test_post(20, 900)])
            .await
            .unwrap();

        let latest = db.latest_for_author(10).await.unwrap().unwrap();
        assert_eq!(latest.remote_post_id, 100);
    }

    #[tokio::test]
    async fn test_random_candidate_skips_used_and_deleted() {
        let db = test_db().await;

        let mut used = test_post(10, 1);
        used.used = true;
        let mut deleted = test_post(10, 2);
        deleted.deleted = true;
        let eligible = test_post(10, 3);

        db.insert_posts(&[used, deleted, eligible]).await.unwrap();

        for _ in 0..10 {
            let candidate = db.random_candidate(10).await.unwrap().unwrap();
            assert_eq!(candidate.remote_post_id, 3);
        }
    }

    #[tokio::test]
    async fn test_random_candidate_none_when_exhausted() {
        let db = test_db().await;

        let mut post = test_post(10, 1);
        post.used = true;
        db.insert_posts(&[post]).await.unwrap();

        assert!(db.random_candidate(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_random_candidate_scoped_to_author() {
        let db = test_db().await;

        db.insert_posts(&[test_post(20, 1)]).await.unwrap();

        assert!(db.random_candidate(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_used() {
        let db = test_db().await;

        db.insert_posts(&[test_post(10, 1)]).await.unwrap();
        let candidate = db.random_candidate(10).await.unwrap().unwrap();

        db.mark_used(candidate.record_id.unwrap()).await.unwrap();

        assert!(db.random_candidate(10).await.unwrap().is_none());
        let row = db.latest_for_author(10).await.unwrap().unwrap();
        assert!(row.used);
        assert!(!row.deleted);
    }

    #[tokio::test]
    async fn test_mark_deleted() {
        let db = test_db().await;

        db.insert_posts(&[test_post(10, 1)]).await.unwrap();
        let candidate = db.random_candidate(10).await.unwrap().unwrap();

        db.mark_deleted(candidate.record_id.unwrap()).await.unwrap();

        assert!(db.random_candidate(10).await.unwrap().is_none());
        let row = db.latest_for_author(10).await.unwrap().unwrap();
        assert!(row.deleted);
        assert!(!row.used);
    }

    #[tokio::test]
    async fn test_duplicate_remote_post_ids_tolerated() {
        let db = test_db().await;

        db.insert_posts(&[test_post(10, 7)]).await.unwrap();
        // A second ingestion of the same remote post must not fail
        db.insert_posts(&[test_post(10, 7)]).await.unwrap();

        let purged = db.purge_all().await.unwrap();
        assert_eq!(purged, 2);
    }

    #[tokio::test]
    async fn test_mentions_round_trip() {
        let db = test_db().await;

        let mut post = test_post(10, 1);
        post.mentioned_handles = vec!["@alice".to_string(), "@bob".to_string()];
        post.body_text = None;
        db.insert_posts(&[post]).await.unwrap();

        let row = db.latest_for_author(10).await.unwrap().unwrap();
        assert_eq!(
            row.mentioned_handles,
            vec!["@alice".to_string(), "@bob".to_string()]
        );
        assert_eq!(row.body_text, None);
    }

    #[tokio::test]
    async fn test_purge_all_empties_store() {
        let db = test_db().await;

        let posts: Vec<StoredPost> = (1..=3).map(|id| test_post(10, id)).collect();
        db.insert_posts(&posts).await.unwrap();

        assert_eq!(db.purge_all().await.unwrap(), 3);
        assert!(db.latest_for_author(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("recast.db");
        let db_path = db_path.to_str().unwrap();

        let first = Database::open(db_path).await.unwrap();
        first.insert_posts(&[test_post(10, 1)]).await.unwrap();

        // Re-running the bootstrap must neither error nor lose data
        let second = Database::open(db_path).await.unwrap();
        let latest = second.latest_for_author(10).await.unwrap().unwrap();
        assert_eq!(latest.remote_post_id, 1);
    }

    #[tokio::test]
    async fn test_open_with_invalid_path() {
        let result = Database::open("/tmp/recast-test\0invalid.db").await;
        assert!(result.is_err());
    }
}

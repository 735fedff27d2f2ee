//! Timeline ingestion
//!
//! Captures an account's recent posts into the local store, resuming from
//! the stored watermark. Rows are append-only: there is no merge or update
//! path, and re-ingesting a post simply adds another row.

use std::sync::Arc;

use tracing::info;

use crate::api::SocialApi;
use crate::db::Database;
use crate::error::Result;
use crate::types::{RemotePost, StoredPost};

/// Pages requested per ingestion run.
const TIMELINE_PAGES: u32 = 10;
/// Posts per page.
const TIMELINE_PAGE_SIZE: u32 = 20;

pub struct Ingestor {
    db: Database,
    api: Arc<dyn SocialApi>,
}

impl Ingestor {
    pub fn new(db: Database, api: Arc<dyn SocialApi>) -> Self {
        Self { db, api }
    }

    /// Capture posts newer than the stored watermark for `account_id`.
    /// Returns the number of rows inserted.
    pub async fn ingest(&self, account_id: i64) -> Result<usize> {
        let since_id = match self.db.latest_for_author(account_id).await? {
            Some(latest) => {
                info!(
                    account_id,
                    handle = %latest.author_handle,
                    watermark = latest.remote_post_id,
                    "resuming from stored watermark"
                );
                Some(latest.remote_post_id)
            }
            None => {
                info!(account_id, "no stored posts for account");
                None
            }
        };

        let fetched = self
            .api
            .fetch_timeline(account_id, since_id, TIMELINE_PAGES, TIMELINE_PAGE_SIZE)
            .await?;

        let extracted_at = chrono::Utc::now().timestamp();
        let rows: Vec<StoredPost> = fetched
            .iter()
            .filter(|post| !post.is_repost)
            .map(|post| extract(post, extracted_at))
            .collect();

        self.db.insert_posts(&rows).await?;
        info!(account_id, count = rows.len(), "ingested posts");
        Ok(rows.len())
    }
}

/// Flatten a fetched post into its stored form.
///
/// Mentions are best-effort: entries without a handle are skipped rather
/// than failing the batch.
fn extract(post: &RemotePost, extracted_at: i64) -> StoredPost {
    let mentioned_handles = post
        .mentions
        .iter()
        .filter_map(|mention| mention.handle.as_deref())
        .map(|handle| format!("@{}", handle))
        .collect();

    StoredPost {
        record_id: None,
        author_account_id: post.author_id,
        author_handle: format!("@{}", post.author_handle),
        remote_post_id: post.id,
        body_text: post.body_text().map(str::to_string),
        mentioned_handles,
        canonical_url: post.canonical_url.clone(),
        created_at: post.created_at,
        extracted_at,
        used: false,
        deleted: false,
    }
}

//! Candidate selection and republishing
//!
//! One publish attempt: draw a random unused candidate, verify it still
//! exists remotely, decorate it with a caption and donor media, publish with
//! the requested strategy, and flag the row used. Candidates discovered
//! deleted are flagged and never drawn again, so each failed draw shrinks
//! the eligible set.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::SocialApi;
use crate::content;
use crate::db::Database;
use crate::error::{RecastError, Result};
use crate::media::MediaSideloader;
use crate::types::{PublishKind, StoredPost};

/// Upper bound on candidate draws per publish attempt. Exhausting it is
/// reported the same way as an empty store.
const MAX_SELECTION_ATTEMPTS: usize = 32;

/// Outcome of a successful publish attempt.
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub kind: PublishKind,
    /// Remote id of the newly published post.
    pub posted_id: i64,
    /// The stored row that was republished.
    pub source: StoredPost,
}

pub struct Publisher {
    db: Database,
    api: Arc<dyn SocialApi>,
    media: MediaSideloader,
}

impl Publisher {
    pub fn new(db: Database, api: Arc<dyn SocialApi>, media: MediaSideloader) -> Self {
        Self { db, api, media }
    }

    /// Republish one stored post for `account_id` using `kind`.
    ///
    /// # Errors
    ///
    /// Returns `RecastError::NoCandidate` when no eligible row remains, and
    /// propagates API failures — the drawn candidate stays eligible in that
    /// case, since its row is only flagged after a successful publish.
    pub async fn publish_one(
        &self,
        account_id: i64,
        kind: PublishKind,
    ) -> Result<PublishReceipt> {
        for _attempt in 0..MAX_SELECTION_ATTEMPTS {
            let candidate = match self.db.random_candidate(account_id).await? {
                Some(candidate) => candidate,
                None => return Err(RecastError::NoCandidate(account_id)),
            };

            if !self.api.post_exists(candidate.remote_post_id).await? {
                warn!(
                    remote_post_id = candidate.remote_post_id,
                    "candidate deleted remotely, flagging and redrawing"
                );
                if let Some(record_id) = candidate.record_id {
                    self.db.mark_deleted(record_id).await?;
                }
                continue;
            }

            let media = self.media.resolve_media().await?;
            let caption = content::random_caption();

            let posted_id = match kind {
                PublishKind::Reply => {
                    self.api
                        .publish_reply(caption, candidate.remote_post_id, &media)
                        .await?
                }
                PublishKind::Quote => {
                    self.api
                        .publish_quote(caption, &candidate.canonical_url, &media)
                        .await?
                }
                PublishKind::Repost => self.api.publish_repost(candidate.remote_post_id).await?,
            };

            if let Some(record_id) = candidate.record_id {
                self.db.mark_used(record_id).await?;
            }

            info!(
                kind = %kind,
                posted_id,
                source = candidate.remote_post_id,
                caption,
                "republished stored post"
            );
            return Ok(PublishReceipt {
                kind,
                posted_id,
                source: candidate,
            });
        }

        Err(RecastError::NoCandidate(account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{remote_post, MockSocialApi, PublishedAction};
    use crate::types::StoredPost;

    struct Fixture {
        db: Database,
        api: Arc<MockSocialApi>,
        publisher: Publisher,
        _temp_dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("recast.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let api = Arc::new(MockSocialApi::new());
        let scratch = temp_dir.path().join("scratch");
        let media = MediaSideloader::new(
            api.clone(),
            scratch.to_str().unwrap(),
            Vec::new(), // no donor pool: media resolution yields nothing
        );
        let publisher = Publisher::new(db.clone(), api.clone(), media);

        Fixture {
            db,
            api,
            publisher,
            _temp_dir: temp_dir,
        }
    }

    fn stored(author_account_id: i64, remote_post_id: i64) -> StoredPost {
        StoredPost {
            record_id: None,
            author_account_id,
            author_handle: "@someone".to_string(),
            remote_post_id,
            body_text: Some("body".to_string()),
            mentioned_handles: vec![],
            canonical_url: format!(
                "https://twitter.com/twitter/statuses/{}",
                remote_post_id
            ),
            created_at: 1,
            extracted_at: 2,
            used: false,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn test_publish_marks_used_and_composes_once() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100)]).await.unwrap();
        f.api.add_remote_post(remote_post(813286, 100));

        let receipt = f
            .publisher
            .publish_one(813286, PublishKind::Reply)
            .await
            .unwrap();

        assert_eq!(receipt.kind, PublishKind::Reply);
        assert_eq!(receipt.source.remote_post_id, 100);
        assert_eq!(f.api.publish_count(), 1);

        match &f.api.published()[0] {
            PublishedAction::Reply {
                text, in_reply_to, ..
            } => {
                assert_eq!(*in_reply_to, 100);
                assert!(content::CAPTIONS.contains(&text.as_str()));
            }
            other => panic!("expected reply, got {:?}", other),
        }

        let row = f.db.latest_for_author(813286).await.unwrap().unwrap();
        assert!(row.used);
        assert!(!row.deleted);
    }

    #[tokio::test]
    async fn test_publish_flags_deleted_and_exhausts() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100)]).await.unwrap();
        // Post 100 is not registered with the mock: the existence check
        // answers false.

        let result = f.publisher.publish_one(813286, PublishKind::Reply).await;

        match result {
            Err(RecastError::NoCandidate(account)) => assert_eq!(account, 813286),
            other => panic!("expected NoCandidate, got {:?}", other.map(|r| r.kind)),
        }
        assert_eq!(f.api.publish_count(), 0);

        let row = f.db.latest_for_author(813286).await.unwrap().unwrap();
        assert!(row.deleted);
        assert!(!row.used);
    }

    #[tokio::test]
    async fn test_publish_redraws_past_deleted_candidates() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100), stored(813286, 200)])
            .await
            .unwrap();
        // Only 200 still exists remotely
        f.api.add_remote_post(remote_post(813286, 200));

        let receipt = f
            .publisher
            .publish_one(813286, PublishKind::Reply)
            .await
            .unwrap();

        assert_eq!(receipt.source.remote_post_id, 200);
        assert_eq!(f.api.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_stops_at_attempt_cap() {
        let f = fixture().await;
        // More deleted-remotely rows than the cap allows drawing
        let rows: Vec<StoredPost> = (1..=40).map(|id| stored(813286, id)).collect();
        f.db.insert_posts(&rows).await.unwrap();

        let result = f.publisher.publish_one(813286, PublishKind::Reply).await;

        assert!(matches!(result, Err(RecastError::NoCandidate(813286))));
        assert_eq!(f.api.exists_calls().len(), MAX_SELECTION_ATTEMPTS);
        assert_eq!(f.api.publish_count(), 0);
        // Rows beyond the cap were left eligible for the next run
        assert!(f.db.random_candidate(813286).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_publish_empty_store() {
        let f = fixture().await;

        let result = f.publisher.publish_one(813286, PublishKind::Quote).await;
        assert!(matches!(result, Err(RecastError::NoCandidate(813286))));
        assert!(f.api.exists_calls().is_empty());
    }

    #[tokio::test]
    async fn test_publish_quote_uses_canonical_url() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100)]).await.unwrap();
        f.api.add_remote_post(remote_post(813286, 100));

        f.publisher
            .publish_one(813286, PublishKind::Quote)
            .await
            .unwrap();

        match &f.api.published()[0] {
            PublishedAction::Quote { attachment_url, .. } => {
                assert_eq!(
                    attachment_url,
                    "https://twitter.com/twitter/statuses/100"
                );
            }
            other => panic!("expected quote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_repost_dispatch() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100)]).await.unwrap();
        f.api.add_remote_post(remote_post(813286, 100));

        f.publisher
            .publish_one(813286, PublishKind::Repost)
            .await
            .unwrap();

        assert_eq!(
            f.api.published(),
            vec![PublishedAction::Repost { post_id: 100 }]
        );
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_candidate_eligible() {
        let f = fixture().await;
        f.db.insert_posts(&[stored(813286, 100)]).await.unwrap();
        f.api.add_remote_post(remote_post(813286, 100));
        f.api.fail_publishes("service unavailable");

        let result = f.publisher.publish_one(813286, PublishKind::Reply).await;
        assert!(result.is_err());

        // The row was neither used nor flagged deleted
        let row = f.db.latest_for_author(813286).await.unwrap().unwrap();
        assert!(!row.used);
        assert!(!row.deleted);
        assert!(f.db.random_candidate(813286).await.unwrap().is_some());
    }
}

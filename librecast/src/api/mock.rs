//! Mock API client for tests
//!
//! Scriptable stand-in for the real client: serves canned timelines and
//! posts, answers existence checks from a configurable set, records every
//! publish and upload so tests can assert on exactly what went out. Not
//! gated behind `cfg(test)` so integration tests can use it too.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::SocialApi;
use crate::error::{ApiError, Result};
use crate::types::{MediaHandle, RemotePost};

/// One captured publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedAction {
    Reply {
        text: String,
        in_reply_to: i64,
        media: Vec<MediaHandle>,
    },
    Quote {
        text: String,
        attachment_url: String,
        media: Vec<MediaHandle>,
    },
    Repost {
        post_id: i64,
    },
}

#[derive(Default)]
pub struct MockSocialApi {
    /// Posts served by `fetch_timeline`, newest first.
    timeline: Mutex<Vec<RemotePost>>,
    /// Posts served by `get_post`.
    remote_posts: Mutex<Vec<RemotePost>>,
    /// Ids `post_exists` answers `true` for.
    existing_ids: Mutex<HashSet<i64>>,
    /// When set, every publish call fails with this message.
    publish_error: Mutex<Option<String>>,

    published: Mutex<Vec<PublishedAction>>,
    fetch_calls: Mutex<Vec<Option<i64>>>,
    exists_calls: Mutex<Vec<i64>>,
    upload_calls: Mutex<Vec<String>>,
}

impl MockSocialApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue posts for `fetch_timeline` and mark them existing remotely.
    pub fn serve_timeline(&self, posts: Vec<RemotePost>) {
        {
            let mut existing = self.existing_ids.lock().unwrap();
            for post in &posts {
                existing.insert(post.id);
            }
        }
        self.remote_posts.lock().unwrap().extend(posts.clone());
        *self.timeline.lock().unwrap() = posts;
    }

    /// Make a post resolvable via `get_post` and `post_exists`.
    pub fn add_remote_post(&self, post: RemotePost) {
        self.existing_ids.lock().unwrap().insert(post.id);
        self.remote_posts.lock().unwrap().push(post);
    }

    /// Make `post_exists` answer `false` for `post_id`.
    pub fn remove_remote_post(&self, post_id: i64) {
        self.existing_ids.lock().unwrap().remove(&post_id);
        self.remote_posts.lock().unwrap().retain(|p| p.id != post_id);
    }

    /// Make every publish call fail.
    pub fn fail_publishes(&self, message: &str) {
        *self.publish_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn published(&self) -> Vec<PublishedAction> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Each `fetch_timeline` call's `since_id` argument, in call order.
    pub fn fetch_calls(&self) -> Vec<Option<i64>> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn exists_calls(&self) -> Vec<i64> {
        self.exists_calls.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.lock().unwrap().len()
    }

    fn record_publish(&self, action: PublishedAction) -> Result<i64> {
        if let Some(message) = self.publish_error.lock().unwrap().clone() {
            return Err(ApiError::Response(message).into());
        }
        let mut published = self.published.lock().unwrap();
        published.push(action);
        Ok(9_000_000_000 + published.len() as i64)
    }
}

/// Build a minimal remote post for tests. The handle is bare, as the real
/// client returns it; extraction adds the `@` prefix.
pub fn remote_post(author_id: i64, id: i64) -> RemotePost {
    RemotePost {
        id,
        author_id,
        author_handle: "fixture".to_string(),
        full_text: Some(format!("post {}", id)),
        truncated_text: None,
        mentions: vec![],
        created_at: 1_700_000_000 + id,
        is_repost: false,
        attachments: vec![],
        canonical_url: format!("https://twitter.com/twitter/statuses/{}", id),
    }
}

#[async_trait]
impl SocialApi for MockSocialApi {
    async fn fetch_timeline(
        &self,
        account_id: i64,
        since_id: Option<i64>,
        _max_pages: u32,
        _page_size: u32,
    ) -> Result<Vec<RemotePost>> {
        self.fetch_calls.lock().unwrap().push(since_id);

        // Reposts are served as-is; filtering them is the caller's concern.
        let timeline = self.timeline.lock().unwrap();
        Ok(timeline
            .iter()
            .filter(|post| post.author_id == account_id)
            .filter(|post| since_id.is_none_or(|since| post.id > since))
            .cloned()
            .collect())
    }

    async fn get_post(&self, post_id: i64) -> Result<RemotePost> {
        self.remote_posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == post_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("get post {}", post_id)).into())
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        self.exists_calls.lock().unwrap().push(post_id);
        Ok(self.existing_ids.lock().unwrap().contains(&post_id))
    }

    async fn publish_reply(
        &self,
        text: &str,
        in_reply_to: i64,
        media: &[MediaHandle],
    ) -> Result<i64> {
        self.record_publish(PublishedAction::Reply {
            text: text.to_string(),
            in_reply_to,
            media: media.to_vec(),
        })
    }

    async fn publish_quote(
        &self,
        text: &str,
        attachment_url: &str,
        media: &[MediaHandle],
    ) -> Result<i64> {
        self.record_publish(PublishedAction::Quote {
            text: text.to_string(),
            attachment_url: attachment_url.to_string(),
            media: media.to_vec(),
        })
    }

    async fn publish_repost(&self, post_id: i64) -> Result<i64> {
        self.record_publish(PublishedAction::Repost { post_id })
    }

    async fn upload_media(&self, path: &Path) -> Result<MediaHandle> {
        let mut uploads = self.upload_calls.lock().unwrap();
        uploads.push(path.display().to_string());
        Ok(format!("mock-media-{}", uploads.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_timeline_respects_since_id() {
        let api = MockSocialApi::new();
        api.serve_timeline(vec![remote_post(1, 100), remote_post(1, 200)]);

        let all = api.fetch_timeline(1, None, 10, 20).await.unwrap();
        assert_eq!(all.len(), 2);

        let newer = api.fetch_timeline(1, Some(100), 10, 20).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, 200);

        assert_eq!(api.fetch_calls(), vec![None, Some(100)]);
    }

    #[tokio::test]
    async fn test_mock_exists_follows_removals() {
        let api = MockSocialApi::new();
        api.add_remote_post(remote_post(1, 100));

        assert!(api.post_exists(100).await.unwrap());
        api.remove_remote_post(100);
        assert!(!api.post_exists(100).await.unwrap());
        assert!(api.get_post(100).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_records_publishes() {
        let api = MockSocialApi::new();

        api.publish_reply("hi", 5, &[]).await.unwrap();
        api.publish_repost(7).await.unwrap();

        assert_eq!(api.publish_count(), 2);
        match &api.published()[1] {
            PublishedAction::Repost { post_id } => assert_eq!(*post_id, 7),
            other => panic!("expected repost, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_publish_failure() {
        let api = MockSocialApi::new();
        api.fail_publishes("down for maintenance");

        assert!(api.publish_reply("hi", 5, &[]).await.is_err());
        assert_eq!(api.publish_count(), 0);
    }
}

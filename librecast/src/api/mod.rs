//! Social network API abstraction
//!
//! The bot consumes a handful of remote operations through one trait, so the
//! publishing and ingestion logic never touches HTTP directly. The real
//! client lives in [`twitter`]; [`mock`] provides a scriptable stand-in and
//! is compiled into regular builds so integration tests can use it.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MediaHandle, RemotePost};

pub mod mock;
pub mod twitter;

/// Operations the bot consumes from the social network.
///
/// Pagination and rate limiting are the implementation's concern; callers
/// see one logical call per operation. Implementations never embed
/// credentials — they receive them at construction.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Fetch an account's own posts newer than `since_id`, newest first,
    /// excluding reposts of other accounts. At most `max_pages` pages of
    /// `page_size` posts are requested.
    async fn fetch_timeline(
        &self,
        account_id: i64,
        since_id: Option<i64>,
        max_pages: u32,
        page_size: u32,
    ) -> Result<Vec<RemotePost>>;

    /// Fetch one post with full detail, including attached media.
    async fn get_post(&self, post_id: i64) -> Result<RemotePost>;

    /// Whether the post still exists remotely.
    ///
    /// Only a definitive not-found answer yields `false`; transport and
    /// auth failures are errors and must not be mistaken for deletion.
    async fn post_exists(&self, post_id: i64) -> Result<bool>;

    /// Publish a reply to `in_reply_to`, with reply metadata populated.
    /// Returns the new post's remote id.
    async fn publish_reply(
        &self,
        text: &str,
        in_reply_to: i64,
        media: &[MediaHandle],
    ) -> Result<i64>;

    /// Publish a quote of the post at `attachment_url`.
    async fn publish_quote(
        &self,
        text: &str,
        attachment_url: &str,
        media: &[MediaHandle],
    ) -> Result<i64>;

    /// Repost an existing post verbatim.
    async fn publish_repost(&self, post_id: i64) -> Result<i64>;

    /// Upload a local media file, returning the handle to attach to an
    /// outgoing post.
    async fn upload_media(&self, path: &Path) -> Result<MediaHandle>;
}

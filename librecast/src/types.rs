//! Core types for Recast

use serde::{Deserialize, Serialize};

/// One captured remote post, as persisted in the `posts` table.
///
/// Rows are append-only: ingestion creates them, selection flips the flags,
/// and nothing updates them otherwise. `remote_post_id` is not unique —
/// re-ingestion may duplicate rows and duplicates are tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    /// Surrogate key; `None` before the row is inserted.
    pub record_id: Option<i64>,
    pub author_account_id: i64,
    /// `@`-prefixed handle, as captured at extraction time.
    pub author_handle: String,
    pub remote_post_id: i64,
    pub body_text: Option<String>,
    /// `@`-prefixed handles mentioned in the post body.
    pub mentioned_handles: Vec<String>,
    pub canonical_url: String,
    /// Epoch seconds, remote creation time.
    pub created_at: i64,
    /// Epoch seconds, when this row was captured.
    pub extracted_at: i64,
    /// Set once this record has been republished; never selected again.
    pub used: bool,
    /// Set once a remote existence check failed; never selected again.
    pub deleted: bool,
}

/// A post as returned by the social network API.
#[derive(Debug, Clone)]
pub struct RemotePost {
    pub id: i64,
    pub author_id: i64,
    /// Bare handle, without the `@` prefix.
    pub author_handle: String,
    /// Extended body text, when the API returned it.
    pub full_text: Option<String>,
    /// Legacy truncated body text, the fallback.
    pub truncated_text: Option<String>,
    pub mentions: Vec<MentionEntity>,
    /// Epoch seconds.
    pub created_at: i64,
    /// True when this entry is a repost of another account's post.
    pub is_repost: bool,
    pub attachments: Vec<RemoteAttachment>,
    pub canonical_url: String,
}

impl RemotePost {
    /// Body text, preferring the extended field over the truncated one.
    pub fn body_text(&self) -> Option<&str> {
        self.full_text
            .as_deref()
            .or(self.truncated_text.as_deref())
    }
}

/// A mention entry attached to a remote post.
///
/// The handle may be absent when the API returns a malformed entity; such
/// entries are skipped during extraction rather than failing the batch.
#[derive(Debug, Clone, Default)]
pub struct MentionEntity {
    pub handle: Option<String>,
}

/// Media attached to a remote post.
#[derive(Debug, Clone)]
pub enum RemoteAttachment {
    Photo { url: String },
    Video { variants: Vec<VideoVariant> },
}

/// One encoding of a video attachment.
#[derive(Debug, Clone)]
pub struct VideoVariant {
    pub url: String,
    pub content_type: String,
    /// Absent for streaming playlists, which are never downloaded.
    pub bitrate: Option<u64>,
}

/// Identifier handed back by the network after a media upload.
pub type MediaHandle = String;

/// How a selected post gets republished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Reply,
    Quote,
    Repost,
}

impl PublishKind {
    pub const ALL: [PublishKind; 3] = [PublishKind::Reply, PublishKind::Quote, PublishKind::Repost];

    /// Pick a strategy uniformly at random.
    pub fn random() -> Self {
        use rand::seq::SliceRandom;
        Self::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(PublishKind::Reply)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishKind::Reply => "reply",
            PublishKind::Quote => "quote",
            PublishKind::Repost => "repost",
        }
    }
}

impl std::fmt::Display for PublishKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

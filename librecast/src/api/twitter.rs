//! REST client for the social network API
//!
//! Talks to the v1.1 endpoints the bot consumes: timeline paging, status
//! lookup, status publishing, retweeting, and media upload. Authentication
//! uses a per-environment bearer token; rate limiting is left to the
//! server's responses, which surface here as [`ApiError::RateLimit`].

use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::SocialApi;
use crate::config::ApiCredentials;
use crate::error::{ApiError, RecastError, Result};
use crate::types::{MediaHandle, MentionEntity, RemoteAttachment, RemotePost, VideoVariant};

const API_BASE: &str = "https://api.twitter.com/1.1";
const UPLOAD_BASE: &str = "https://upload.twitter.com/1.1";

/// Wire format of status timestamps, e.g. "Wed Oct 10 20:19:24 +0000 2018".
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

pub struct TwitterApi {
    http: reqwest::Client,
    bearer_token: String,
    api_base: String,
    upload_base: String,
}

impl TwitterApi {
    pub fn new(credentials: ApiCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("recast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            bearer_token: credentials.bearer_token,
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{}: {}", context, e)))?;

        let response = check_response(response, context).await?;
        let value = response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Response(format!("{}: {}", context, e)))?;
        Ok(value)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        context: &str,
    ) -> Result<WireStatus> {
        let response = self
            .http
            .post(url)
            .form(form)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{}: {}", context, e)))?;

        let response = check_response(response, context).await?;
        let status = response
            .json::<WireStatus>()
            .await
            .map_err(|e| ApiError::Response(format!("{}: {}", context, e)))?;
        Ok(status)
    }
}

#[async_trait]
impl SocialApi for TwitterApi {
    async fn fetch_timeline(
        &self,
        account_id: i64,
        since_id: Option<i64>,
        max_pages: u32,
        page_size: u32,
    ) -> Result<Vec<RemotePost>> {
        let url = format!("{}/statuses/user_timeline.json", self.api_base);
        let mut posts = Vec::new();
        let mut max_id: Option<i64> = None;

        for _page in 0..max_pages {
            let mut query: Vec<(&str, String)> = vec![
                ("user_id", account_id.to_string()),
                ("count", page_size.to_string()),
                ("include_rts", "false".to_string()),
                ("tweet_mode", "extended".to_string()),
            ];
            if let Some(since) = since_id {
                query.push(("since_id", since.to_string()));
            }
            if let Some(max) = max_id {
                query.push(("max_id", max.to_string()));
            }

            let page: Vec<WireStatus> = self.get_json(&url, &query, "fetch timeline").await?;
            if page.is_empty() {
                break;
            }

            // Next page continues below the oldest id seen so far
            max_id = page.iter().map(|s| s.id).min().map(|id| id - 1);

            for status in page {
                if status.retweeted_status.is_some() {
                    continue;
                }
                posts.push(status_to_post(status)?);
            }
        }

        debug!(account_id, count = posts.len(), "fetched timeline");
        Ok(posts)
    }

    async fn get_post(&self, post_id: i64) -> Result<RemotePost> {
        let url = format!("{}/statuses/show.json", self.api_base);
        let query = vec![
            ("id", post_id.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];

        let status: WireStatus = self
            .get_json(&url, &query, &format!("get post {}", post_id))
            .await?;
        status_to_post(status)
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        match self.get_post(post_id).await {
            Ok(_) => {
                debug!(post_id, "remote post exists");
                Ok(true)
            }
            Err(RecastError::Api(ApiError::NotFound(_))) => {
                debug!(post_id, "remote post no longer exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn publish_reply(
        &self,
        text: &str,
        in_reply_to: i64,
        media: &[MediaHandle],
    ) -> Result<i64> {
        let url = format!("{}/statuses/update.json", self.api_base);
        let mut form: Vec<(&str, String)> = vec![
            ("status", text.to_string()),
            ("in_reply_to_status_id", in_reply_to.to_string()),
            ("auto_populate_reply_metadata", "true".to_string()),
        ];
        if !media.is_empty() {
            form.push(("media_ids", media.join(",")));
        }

        let status = self.post_form(&url, &form, "publish reply").await?;
        info!(posted_id = status.id, in_reply_to, "published reply");
        Ok(status.id)
    }

    async fn publish_quote(
        &self,
        text: &str,
        attachment_url: &str,
        media: &[MediaHandle],
    ) -> Result<i64> {
        let url = format!("{}/statuses/update.json", self.api_base);
        let mut form: Vec<(&str, String)> = vec![
            ("status", text.to_string()),
            ("attachment_url", attachment_url.to_string()),
        ];
        if !media.is_empty() {
            form.push(("media_ids", media.join(",")));
        }

        let status = self.post_form(&url, &form, "publish quote").await?;
        info!(posted_id = status.id, attachment_url, "published quote");
        Ok(status.id)
    }

    async fn publish_repost(&self, post_id: i64) -> Result<i64> {
        let url = format!("{}/statuses/retweet/{}.json", self.api_base, post_id);

        let status = self.post_form(&url, &[], "publish repost").await?;
        info!(posted_id = status.id, source = post_id, "published repost");
        Ok(status.id)
    }

    async fn upload_media(&self, path: &Path) -> Result<MediaHandle> {
        let bytes = tokio::fs::read(path).await.map_err(ApiError::Io)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("media", part);

        let url = format!("{}/media/upload.json", self.upload_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("upload media: {}", e)))?;

        let response = check_response(response, "upload media").await?;
        let uploaded = response
            .json::<WireUploadedMedia>()
            .await
            .map_err(|e| ApiError::Response(format!("upload media: {}", e)))?;

        info!(media_id = %uploaded.media_id_string, "uploaded media");
        Ok(uploaded.media_id_string)
    }
}

/// Map an HTTP response onto the error taxonomy.
///
/// 401/403 are auth problems, 404 is a definitive not-found (the only case
/// `post_exists` treats as deletion), 429 is rate limiting, 5xx is a
/// transport-level failure.
async fn check_response(
    response: reqwest::Response,
    context: &str,
) -> std::result::Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Authentication(format!("{}: {} {}", context, status, body))
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(context.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(format!("{}: {}", context, body)),
        s if s.is_server_error() => ApiError::Network(format!("{}: {}", context, status)),
        _ => ApiError::Response(format!("{}: {} {}", context, status, body)),
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireStatus {
    id: i64,
    created_at: String,
    user: WireUser,
    full_text: Option<String>,
    text: Option<String>,
    #[serde(default)]
    entities: WireEntities,
    extended_entities: Option<WireExtendedEntities>,
    /// Presence marks this entry as a repost of another account's post.
    retweeted_status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
    screen_name: String,
}

#[derive(Debug, Deserialize, Default)]
struct WireEntities {
    #[serde(default)]
    user_mentions: Vec<WireMention>,
}

#[derive(Debug, Deserialize)]
struct WireMention {
    screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireExtendedEntities {
    #[serde(default)]
    media: Vec<WireMedia>,
}

#[derive(Debug, Deserialize)]
struct WireMedia {
    #[serde(rename = "type")]
    kind: String,
    media_url_https: Option<String>,
    video_info: Option<WireVideoInfo>,
}

#[derive(Debug, Deserialize)]
struct WireVideoInfo {
    #[serde(default)]
    variants: Vec<WireVariant>,
}

#[derive(Debug, Deserialize)]
struct WireVariant {
    url: String,
    content_type: String,
    bitrate: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireUploadedMedia {
    media_id_string: String,
}

fn status_to_post(status: WireStatus) -> Result<RemotePost> {
    let created_at = chrono::DateTime::parse_from_str(&status.created_at, CREATED_AT_FORMAT)
        .map_err(|e| {
            ApiError::Response(format!(
                "unparseable created_at '{}': {}",
                status.created_at, e
            ))
        })?
        .timestamp();

    let mentions = status
        .entities
        .user_mentions
        .into_iter()
        .map(|m| MentionEntity {
            handle: m.screen_name,
        })
        .collect();

    let attachments = status
        .extended_entities
        .map(|e| e.media)
        .unwrap_or_default()
        .into_iter()
        .filter_map(media_to_attachment)
        .collect();

    Ok(RemotePost {
        canonical_url: format!("https://twitter.com/twitter/statuses/{}", status.id),
        id: status.id,
        author_id: status.user.id,
        author_handle: status.user.screen_name,
        full_text: status.full_text,
        truncated_text: status.text,
        mentions,
        created_at,
        is_repost: status.retweeted_status.is_some(),
        attachments,
    })
}

fn media_to_attachment(media: WireMedia) -> Option<RemoteAttachment> {
    match media.kind.as_str() {
        "photo" => media
            .media_url_https
            .map(|url| RemoteAttachment::Photo { url }),
        "video" | "animated_gif" => Some(RemoteAttachment::Video {
            variants: media
                .video_info
                .map(|v| v.variants)
                .unwrap_or_default()
                .into_iter()
                .map(|v| VideoVariant {
                    url: v.url,
                    content_type: v.content_type,
                    bitrate: v.bitrate,
                })
                .collect(),
        }),
        _ => None,
    }
}

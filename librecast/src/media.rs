//! Donor media sideloading
//!
//! Resolves attachable media from an unrelated donor post: pick one from a
//! fixed pool, verify it still exists, download its attachments into a
//! scratch directory, and re-upload them to the network. Donor posts are a
//! separate selection path from republish candidates — they are never
//! stored and never flagged used.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::api::SocialApi;
use crate::error::Result;
use crate::types::{MediaHandle, RemoteAttachment, RemotePost, VideoVariant};

/// Download failures are logged and skip the affected item; they never
/// abort a publish attempt.
#[derive(Error, Debug)]
enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct MediaSideloader {
    api: Arc<dyn SocialApi>,
    http: reqwest::Client,
    scratch_dir: PathBuf,
    donor_pool: Vec<String>,
}

impl MediaSideloader {
    pub fn new(api: Arc<dyn SocialApi>, scratch_dir: &str, donor_pool: Vec<String>) -> Self {
        let scratch_dir = PathBuf::from(shellexpand::tilde(scratch_dir).to_string());
        Self {
            api,
            http: reqwest::Client::new(),
            scratch_dir,
            donor_pool,
        }
    }

    /// Resolve media handles for the next outgoing post.
    ///
    /// Returns an empty list when the pool is empty, the chosen donor URL is
    /// unparseable, the donor post is gone, or it carries no attachments.
    pub async fn resolve_media(&self) -> Result<Vec<MediaHandle>> {
        let Some(donor_url) = self.pick_donor() else {
            return Ok(Vec::new());
        };
        let Some(post_id) = parse_post_id(&donor_url) else {
            warn!(url = %donor_url, "donor URL has no parseable post id");
            return Ok(Vec::new());
        };

        if !self.api.post_exists(post_id).await? {
            debug!(post_id, "donor post no longer exists");
            return Ok(Vec::new());
        }

        let donor = self.api.get_post(post_id).await?;
        let sources = attachment_urls(&donor);
        if sources.is_empty() {
            debug!(post_id, "donor post has no attachments");
            return Ok(Vec::new());
        }

        self.reset_scratch_dir().await;

        let mut handles = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            let dest = self.scratch_dir.join(scratch_file_name(index, source));
            match self.download(source, &dest).await {
                Ok(()) => handles.push(self.api.upload_media(&dest).await?),
                Err(e) => warn!(url = %source, error = %e, "media download failed, skipping item"),
            }
        }

        debug!(post_id, count = handles.len(), "sideloaded donor media");
        Ok(handles)
    }

    fn pick_donor(&self) -> Option<String> {
        use rand::seq::SliceRandom;
        self.donor_pool.choose(&mut rand::thread_rng()).cloned()
    }

    /// Purge and recreate the scratch directory. Failures are logged only.
    async fn reset_scratch_dir(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.scratch_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.scratch_dir.display(), error = %e, "failed to purge media scratch directory");
            }
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            warn!(dir = %self.scratch_dir.display(), error = %e, "failed to create media scratch directory");
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), DownloadError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(url, dest = %dest.display(), size = bytes.len(), "downloaded donor media");
        Ok(())
    }
}

/// Extract the numeric post id from a canonical post URL (the last non-empty
/// path segment).
fn parse_post_id(donor_url: &str) -> Option<i64> {
    let parsed = Url::parse(donor_url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?
        .parse()
        .ok()
}

/// Direct URLs to fetch for a donor post's attachments: photos use the image
/// URL, videos the highest-bitrate variant.
fn attachment_urls(post: &RemotePost) -> Vec<String> {
    post.attachments
        .iter()
        .filter_map(|attachment| match attachment {
            RemoteAttachment::Photo { url } => Some(url.clone()),
            RemoteAttachment::Video { variants } => {
                best_variant(variants).map(|variant| variant.url.clone())
            }
        })
        .collect()
}

/// Highest-bitrate variant; streaming playlists carry no bitrate and are
/// never picked.
fn best_variant(variants: &[VideoVariant]) -> Option<&VideoVariant> {
    variants
        .iter()
        .filter(|variant| variant.bitrate.is_some())
        .max_by_key(|variant| variant.bitrate)
}

fn scratch_file_name(index: usize, source: &str) -> String {
    let extension = Url::parse(source)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .unwrap_or_else(|| "bin".to_string());
    format!("donor-{}.{}", index, extension)
}

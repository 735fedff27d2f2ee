//! Recast - scheduled republishing bot for a social network account
//!
//! This library mirrors an account's timeline into a local store, then
//! republishes one unused stored post per run (as a reply, quote, or repost)
//! with a caption from a fixed phrase pool and optional media sideloaded
//! from an unrelated donor post.

pub mod api;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod media;
pub mod publish;
pub mod types;

// Re-export commonly used types
pub use config::{ApiCredentials, Config, Environment};
pub use db::Database;
pub use error::{RecastError, Result};
pub use ingest::Ingestor;
pub use media::MediaSideloader;
pub use publish::{PublishReceipt, Publisher};
pub use types::{PublishKind, StoredPost};

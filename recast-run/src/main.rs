//! recast-run - One scheduled republish cycle
//!
//! Ensures the database exists, captures the mirrored account's latest
//! posts, and republishes one unused stored post with a randomly chosen
//! strategy. Meant to be invoked from a scheduler, one run at a time:
//! concurrent runs against the same store race on candidate selection.

use std::sync::Arc;

use clap::Parser;
use librecast::api::twitter::TwitterApi;
use librecast::api::SocialApi;
use librecast::{
    content, ApiCredentials, Config, Database, Environment, Ingestor, MediaSideloader,
    PublishKind, Publisher, Result,
};
use tracing::info;

/// Account whose timeline is mirrored and republished.
const ACCOUNT_ID: i64 = 812926437032390656;

#[derive(Parser, Debug)]
#[command(name = "recast-run")]
#[command(version)]
#[command(about = "Run one scheduled republish cycle", long_about = "\
recast-run - Run one scheduled republish cycle

DESCRIPTION:
    Performs one bot cycle: ensures the database exists, ingests the
    mirrored account's posts newer than the stored watermark, then
    republishes one unused stored post as a reply, quote, or repost
    (chosen at random) with a caption from the fixed phrase pool and
    media sideloaded from a donor post when available.

CONFIGURATION:
    Configuration file: ~/.config/recast/config.toml
    (override with RECAST_CONFIG)

    Credentials come from the environment:
    TWITTER_BEARER_TOKEN (prod) / TWITTER_BEARER_TOKEN_DEV (dev)

EXIT CODES:
    0 - Post republished
    1 - Configuration, database, or API error
    2 - Authentication failure
    3 - No eligible stored post remains
")]
struct Cli {
    /// Deployment environment (prod or dev)
    #[arg(long, default_value = "prod")]
    env: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    librecast::logging::init_with_verbose(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env: Environment = cli.env.parse()?;
    let config = Config::load()?;
    let credentials = ApiCredentials::from_env(env)?;

    let db = Database::open(&config.database_for(env).path).await?;
    let api: Arc<dyn SocialApi> = Arc::new(TwitterApi::new(credentials)?);

    let ingested = Ingestor::new(db.clone(), api.clone())
        .ingest(ACCOUNT_ID)
        .await?;
    info!(environment = %env, ingested, "ingestion finished");

    let donor_pool = content::DONOR_POSTS.iter().map(|s| s.to_string()).collect();
    let media = MediaSideloader::new(api.clone(), &config.media.scratch_dir, donor_pool);
    let publisher = Publisher::new(db, api, media);

    let kind = PublishKind::random();
    let receipt = publisher.publish_one(ACCOUNT_ID, kind).await?;

    println!(
        "Republished post {} as {} (new post {})",
        receipt.source.remote_post_id, receipt.kind, receipt.posted_id
    );

    Ok(())
}

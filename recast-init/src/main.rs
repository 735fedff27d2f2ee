//! recast-init - Create the Recast databases
//!
//! Idempotently creates the prod and dev databases with their schema. Safe
//! to re-run: existing databases are left untouched.

use clap::Parser;
use librecast::{Config, Database, Environment, Result};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "recast-init")]
#[command(version)]
#[command(about = "Create the Recast databases", long_about = "\
recast-init - Create the Recast databases

DESCRIPTION:
    Creates the prod and dev databases at the paths named in the
    configuration file, including parent directories and schema. Re-running
    against existing databases is a no-op.

CONFIGURATION:
    Configuration file: ~/.config/recast/config.toml
    (override with RECAST_CONFIG)

EXIT CODES:
    0 - Databases ready
    1 - Configuration or database error
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    librecast::logging::init_with_verbose(cli.verbose);

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<()> {
    let config = Config::load()?;

    for env in [Environment::Prod, Environment::Dev] {
        let db_config = config.database_for(env);
        Database::open(&db_config.path).await?;
        info!(environment = %env, path = %db_config.path, "database ready");
        println!("{} database ready: {}", env, db_config.path);
    }

    Ok(())
}

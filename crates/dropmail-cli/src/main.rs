mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dropmail-cli")]
#[command(about = "dropmail campaign operations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert institutions, recipients and test accounts from a YAML seed file
    SeedInstitutions {
        /// Path to the seed file (e.g. config/institutions.yaml)
        path: PathBuf,
    },
    /// Fan a campaign's uploaded catalog out into recipient records and batches
    Process {
        campaign_id: String,
        /// Override the configured records per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Send one batch of a campaign
    SendBatch {
        campaign_id: String,
        batch_number: u32,
        /// Send previews to the test accounts instead of the batch
        #[arg(long)]
        test: bool,
    },
    /// Send previews of a campaign to every active test account
    SendTest { campaign_id: String },
    /// Write markers for batches that have records but no marker
    Reconcile { campaign_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = dropmail_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dropmail-cli: no command given; see --help");
        return Ok(());
    };

    let pool_config = dropmail_db::PoolConfig::from_app_config(&config);
    let pool = dropmail_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => commands::run_migrate(&pool).await,
        Commands::SeedInstitutions { path } => commands::run_seed(&pool, &path).await,
        Commands::Process {
            campaign_id,
            batch_size,
        } => commands::run_process(&pool, &config, &campaign_id, batch_size).await,
        Commands::SendBatch {
            campaign_id,
            batch_number,
            test,
        } => commands::run_send_batch(&pool, &config, &campaign_id, batch_number, test).await,
        Commands::SendTest { campaign_id } => {
            commands::run_send_test(&pool, &config, &campaign_id).await
        }
        Commands::Reconcile { campaign_id } => commands::run_reconcile(&pool, &campaign_id).await,
    }
}

#[cfg(test)]
mod tests;

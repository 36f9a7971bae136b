mod capture;
mod enrich;
mod metrics;
mod opportunities;
mod seed;
mod summary;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "serpscope")]
#[command(about = "Amazon keyword market tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate,
    /// Upsert tracked keywords from the YAML config.
    Seed,
    /// Capture a SERP snapshot for every active keyword and reconcile it.
    Capture,
    /// Fetch enrichment for products and merge it in place.
    Enrich {
        /// Explicit ASINs to enrich; defaults to the stalest products.
        #[arg(long = "asin")]
        asins: Vec<String>,
        /// How many stale products to enrich when no ASINs are given.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Compute daily metrics for all active keywords.
    Metrics {
        /// Calendar date to aggregate (UTC); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Detect market opportunities over a rolling window of daily metrics.
    Opportunities {
        /// Window size in days.
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Print window statistics for one tracked keyword as JSON.
    Summary {
        /// The tracked keyword text.
        #[arg(long)]
        keyword: String,
        /// Marketplace the keyword is tracked in; defaults to the configured one.
        #[arg(long)]
        marketplace: Option<String>,
        /// Window size in days.
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = serpscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::debug!(env = %config.env, "configuration loaded");

    let pool_config = serpscope_db::PoolConfig::from_app_config(&config);
    let pool = serpscope_db::connect_pool(&config.database_url, pool_config).await?;
    serpscope_db::ping(&pool).await?;

    match cli.command {
        Commands::Migrate => {
            let applied = serpscope_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
        }
        Commands::Seed => seed::run(&pool, &config).await?,
        Commands::Capture => capture::run(&pool, &config).await?,
        Commands::Enrich { asins, limit } => enrich::run(&pool, &config, asins, limit).await?,
        Commands::Metrics { date } => metrics::run(&pool, date).await?,
        Commands::Opportunities { days } => opportunities::run(&pool, days).await?,
        Commands::Summary {
            keyword,
            marketplace,
            days,
        } => {
            let marketplace = marketplace.unwrap_or_else(|| config.marketplace.clone());
            summary::run(&pool, &keyword, &marketplace, days).await?;
        }
    }

    Ok(())
}

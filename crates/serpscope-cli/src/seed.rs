//! `seed` command: upsert tracked keywords from the YAML config.

use sqlx::PgPool;

use serpscope_core::AppConfig;

pub async fn run(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let keywords_file = serpscope_core::load_keywords(&config.keywords_path)?;
    let count = serpscope_db::seed_keywords(pool, &keywords_file.keywords).await?;
    tracing::info!(
        count,
        path = %config.keywords_path.display(),
        "seeded keywords from config"
    );
    Ok(())
}

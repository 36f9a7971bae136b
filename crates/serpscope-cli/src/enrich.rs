//! `enrich` command: fetch product details and merge them in place.
//!
//! Targets either explicit ASINs or the least-recently-updated products.
//! Each ASIN runs in its own transaction; a failure skips that ASIN and the
//! run continues.

use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;

use serpscope_canopy::CanopyClient;
use serpscope_core::AppConfig;
use serpscope_db::EnrichOutcome;

pub async fn run(
    pool: &PgPool,
    config: &AppConfig,
    asins: Vec<String>,
    limit: i64,
) -> anyhow::Result<()> {
    let api_key = config
        .canopy_api_key
        .as_deref()
        .context("CANOPY_API_KEY is required for enrich")?;
    let client = CanopyClient::new(api_key, config.request_timeout_secs)?;

    let targets: Vec<String> = if asins.is_empty() {
        serpscope_db::list_stalest_products(pool, limit)
            .await?
            .into_iter()
            .map(|p| p.asin)
            .collect()
    } else {
        asins
    };

    if targets.is_empty() {
        tracing::warn!("no products to enrich");
        return Ok(());
    }

    let mut applied = 0usize;
    let mut failed = 0usize;

    for (idx, asin) in targets.iter().enumerate() {
        if idx > 0 && config.inter_request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.inter_request_delay_ms)).await;
        }

        match enrich_one(pool, &client, config, asin).await {
            Ok(EnrichOutcome::Applied {
                brand_changed,
                reviews_inserted,
            }) => {
                tracing::info!(asin, brand_changed, reviews_inserted, "enriched product");
                applied += 1;
            }
            Ok(EnrichOutcome::Skipped) => {
                tracing::info!(asin, "upstream returned nothing to merge");
            }
            Err(e) => {
                tracing::warn!(
                    asin,
                    error = format!("{e:#}"),
                    "failed to enrich product; continuing run"
                );
                failed += 1;
            }
        }
    }

    tracing::info!(applied, failed, "enrichment run complete");
    Ok(())
}

async fn enrich_one(
    pool: &PgPool,
    client: &CanopyClient,
    config: &AppConfig,
    asin: &str,
) -> anyhow::Result<EnrichOutcome> {
    let payload = client.enrich_asin(asin, &config.marketplace).await?;

    let mut tx = pool.begin().await?;
    let outcome = serpscope_db::apply_enrichment(&mut tx, asin, &payload, &config.marketplace).await?;
    tx.commit().await?;

    Ok(outcome)
}

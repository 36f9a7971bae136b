//! `capture` command: one SERP snapshot per active keyword.
//!
//! Each keyword runs fetch → normalize → persist as its own unit: the
//! snapshot, its result rows, and the reconciliation of every result commit
//! in one transaction, so a store failure mid-keyword leaves nothing half
//! written. A failed keyword is logged and skipped; the run continues.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use serpscope_canopy::{normalize_result, CanopyClient};
use serpscope_core::AppConfig;
use serpscope_db::KeywordRow;

pub async fn run(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let api_key = config
        .canopy_api_key
        .as_deref()
        .context("CANOPY_API_KEY is required for capture")?;
    let client = CanopyClient::new(api_key, config.request_timeout_secs)?;

    let keywords = serpscope_db::list_active_keywords(pool).await?;
    if keywords.is_empty() {
        tracing::warn!("no active keywords; nothing to capture");
        return Ok(());
    }

    // One timestamp for the whole run, so every snapshot lands on the same
    // capture date.
    let capture_date = Utc::now();
    let mut captured = 0usize;
    let mut failed = 0usize;

    for (idx, keyword) in keywords.iter().enumerate() {
        if idx > 0 && config.inter_request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.inter_request_delay_ms)).await;
        }

        match capture_keyword(pool, &client, keyword, capture_date).await {
            Ok(result_count) => {
                tracing::info!(
                    keyword = %keyword.keyword,
                    results = result_count,
                    "captured snapshot"
                );
                captured += 1;
            }
            Err(e) => {
                tracing::error!(
                    keyword = %keyword.keyword,
                    error = format!("{e:#}"),
                    "failed to capture snapshot; continuing run"
                );
                failed += 1;
            }
        }
    }

    tracing::info!(captured, failed, "capture run complete");
    Ok(())
}

async fn capture_keyword(
    pool: &PgPool,
    client: &CanopyClient,
    keyword: &KeywordRow,
    capture_date: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let page = client
        .search_products(&keyword.keyword, &keyword.marketplace, 1)
        .await?;

    // Normalize before opening the transaction; a malformed record is
    // dropped here, not mid-batch.
    let mut results = Vec::new();
    for (idx, raw) in page.results.into_iter().enumerate() {
        let position = i32::try_from(idx + 1).unwrap_or(i32::MAX);
        match normalize_result(raw, position) {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::warn!(
                    keyword = %keyword.keyword,
                    error = %e,
                    "skipping result; normalization failed"
                );
            }
        }
    }

    let mut tx = pool.begin().await?;
    let snapshot = serpscope_db::create_snapshot(
        &mut tx,
        keyword.id,
        &keyword.marketplace,
        capture_date,
        i32::try_from(results.len()).unwrap_or(i32::MAX),
    )
    .await?;

    for result in &results {
        serpscope_db::insert_result(&mut tx, snapshot.id, result).await?;
        serpscope_db::reconcile_result(&mut tx, result).await?;
    }
    tx.commit().await?;

    tracing::debug!(
        keyword = %keyword.keyword,
        snapshot = %snapshot.public_id,
        "snapshot committed"
    );
    Ok(results.len())
}

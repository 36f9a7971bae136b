//! `metrics` command: daily aggregation for all active keywords.
//!
//! The whole batch commits in one transaction: either every keyword's metric
//! row for the date lands, or none do.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

pub async fn run(pool: &PgPool, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let day = date.unwrap_or_else(|| Utc::now().date_naive());

    let keywords = serpscope_db::list_active_keywords(pool).await?;
    if keywords.is_empty() {
        tracing::warn!("no active keywords; nothing to aggregate");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let mut computed = 0usize;

    for keyword in &keywords {
        if let Some(metric) =
            serpscope_db::compute_daily_metric(&mut tx, keyword.id, day).await?
        {
            tracing::debug!(
                keyword = %keyword.keyword,
                total_products = metric.total_products,
                new_entrants = metric.new_entrants,
                "computed daily metric"
            );
            computed += 1;
        }
    }

    tx.commit().await?;
    tracing::info!(
        %day,
        keywords = keywords.len(),
        computed,
        "daily metrics batch committed"
    );
    Ok(())
}

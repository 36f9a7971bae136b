//! `summary` command: window statistics for one tracked keyword.

use anyhow::Context;
use chrono::{Days, Utc};
use sqlx::PgPool;

use serpscope_core::{summarize_window, MetricPoint};

pub async fn run(pool: &PgPool, text: &str, marketplace: &str, days: u32) -> anyhow::Result<()> {
    let keyword = serpscope_db::get_keyword(pool, text, marketplace)
        .await?
        .with_context(|| format!("keyword '{text}' is not tracked for marketplace {marketplace}"))?;

    let since = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))
        .context("window start underflows the calendar")?;

    let metrics = serpscope_db::list_daily_metrics(pool, keyword.id, since).await?;
    let points: Vec<MetricPoint> = metrics
        .iter()
        .map(|m| MetricPoint {
            total_products: m.total_products,
            sponsored_count: m.sponsored_count,
            median_price: m.median_price,
            new_entrants: m.new_entrants,
        })
        .collect();

    let Some(summary) = summarize_window(&points) else {
        tracing::warn!(keyword = %keyword.keyword, days, "no metrics in window");
        return Ok(());
    };

    let mut record = serde_json::to_value(&summary)?;
    record["keyword"] = serde_json::Value::String(keyword.keyword.clone());
    record["marketplace"] = serde_json::Value::String(keyword.marketplace.clone());
    println!("{record}");

    Ok(())
}

//! `opportunities` command: threshold scan over the metrics window.
//!
//! Signals are printed as JSON lines so downstream tooling can consume them
//! without a bespoke format.

use anyhow::Context;
use chrono::{Days, Utc};
use sqlx::PgPool;

use serpscope_core::{detect_for_keyword, MetricPoint, Opportunity};
use serpscope_db::KeywordDailyMetricRow;

pub async fn run(pool: &PgPool, days: u32) -> anyhow::Result<()> {
    let since = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))
        .context("window start underflows the calendar")?;

    let rows = serpscope_db::metrics_window(pool, since).await?;
    let opportunities = detect_all(rows, days);

    tracing::info!(
        count = opportunities.len(),
        window_days = days,
        "opportunity detection complete"
    );

    for opportunity in &opportunities {
        println!("{}", serde_json::to_string(opportunity)?);
    }

    Ok(())
}

/// Groups window rows by keyword and runs the detector on each group.
///
/// Relies on `metrics_window` returning each keyword's rows as one
/// consecutive run.
fn detect_all(rows: Vec<KeywordDailyMetricRow>, days: u32) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();
    let mut current: Option<(i64, String, Vec<MetricPoint>)> = None;

    for row in rows {
        let point = MetricPoint {
            total_products: row.total_products,
            sponsored_count: row.sponsored_count,
            median_price: row.median_price,
            new_entrants: row.new_entrants,
        };

        match &mut current {
            Some((id, _, points)) if *id == row.keyword_id => points.push(point),
            _ => {
                if let Some((_, keyword, points)) = current.take() {
                    opportunities.extend(detect_for_keyword(&keyword, &points, days));
                }
                current = Some((row.keyword_id, row.keyword, vec![point]));
            }
        }
    }

    if let Some((_, keyword, points)) = current {
        opportunities.extend(detect_for_keyword(&keyword, &points, days));
    }

    opportunities
}

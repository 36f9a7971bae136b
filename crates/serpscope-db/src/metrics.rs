//! Daily metric computation and persistence for one keyword and date.

use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use serpscope_core::summarize;

use crate::snapshots::{asins_for_day, results_for_day};
use crate::DbError;

/// A row from the `daily_metrics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyMetricRow {
    pub id: i64,
    pub keyword_id: i64,
    pub date: NaiveDate,
    pub median_price: Option<f64>,
    pub avg_rating: Option<f64>,
    pub total_products: i32,
    pub sponsored_count: i32,
    pub organic_count: i32,
    pub new_entrants: i32,
    pub computed_at: DateTime<Utc>,
}

const METRIC_COLUMNS: &str = "id, keyword_id, date, median_price, avg_rating, total_products, \
     sponsored_count, organic_count, new_entrants, computed_at";

/// Computes and persists the daily metric for one keyword and calendar date.
///
/// Gathers every result captured that day; if none exist, returns `None` and
/// writes nothing — a day with zero snapshots is a missing day, not a
/// zero-metric day. Rerunning for the same date replaces the existing row
/// (`ON CONFLICT (keyword_id, date) DO UPDATE`), so aggregation never
/// double-counts.
///
/// The new-entrant baseline is always the immediately preceding calendar
/// day, fetched with the same per-day query even when that day has no
/// snapshots. A gap in collection therefore reports everything as new; this
/// mirrors the established reporting semantics and is deliberately not
/// "corrected" to compare against the last populated day.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query or the upsert fails.
pub async fn compute_daily_metric(
    conn: &mut PgConnection,
    keyword_id: i64,
    day: NaiveDate,
) -> Result<Option<DailyMetricRow>, DbError> {
    let observations = results_for_day(&mut *conn, keyword_id, day).await?;

    let prior_asins = match day.checked_sub_days(Days::new(1)) {
        Some(prior_day) => asins_for_day(&mut *conn, keyword_id, prior_day).await?,
        None => std::collections::HashSet::new(),
    };

    let Some(summary) = summarize(&observations, &prior_asins) else {
        tracing::debug!(keyword_id, %day, "no results captured; skipping metric");
        return Ok(None);
    };

    let row = sqlx::query_as::<_, DailyMetricRow>(&format!(
        "INSERT INTO daily_metrics \
             (keyword_id, date, median_price, avg_rating, total_products, \
              sponsored_count, organic_count, new_entrants) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (keyword_id, date) DO UPDATE SET \
             median_price    = EXCLUDED.median_price, \
             avg_rating      = EXCLUDED.avg_rating, \
             total_products  = EXCLUDED.total_products, \
             sponsored_count = EXCLUDED.sponsored_count, \
             organic_count   = EXCLUDED.organic_count, \
             new_entrants    = EXCLUDED.new_entrants, \
             computed_at     = NOW() \
         RETURNING {METRIC_COLUMNS}",
    ))
    .bind(keyword_id)
    .bind(day)
    .bind(summary.median_price)
    .bind(summary.avg_rating)
    .bind(summary.total_products)
    .bind(summary.sponsored_count)
    .bind(summary.organic_count)
    .bind(summary.new_entrants)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(row))
}

/// Returns a keyword's metrics from `since` onward, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_daily_metrics(
    pool: &PgPool,
    keyword_id: i64,
    since: NaiveDate,
) -> Result<Vec<DailyMetricRow>, DbError> {
    let rows = sqlx::query_as::<_, DailyMetricRow>(&format!(
        "SELECT {METRIC_COLUMNS} \
         FROM daily_metrics \
         WHERE keyword_id = $1 AND date >= $2 \
         ORDER BY date",
    ))
    .bind(keyword_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

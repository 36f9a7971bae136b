//! Read-model query feeding the opportunity detector.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::DbError;

/// A `daily_metrics` row joined with its keyword text, scoped to the
/// detector's rolling window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordDailyMetricRow {
    pub keyword_id: i64,
    pub keyword: String,
    pub date: NaiveDate,
    pub total_products: i32,
    pub sponsored_count: i32,
    pub median_price: Option<f64>,
    pub new_entrants: i32,
}

/// Returns all metrics from `since` onward for active keywords. Rows are
/// ordered so each keyword's metrics form one consecutive, date-ascending
/// run (`keyword_id` is part of the ordering because the same text can be
/// tracked in more than one marketplace).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn metrics_window(
    pool: &PgPool,
    since: NaiveDate,
) -> Result<Vec<KeywordDailyMetricRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordDailyMetricRow>(
        "SELECT m.keyword_id, k.keyword, m.date, m.total_products, \
                m.sponsored_count, m.median_price, m.new_entrants \
         FROM daily_metrics m \
         JOIN keywords k ON k.id = m.keyword_id \
         WHERE m.date >= $1 AND k.is_active = TRUE \
         ORDER BY k.keyword, m.keyword_id, m.date",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

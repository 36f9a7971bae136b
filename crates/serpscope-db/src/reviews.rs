//! Database operations for the `reviews` table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use serpscope_core::{coerce_i64, parse_review_date, RawReview};

use crate::DbError;

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub asin: String,
    pub review_id: String,
    pub rating: i32,
    pub title: Option<String>,
    pub body: Option<String>,
    pub verified_purchase: bool,
    pub review_date: Option<DateTime<Utc>>,
    pub helpful_votes: i32,
    pub captured_at: DateTime<Utc>,
}

/// Folds raw review entries into the deduplicated review store.
///
/// Per entry: both an external review id and a rating are required —
/// anything else is skipped silently, never persisted partially. The rating
/// coerces float-then-truncate (an uncoercible rating skips the whole
/// entry). Dates parse leniently and store as `NULL` on failure. A
/// `review_id` that already exists is an idempotent no-op
/// (`ON CONFLICT DO NOTHING`), which also makes concurrent ingestion safe.
///
/// Returns the number of rows actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if an insert fails.
pub async fn ingest_reviews(
    conn: &mut PgConnection,
    asin: &str,
    reviews: &[RawReview],
) -> Result<usize, DbError> {
    let mut inserted = 0usize;

    for raw in reviews {
        let Some(review_id) = raw
            .review_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let Some(rating_value) = raw.rating.as_ref() else {
            continue;
        };
        let Some(rating) = coerce_i64(rating_value).and_then(|r| i32::try_from(r).ok()) else {
            tracing::debug!(asin, review_id, "unparsable review rating; skipping entry");
            continue;
        };

        let review_date = raw.review_date.as_deref().and_then(parse_review_date);

        let rows_affected = sqlx::query(
            "INSERT INTO reviews \
                 (asin, review_id, rating, title, body, verified_purchase, \
                  review_date, helpful_votes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 0)) \
             ON CONFLICT (review_id) DO NOTHING",
        )
        .bind(asin)
        .bind(review_id)
        .bind(rating)
        .bind(&raw.title)
        .bind(&raw.body)
        .bind(raw.verified_purchase)
        .bind(review_date)
        .bind(raw.helpful_votes)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if rows_affected > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Returns a product's stored reviews, most recent first (undated last).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    asin: &str,
    limit: i64,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, asin, review_id, rating, title, body, verified_purchase, \
                review_date, helpful_votes, captured_at \
         FROM reviews \
         WHERE asin = $1 \
         ORDER BY review_date DESC NULLS LAST, id DESC \
         LIMIT $2",
    )
    .bind(asin)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

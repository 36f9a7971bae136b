//! Database operations for `serp_snapshots` and `serp_results`.
//!
//! Snapshots are capture events; results are their immutable ranked
//! observations. Results are insert-only — there is no update path by
//! design. The per-day queries here feed the daily-metrics aggregator.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use serpscope_core::{ResultObservation, SerpResult};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `serp_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub public_id: Uuid,
    pub keyword_id: i64,
    pub capture_date: DateTime<Utc>,
    pub marketplace: String,
    pub total_results: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ObservationRow {
    asin: String,
    price: Option<f64>,
    rating: Option<f64>,
    is_sponsored: bool,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Creates a new snapshot row for a capture event.
///
/// `capture_date` is the moment the SERP was fetched, recorded once by the
/// caller for the whole capture run. Generates a `public_id` UUID so the
/// capture can be referenced externally.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_snapshot(
    conn: &mut PgConnection,
    keyword_id: i64,
    marketplace: &str,
    capture_date: DateTime<Utc>,
    total_results: i32,
) -> Result<SnapshotRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SnapshotRow>(
        "INSERT INTO serp_snapshots \
             (public_id, keyword_id, capture_date, marketplace, total_results) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, public_id, keyword_id, capture_date, marketplace, \
                   total_results, created_at",
    )
    .bind(public_id)
    .bind(keyword_id)
    .bind(capture_date)
    .bind(marketplace)
    .bind(total_results)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Inserts one immutable result row under a snapshot.
///
/// Position uniqueness within the snapshot is enforced by the schema
/// (`UNIQUE (snapshot_id, position)`). The result's `asin` may reference a
/// product that has not been reconciled yet; that is valid, deferred state.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// position within the snapshot).
pub async fn insert_result(
    conn: &mut PgConnection,
    snapshot_id: i64,
    result: &SerpResult,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO serp_results \
             (snapshot_id, asin, position, is_sponsored, title, price, currency, \
              rating, review_count, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id",
    )
    .bind(snapshot_id)
    .bind(&result.asin)
    .bind(result.position)
    .bind(result.is_sponsored)
    .bind(&result.title)
    .bind(result.price)
    .bind(&result.currency)
    .bind(result.rating)
    .bind(result.review_count)
    .bind(&result.image_url)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

// ---------------------------------------------------------------------------
// Per-day reads (aggregator inputs)
// ---------------------------------------------------------------------------

/// Returns every result captured for a keyword on one calendar date.
///
/// Capture timestamps are truncated to day granularity in UTC, regardless of
/// the session timezone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn results_for_day(
    conn: &mut PgConnection,
    keyword_id: i64,
    day: NaiveDate,
) -> Result<Vec<ResultObservation>, DbError> {
    let rows = sqlx::query_as::<_, ObservationRow>(
        "SELECT r.asin, r.price, r.rating, r.is_sponsored \
         FROM serp_results r \
         JOIN serp_snapshots s ON s.id = r.snapshot_id \
         WHERE s.keyword_id = $1 \
           AND (s.capture_date AT TIME ZONE 'UTC')::date = $2",
    )
    .bind(keyword_id)
    .bind(day)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ResultObservation {
            asin: r.asin,
            price: r.price,
            rating: r.rating,
            is_sponsored: r.is_sponsored,
        })
        .collect())
}

/// Returns the distinct ASINs observed for a keyword on one calendar date.
///
/// A date with no snapshots yields an empty set. The new-entrant calculation
/// relies on that: it always compares against the immediately preceding
/// calendar day, populated or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn asins_for_day(
    conn: &mut PgConnection,
    keyword_id: i64,
    day: NaiveDate,
) -> Result<HashSet<String>, DbError> {
    let asins: Vec<String> = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT r.asin \
         FROM serp_results r \
         JOIN serp_snapshots s ON s.id = r.snapshot_id \
         WHERE s.keyword_id = $1 \
           AND (s.capture_date AT TIME ZONE 'UTC')::date = $2",
    )
    .bind(keyword_id)
    .bind(day)
    .fetch_all(&mut *conn)
    .await?;

    Ok(asins.into_iter().collect())
}

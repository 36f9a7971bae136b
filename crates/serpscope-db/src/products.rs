//! Database operations for `products` and `price_history`.
//!
//! [`reconcile_result`] is the entity reconciler: it folds a single SERP
//! observation into durable product state and appends the price fact.
//! Callers run it inside the transaction that owns the whole snapshot batch,
//! so a store failure rolls back product and price-history writes together.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use sqlx::PgPool;

use serpscope_core::SerpResult;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub asin: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// `NULL` until enrichment establishes it; a bare search result does not
    /// carry a marketplace.
    pub marketplace: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub current_price: Option<f64>,
    pub current_rating: Option<f64>,
    pub current_review_count: Option<i32>,
}

/// A row from the `price_history` table. Append-only.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub asin: String,
    pub date: DateTime<Utc>,
    pub price: f64,
    pub currency: String,
}

const PRODUCT_COLUMNS: &str = "id, asin, title, brand, category, subcategory, marketplace, \
     first_seen, last_updated, current_price, current_rating, current_review_count";

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Upserts a product from a single SERP observation and appends the price
/// fact when one is present.
///
/// Semantics:
/// - a new ASIN creates the product with whatever the result supplies and
///   returns `created = true`;
/// - an existing product refreshes `current_price`, `current_rating`, and
///   `current_review_count` only from non-null incoming values (a missing
///   value never erases a known one), backfills `title` only if it was
///   previously unset, and always stamps `last_updated`;
/// - a non-null incoming price appends exactly one `price_history` row per
///   call, stamped with the processing time and the resolved currency
///   (`'USD'` when the observation carried none).
///
/// # Errors
///
/// Returns [`DbError::MissingAsin`] for a result with an empty ASIN (the
/// caller skips the record and continues its batch), or [`DbError::Sqlx`]
/// if a statement fails.
pub async fn reconcile_result(
    conn: &mut PgConnection,
    result: &SerpResult,
) -> Result<(ProductRow, bool), DbError> {
    if result.asin.trim().is_empty() {
        return Err(DbError::MissingAsin);
    }

    let existing = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE asin = $1",
    ))
    .bind(&result.asin)
    .fetch_optional(&mut *conn)
    .await?;

    let (product, created) = if existing.is_some() {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                 title                = COALESCE(title, $2), \
                 current_price        = COALESCE($3, current_price), \
                 current_rating       = COALESCE($4, current_rating), \
                 current_review_count = COALESCE($5, current_review_count), \
                 last_updated         = NOW() \
             WHERE asin = $1 \
             RETURNING {PRODUCT_COLUMNS}",
        ))
        .bind(&result.asin)
        .bind(&result.title)
        .bind(result.price)
        .bind(result.rating)
        .bind(result.review_count)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(asin = %row.asin, "updated product");
        (row, false)
    } else {
        // ON CONFLICT covers the narrow race where another writer creates
        // the same ASIN between the lookup and this insert: it degrades to
        // the same non-null-only refresh the update path applies.
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products \
                 (asin, title, current_price, current_rating, current_review_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (asin) DO UPDATE SET \
                 title                = COALESCE(products.title, EXCLUDED.title), \
                 current_price        = COALESCE(EXCLUDED.current_price, products.current_price), \
                 current_rating       = COALESCE(EXCLUDED.current_rating, products.current_rating), \
                 current_review_count = COALESCE(EXCLUDED.current_review_count, products.current_review_count), \
                 last_updated         = NOW() \
             RETURNING {PRODUCT_COLUMNS}",
        ))
        .bind(&result.asin)
        .bind(&result.title)
        .bind(result.price)
        .bind(result.rating)
        .bind(result.review_count)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(asin = %row.asin, "created new product");
        (row, true)
    };

    if let Some(price) = result.price {
        sqlx::query(
            "INSERT INTO price_history (asin, date, price, currency) \
             VALUES ($1, NOW(), $2, COALESCE($3, 'USD'))",
        )
        .bind(&result.asin)
        .bind(price)
        .bind(&result.currency)
        .execute(&mut *conn)
        .await?;
    }

    Ok((product, created))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns a product by ASIN, or `None` if it has not been reconciled yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_asin(
    pool: &PgPool,
    asin: &str,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE asin = $1",
    ))
    .bind(asin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a product's price history, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_history(
    pool: &PgPool,
    asin: &str,
    limit: i64,
) -> Result<Vec<PriceHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT id, asin, date, price, currency \
         FROM price_history \
         WHERE asin = $1 \
         ORDER BY date DESC, id DESC \
         LIMIT $2",
    )
    .bind(asin)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the `limit` products whose `last_updated` is oldest — the
/// enrichment driver's default work queue.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stalest_products(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         ORDER BY last_updated ASC, id ASC \
         LIMIT $1",
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

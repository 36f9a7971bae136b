//! Database operations for the `sellers` rollup table.
//!
//! A seller row is a denormalized aggregate over the products currently
//! carrying its brand. It is never adjusted incrementally: every call
//! recomputes the full aggregate, so the row is always reconstructable from
//! `products` and cannot drift. The O(products-per-brand) scan is acceptable
//! because brand cardinality is small relative to total products.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `sellers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SellerRow {
    pub id: i64,
    pub brand_name: String,
    pub marketplace: String,
    pub first_seen: DateTime<Utc>,
    pub product_count: i32,
    /// Mean of `current_rating` over rated products; `NULL` when none are
    /// rated (the aggregate never divides by zero).
    pub avg_rating: Option<f64>,
    pub total_reviews: i64,
}

/// Recomputes the rollup for one brand from the live product population.
///
/// `first_seen` and the `'US'` marketplace fallback apply only when the
/// brand is seen for the first time; recomputes leave them untouched.
/// A brand that no longer has products keeps its row with zeroed counts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn recompute_seller(
    conn: &mut PgConnection,
    brand: &str,
    marketplace: Option<&str>,
) -> Result<SellerRow, DbError> {
    let row = sqlx::query_as::<_, SellerRow>(
        "INSERT INTO sellers (brand_name, marketplace, product_count, avg_rating, total_reviews) \
         SELECT $1, COALESCE($2, 'US'), COUNT(*), AVG(current_rating), \
                COALESCE(SUM(current_review_count), 0) \
         FROM products \
         WHERE brand = $1 \
         ON CONFLICT (brand_name) DO UPDATE SET \
             product_count = EXCLUDED.product_count, \
             avg_rating    = EXCLUDED.avg_rating, \
             total_reviews = EXCLUDED.total_reviews \
         RETURNING id, brand_name, marketplace, first_seen, product_count, \
                   avg_rating, total_reviews",
    )
    .bind(brand)
    .bind(marketplace)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        brand = %row.brand_name,
        product_count = row.product_count,
        "recomputed seller rollup"
    );

    Ok(row)
}

/// Returns the rollup row for a brand, or `None` if never computed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_seller_by_brand(
    pool: &PgPool,
    brand: &str,
) -> Result<Option<SellerRow>, DbError> {
    let row = sqlx::query_as::<_, SellerRow>(
        "SELECT id, brand_name, marketplace, first_seen, product_count, \
                avg_rating, total_reviews \
         FROM sellers \
         WHERE brand_name = $1",
    )
    .bind(brand)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

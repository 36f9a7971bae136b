//! Field-level merge of out-of-band enrichment payloads onto products.
//!
//! Enrichment never replaces a product — it overlays fields in place. The
//! upstream detail endpoint is loosely typed, so numeric fields coerce
//! leniently: an unparsable value leaves the prior one untouched and logs at
//! debug level rather than failing the merge.

use sqlx::PgConnection;

use serpscope_core::{coerce_f64, coerce_i64, normalize_price, EnrichmentPayload};

use crate::products::ProductRow;
use crate::reviews::ingest_reviews;
use crate::sellers::recompute_seller;
use crate::DbError;

/// What an [`apply_enrichment`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The payload was empty; nothing was touched.
    Skipped,
    Applied {
        /// Whether the payload established or changed the product's brand
        /// (and therefore triggered seller rollups).
        brand_changed: bool,
        reviews_inserted: usize,
    },
}

/// Applies an enrichment payload onto an existing product.
///
/// Field rules:
/// - brand / category / subcategory overwrite only when the payload carries
///   a non-empty value;
/// - price accepts a numeric value or a display string (same extraction as
///   the SERP normalizer) and overwrites `current_price` on success;
/// - rating / review_count coerce leniently — failure keeps the prior value;
/// - marketplace is set only if the product has none;
/// - `last_updated` is always stamped.
///
/// When the brand is set or changed, the seller rollup is recomputed for the
/// new brand — and for the displaced prior brand, so its product count does
/// not go stale. Any `recent_reviews` in the payload are delegated to review
/// ingestion.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product exists for `asin`, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn apply_enrichment(
    conn: &mut PgConnection,
    asin: &str,
    payload: &EnrichmentPayload,
    marketplace: &str,
) -> Result<EnrichOutcome, DbError> {
    if payload.is_empty() {
        tracing::debug!(asin, "empty enrichment payload; nothing to merge");
        return Ok(EnrichOutcome::Skipped);
    }

    let prior_brand: Option<String> =
        sqlx::query_scalar::<_, Option<String>>("SELECT brand FROM products WHERE asin = $1")
            .bind(asin)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(DbError::NotFound)?;

    let brand = non_empty(payload.brand.as_deref());
    let category = non_empty(payload.category.as_deref());
    let subcategory = non_empty(payload.subcategory.as_deref());

    let price = normalize_price(payload.price.as_ref()).amount;

    let rating = match &payload.rating {
        None => None,
        Some(value) => {
            let coerced = coerce_f64(value);
            if coerced.is_none() {
                tracing::debug!(asin, %value, "unparsable enrichment rating; keeping prior value");
            }
            coerced
        }
    };

    let review_count = match &payload.review_count {
        None => None,
        Some(value) => {
            let coerced = coerce_i64(value).and_then(|n| i32::try_from(n).ok());
            if coerced.is_none() {
                tracing::debug!(
                    asin,
                    %value,
                    "unparsable enrichment review count; keeping prior value"
                );
            }
            coerced
        }
    };

    let updated = sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET \
             brand                = COALESCE($2, brand), \
             category             = COALESCE($3, category), \
             subcategory          = COALESCE($4, subcategory), \
             current_price        = COALESCE($5, current_price), \
             current_rating       = COALESCE($6, current_rating), \
             current_review_count = COALESCE($7, current_review_count), \
             marketplace          = COALESCE(marketplace, $8), \
             last_updated         = NOW() \
         WHERE asin = $1 \
         RETURNING id, asin, title, brand, category, subcategory, marketplace, \
                   first_seen, last_updated, current_price, current_rating, \
                   current_review_count",
    )
    .bind(asin)
    .bind(brand)
    .bind(category)
    .bind(subcategory)
    .bind(price)
    .bind(rating)
    .bind(review_count)
    .bind(marketplace)
    .fetch_one(&mut *conn)
    .await?;

    let brand_changed = match (brand, prior_brand.as_deref()) {
        (Some(new), Some(prior)) => new != prior,
        (Some(_), None) => true,
        _ => false,
    };

    if brand_changed {
        if let Some(new_brand) = brand {
            recompute_seller(&mut *conn, new_brand, Some(marketplace)).await?;
        }
        if let Some(prior) = prior_brand.as_deref() {
            recompute_seller(&mut *conn, prior, Some(marketplace)).await?;
        }
    }

    let reviews_inserted = ingest_reviews(&mut *conn, asin, &payload.recent_reviews).await?;

    tracing::debug!(
        asin = %updated.asin,
        brand_changed,
        reviews_inserted,
        "applied enrichment"
    );

    Ok(EnrichOutcome::Applied {
        brand_changed,
        reviews_inserted,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

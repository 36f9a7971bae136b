//! Normalization from raw Canopy search results to
//! [`serpscope_core::SerpResult`] records.

use serpscope_core::{coerce_f64, coerce_i64, normalize_price, SerpResult};

use crate::error::CanopyError;
use crate::types::RawSearchResult;

/// Normalizes one raw search result into a [`SerpResult`].
///
/// `position` is the 1-based SERP rank, assigned by the caller from the raw
/// result's enumeration order. Price flows through the shared normalizer;
/// rating and review count coerce leniently and degrade to `None` rather
/// than failing.
///
/// # Errors
///
/// Returns [`CanopyError::Normalization`] if the result carries no ASIN —
/// the one field nothing downstream can work without. Callers log and skip
/// the record, continuing their batch.
pub fn normalize_result(raw: RawSearchResult, position: i32) -> Result<SerpResult, CanopyError> {
    let asin = raw
        .asin
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or(CanopyError::Normalization {
            position,
            reason: "result has no ASIN".to_owned(),
        })?;

    let price = normalize_price(raw.price.as_ref());
    let rating = raw.rating.as_ref().and_then(coerce_f64);
    let review_count = raw
        .ratings_total
        .as_ref()
        .and_then(coerce_i64)
        .and_then(|n| i32::try_from(n).ok());

    Ok(SerpResult {
        asin,
        position,
        is_sponsored: raw.sponsored,
        title: raw.title,
        price: price.amount,
        currency: price.currency,
        rating,
        review_count,
        image_url: raw.main_image_url,
    })
}

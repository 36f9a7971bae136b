//! Records exchanged with the upstream collector.
//!
//! [`SerpResult`] is the normalized per-result observation produced by
//! `serpscope-canopy` and consumed by the reconciler. [`EnrichmentPayload`]
//! and [`RawReview`] model the out-of-band product-detail payload, which is
//! deliberately lenient: the upstream drifts on field names and numeric
//! types, so several fields are kept as raw JSON and coerced at merge time.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::price::RawPrice;

/// One ranked observation from a SERP capture. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpResult {
    pub asin: String,
    /// 1-based rank within the snapshot.
    pub position: i32,
    pub is_sponsored: bool,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub image_url: Option<String>,
}

/// Out-of-band product enrichment from the product-details endpoint.
///
/// All fields are optional; [`EnrichmentPayload::is_empty`] is the merger's
/// explicit no-op guard. `rating` and `review_count` stay as raw JSON values
/// because the API returns them as numbers or strings interchangeably.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentPayload {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub review_count: Option<Value>,
    #[serde(default)]
    pub recent_reviews: Vec<RawReview>,
}

impl EnrichmentPayload {
    /// Returns `true` when the payload carries nothing to merge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.price.is_none()
            && self.rating.is_none()
            && self.review_count.is_none()
            && self.recent_reviews.is_empty()
    }
}

/// A raw review entry from the reviews endpoint.
///
/// The upstream uses `review_id`/`id`, `text`/`body`, and `review_date`/`date`
/// interchangeably; serde aliases accept both spellings. `rating` is raw JSON
/// for the same reason as on [`EnrichmentPayload`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default, alias = "id")]
    pub review_id: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "text")]
    pub body: Option<String>,
    #[serde(default)]
    pub verified_purchase: bool,
    #[serde(default, alias = "date")]
    pub review_date: Option<String>,
    #[serde(default)]
    pub helpful_votes: Option<i32>,
}

/// Parses a review date in either upstream format: a full RFC 3339 timestamp
/// (a trailing `Z` is an explicit UTC offset) or a bare `YYYY-MM-DD` date,
/// which becomes midnight UTC. Anything else is `None`, never an error.
#[must_use]
pub fn parse_review_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_payload_is_empty() {
        assert!(EnrichmentPayload::default().is_empty());
    }

    #[test]
    fn payload_with_brand_is_not_empty() {
        let payload = EnrichmentPayload {
            brand: Some("Logi".to_owned()),
            ..EnrichmentPayload::default()
        };
        assert!(!payload.is_empty());
    }

    #[test]
    fn payload_with_only_reviews_is_not_empty() {
        let payload = EnrichmentPayload {
            recent_reviews: vec![RawReview::default()],
            ..EnrichmentPayload::default()
        };
        assert!(!payload.is_empty());
    }

    #[test]
    fn raw_review_accepts_aliased_field_names() {
        let review: RawReview = serde_json::from_value(json!({
            "id": "R1ABC",
            "rating": "5.0",
            "text": "Works great",
            "date": "2026-01-02"
        }))
        .unwrap();

        assert_eq!(review.review_id.as_deref(), Some("R1ABC"));
        assert_eq!(review.body.as_deref(), Some("Works great"));
        assert_eq!(review.review_date.as_deref(), Some("2026-01-02"));
        assert!(!review.verified_purchase);
        assert!(review.helpful_votes.is_none());
    }

    #[test]
    fn raw_review_accepts_canonical_field_names() {
        let review: RawReview = serde_json::from_value(json!({
            "review_id": "R2DEF",
            "rating": 4,
            "body": "Solid",
            "review_date": "2026-01-02T10:30:00Z",
            "verified_purchase": true,
            "helpful_votes": 12
        }))
        .unwrap();

        assert_eq!(review.review_id.as_deref(), Some("R2DEF"));
        assert!(review.verified_purchase);
        assert_eq!(review.helpful_votes, Some(12));
    }

    #[test]
    fn parse_review_date_full_timestamp_with_zone_marker() {
        let parsed = parse_review_date("2026-01-02T10:30:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T10:30:00+00:00");
    }

    #[test]
    fn parse_review_date_explicit_offset_converts_to_utc() {
        let parsed = parse_review_date("2026-01-02T10:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T08:30:00+00:00");
    }

    #[test]
    fn parse_review_date_bare_date_is_midnight_utc() {
        let parsed = parse_review_date("2026-01-02").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T00:00:00+00:00");
    }

    #[test]
    fn parse_review_date_garbage_is_none() {
        assert!(parse_review_date("January 2nd, 2026").is_none());
        assert!(parse_review_date("").is_none());
    }
}

//! Canopy API response types.
//!
//! All types model the JSON structures returned by the Canopy REST API.
//! The search endpoint nests its payload three levels deep
//! (`data.amazonProductSearchResults.productResults`); every layer is
//! optional-with-default because the API omits empty containers rather than
//! sending them.

use serde::Deserialize;
use serde_json::Value;

use serpscope_core::{RawPrice, RawReview};

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

/// Top-level envelope for the `search` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    #[serde(rename = "amazonProductSearchResults", default)]
    pub amazon_product_search_results: Option<AmazonProductSearchResults>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AmazonProductSearchResults {
    #[serde(rename = "productResults", default)]
    pub product_results: Option<ProductResults>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductResults {
    #[serde(default)]
    pub results: Vec<RawSearchResult>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: Option<PageInfo>,
}

/// Pagination cursor for the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "currentPage", default)]
    pub current_page: Option<i32>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: Option<i32>,
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: Option<bool>,
}

/// One raw product result from the search endpoint.
///
/// `rating` and `ratings_total` stay as raw JSON values — the API has been
/// observed sending both numbers and numeric strings; normalization coerces
/// them leniently.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub asin: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(rename = "ratingsTotal", default)]
    pub ratings_total: Option<Value>,
    #[serde(default)]
    pub sponsored: bool,
    #[serde(rename = "mainImageUrl", default)]
    pub main_image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// product details / reviews
// ---------------------------------------------------------------------------

/// Detail payload for a single ASIN from the `product/{asin}` endpoint.
///
/// Mirrors the enrichment record shape; the client folds this plus a review
/// sample into one [`serpscope_core::EnrichmentPayload`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetails {
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
}

/// Wrapper for the `product/{asin}/reviews` endpoint: `{ "reviews": [...] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ReviewsResponse {
    #[serde(default)]
    pub reviews: Vec<RawReview>,
}

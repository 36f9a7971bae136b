//! HTTP client for the Canopy REST API.
//!
//! Wraps `reqwest` with Canopy-specific error handling, API key management,
//! and typed response deserialization. Canopy authenticates with both an
//! `Authorization: Bearer` header and a legacy `API-KEY` header; both are
//! sent on every request.

use std::time::Duration;

use reqwest::{header::AUTHORIZATION, Client, Url};
use serde_json::Value;

use serpscope_core::{EnrichmentPayload, RawReview};

use crate::error::CanopyError;
use crate::types::{PageInfo, ProductDetails, RawSearchResult, ReviewsResponse, SearchEnvelope};

const DEFAULT_BASE_URL: &str = "https://rest.canopyapi.co/api/amazon/";

/// Reviews folded into an enrichment payload, capped to the freshest few.
const MAX_ENRICHMENT_REVIEWS: usize = 5;

/// One page of search results with its pagination cursor.
#[derive(Debug)]
pub struct SearchPage {
    pub results: Vec<RawSearchResult>,
    pub page_info: Option<PageInfo>,
}

/// Client for the Canopy REST API.
///
/// Manages the HTTP client, API key, and base URL. Use [`CanopyClient::new`]
/// for production or [`CanopyClient::with_base_url`] to point at a mock
/// server in tests.
pub struct CanopyClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl CanopyClient {
    /// Creates a new client pointed at the production Canopy API.
    ///
    /// # Errors
    ///
    /// Returns [`CanopyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, CanopyError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CanopyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CanopyError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, CanopyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("serpscope/0.1 (market-tracking)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // Url::join appends endpoint paths instead of replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| CanopyError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Searches for products by keyword.
    ///
    /// Calls the `search` endpoint and unwraps the nested
    /// `data.amazonProductSearchResults.productResults` envelope. A response
    /// with no results container yields an empty page, not an error.
    ///
    /// # Errors
    ///
    /// - [`CanopyError::Http`] on network failure.
    /// - [`CanopyError::NotFound`] / [`CanopyError::UnexpectedStatus`] on
    ///   non-2xx responses.
    /// - [`CanopyError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn search_products(
        &self,
        keyword: &str,
        marketplace: &str,
        page: u32,
    ) -> Result<SearchPage, CanopyError> {
        let url = self.build_url(
            "search",
            &[
                ("searchTerm", keyword),
                ("marketplace", marketplace),
                ("page", &page.to_string()),
            ],
        )?;

        tracing::debug!(keyword, marketplace, page, "searching products");
        let body = self.request_json(url).await?;

        let envelope: SearchEnvelope =
            serde_json::from_value(body).map_err(|e| CanopyError::Deserialize {
                context: format!("search(keyword={keyword})"),
                source: e,
            })?;

        let product_results = envelope
            .data
            .and_then(|d| d.amazon_product_search_results)
            .and_then(|r| r.product_results);

        Ok(match product_results {
            Some(pr) => SearchPage {
                results: pr.results,
                page_info: pr.page_info,
            },
            None => SearchPage {
                results: Vec::new(),
                page_info: None,
            },
        })
    }

    /// Fetches detail fields for a single ASIN from `product/{asin}`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`CanopyClient::search_products`].
    pub async fn get_product_details(
        &self,
        asin: &str,
        marketplace: &str,
    ) -> Result<ProductDetails, CanopyError> {
        let url = self.build_url(&format!("product/{asin}"), &[("marketplace", marketplace)])?;

        tracing::debug!(asin, marketplace, "fetching product details");
        let body = self.request_json(url).await?;

        serde_json::from_value(body).map_err(|e| CanopyError::Deserialize {
            context: format!("get_product_details(asin={asin})"),
            source: e,
        })
    }

    /// Fetches one page of reviews for an ASIN from `product/{asin}/reviews`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`CanopyClient::search_products`].
    pub async fn get_product_reviews(
        &self,
        asin: &str,
        marketplace: &str,
        page: u32,
    ) -> Result<Vec<RawReview>, CanopyError> {
        let url = self.build_url(
            &format!("product/{asin}/reviews"),
            &[("marketplace", marketplace), ("page", &page.to_string())],
        )?;

        tracing::debug!(asin, marketplace, page, "fetching product reviews");
        let body = self.request_json(url).await?;

        let response: ReviewsResponse =
            serde_json::from_value(body).map_err(|e| CanopyError::Deserialize {
                context: format!("get_product_reviews(asin={asin})"),
                source: e,
            })?;

        Ok(response.reviews)
    }

    /// Folds product details and a review sample into one enrichment payload.
    ///
    /// Fetches `product/{asin}` plus the first page of reviews and keeps the
    /// top [`MAX_ENRICHMENT_REVIEWS`] entries.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`CanopyClient::search_products`]; a failure on
    /// either endpoint fails the whole enrichment so the caller can skip the
    /// ASIN and continue its batch.
    pub async fn enrich_asin(
        &self,
        asin: &str,
        marketplace: &str,
    ) -> Result<EnrichmentPayload, CanopyError> {
        let details = self.get_product_details(asin, marketplace).await?;
        let mut reviews = self.get_product_reviews(asin, marketplace, 1).await?;
        reviews.truncate(MAX_ENRICHMENT_REVIEWS);

        Ok(EnrichmentPayload {
            brand: details.brand,
            category: details.category,
            subcategory: details.subcategory,
            price: details.price,
            rating: details.rating,
            review_count: details.review_count,
            recent_reviews: reviews,
        })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, CanopyError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CanopyError::InvalidBaseUrl {
                url: format!("{}{endpoint}", self.base_url),
                reason: e.to_string(),
            })?;

        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn request_json(&self, url: Url) -> Result<Value, CanopyError> {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("API-KEY", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CanopyError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(CanopyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

//! Per-day aggregation of SERP observations for one keyword.
//!
//! [`summarize`] is the pure arithmetic core of the daily-metrics pipeline;
//! `serpscope-db` feeds it the day's observations and the prior day's ASIN
//! set, then persists the resulting [`DailySummary`].

use std::collections::HashSet;

/// The fields of a [`crate::SerpResult`] the aggregator needs, detached from
/// snapshot bookkeeping so the summarizer stays storage-agnostic.
#[derive(Debug, Clone)]
pub struct ResultObservation {
    pub asin: String,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub is_sponsored: bool,
}

/// Aggregates for one keyword on one calendar date.
///
/// `sponsored_count + organic_count == total_products` holds by
/// construction: organic is defined as the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    /// Lower median over non-null prices; `None` when no result was priced.
    pub median_price: Option<f64>,
    /// Arithmetic mean over non-null ratings; `None` when none were present.
    pub avg_rating: Option<f64>,
    pub total_products: i32,
    pub sponsored_count: i32,
    pub organic_count: i32,
    /// Count of ASINs observed today but not in `prior_asins`.
    pub new_entrants: i32,
}

/// Summarizes one day's observations for a keyword.
///
/// Returns `None` when `observations` is empty: a day with zero snapshots is
/// a missing day, not a zero-metric day.
///
/// The median is the lower median — sort the `k` known prices ascending and
/// take index `k / 2` — not an averaged median. `prior_asins` is the distinct
/// ASIN set of the immediately preceding calendar day; on a keyword's first
/// day it is empty and every ASIN counts as a new entrant.
#[must_use]
pub fn summarize(
    observations: &[ResultObservation],
    prior_asins: &HashSet<String>,
) -> Option<DailySummary> {
    if observations.is_empty() {
        return None;
    }

    let mut prices: Vec<f64> = observations.iter().filter_map(|o| o.price).collect();
    prices.sort_by(f64::total_cmp);
    let median_price = prices.get(prices.len() / 2).copied();

    let ratings: Vec<f64> = observations.iter().filter_map(|o| o.rating).collect();
    let avg_rating = mean(&ratings);

    let total_products = clamp_count(observations.len());
    let sponsored_count = clamp_count(observations.iter().filter(|o| o.is_sponsored).count());
    let organic_count = total_products - sponsored_count;

    let today_asins: HashSet<&str> = observations.iter().map(|o| o.asin.as_str()).collect();
    let new_entrants = clamp_count(
        today_asins
            .iter()
            .filter(|asin| !prior_asins.contains(**asin))
            .count(),
    );

    Some(DailySummary {
        median_price,
        avg_rating,
        total_products,
        sponsored_count,
        organic_count,
        new_entrants,
    })
}

#[allow(clippy::cast_precision_loss)] // rating sample sizes are far below 2^52
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn clamp_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

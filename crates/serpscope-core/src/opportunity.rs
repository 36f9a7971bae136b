//! Threshold-based opportunity detection over a window of daily metrics.
//!
//! The three rules are independent: one keyword can emit several signals.
//! Thresholds are fixed policy constants for now; they are the obvious
//! candidates to externalize into configuration if tuning becomes routine.

use serde::Serialize;

/// A window's mean product count below this flags a low-saturation market.
pub const LOW_SATURATION_MAX_PRODUCTS: f64 = 20.0;
/// A window's mean sponsored count below this flags low ad competition.
pub const LOW_AD_COMPETITION_MAX_SPONSORED: f64 = 3.0;
/// More summed new entrants than this over the window flags a growing market.
pub const GROWING_MARKET_MIN_NEW_ENTRANTS: i64 = 5;

/// The per-day metric fields the detector consumes.
#[derive(Debug, Clone)]
pub struct MetricPoint {
    pub total_products: i32,
    pub sponsored_count: i32,
    pub median_price: Option<f64>,
    pub new_entrants: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
        }
    }
}

/// The signal kind plus its triggering statistic(s), pre-rounded for export:
/// one decimal for counts, two for prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpportunitySignal {
    LowSaturation {
        avg_products: f64,
        /// Mean of the window's median prices, over days that have one.
        /// `None` when no day in the window produced a median.
        avg_price: Option<f64>,
    },
    LowAdCompetition {
        avg_sponsored_ads: f64,
    },
    GrowingMarket {
        new_entrants_count: i64,
    },
}

/// A scored market signal for one keyword, exported as a plain record.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub keyword: String,
    #[serde(flatten)]
    pub signal: OpportunitySignal,
    pub priority: Priority,
    pub reason: String,
}

/// Evaluates the threshold rules for one keyword over its metrics window.
///
/// `window_days` only feeds the growing-market reason string. A keyword with
/// zero metric points yields no signals.
#[must_use]
pub fn detect_for_keyword(
    keyword: &str,
    points: &[MetricPoint],
    window_days: u32,
) -> Vec<Opportunity> {
    if points.is_empty() {
        return Vec::new();
    }

    let avg_products = mean(points.iter().map(|p| f64::from(p.total_products)));
    let avg_sponsored = mean(points.iter().map(|p| f64::from(p.sponsored_count)));
    let priced: Vec<f64> = points.iter().filter_map(|p| p.median_price).collect();
    let avg_price = if priced.is_empty() {
        None
    } else {
        Some(mean(priced.iter().copied()))
    };
    let total_new: i64 = points.iter().map(|p| i64::from(p.new_entrants)).sum();

    let mut opportunities = Vec::new();

    if avg_products < LOW_SATURATION_MAX_PRODUCTS {
        opportunities.push(Opportunity {
            keyword: keyword.to_owned(),
            signal: OpportunitySignal::LowSaturation {
                avg_products: round1(avg_products),
                avg_price: avg_price.map(round2),
            },
            priority: Priority::High,
            reason: format!("Only {avg_products:.0} products on average - low competition"),
        });
    }

    if avg_sponsored < LOW_AD_COMPETITION_MAX_SPONSORED {
        opportunities.push(Opportunity {
            keyword: keyword.to_owned(),
            signal: OpportunitySignal::LowAdCompetition {
                avg_sponsored_ads: round1(avg_sponsored),
            },
            priority: Priority::Medium,
            reason: format!("Only {avg_sponsored:.0} sponsored ads on average"),
        });
    }

    if total_new > GROWING_MARKET_MIN_NEW_ENTRANTS {
        opportunities.push(Opportunity {
            keyword: keyword.to_owned(),
            signal: OpportunitySignal::GrowingMarket {
                new_entrants_count: total_new,
            },
            priority: Priority::Medium,
            reason: format!("{total_new} new products entered in last {window_days} days"),
        });
    }

    opportunities
}

/// Direction of the median price across the window: strictly increasing
/// from the first priced day to the last, or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Increasing,
    Decreasing,
}

/// Window-level summary statistics for one keyword, exported as a plain
/// record for reporting consumers.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub days_analyzed: usize,
    pub avg_products: f64,
    pub avg_sponsored: f64,
    /// Mean of the per-day median prices, over days that have one.
    pub avg_price: Option<f64>,
    pub price_trend: PriceTrend,
    pub total_new_entrants: i64,
}

/// Summarizes a keyword's metrics window. `points` must be date-ascending;
/// the price trend compares the first and last priced days. Returns `None`
/// for an empty window.
#[must_use]
pub fn summarize_window(points: &[MetricPoint]) -> Option<WindowSummary> {
    if points.is_empty() {
        return None;
    }

    let priced: Vec<f64> = points.iter().filter_map(|p| p.median_price).collect();
    let avg_price = if priced.is_empty() {
        None
    } else {
        Some(mean(priced.iter().copied()))
    };
    let price_trend = match (priced.first(), priced.last()) {
        (Some(first), Some(last)) if last > first => PriceTrend::Increasing,
        _ => PriceTrend::Decreasing,
    };

    Some(WindowSummary {
        days_analyzed: points.len(),
        avg_products: mean(points.iter().map(|p| f64::from(p.total_products))),
        avg_sponsored: mean(points.iter().map(|p| f64::from(p.sponsored_count))),
        avg_price,
        price_trend,
        total_new_entrants: points.iter().map(|p| i64::from(p.new_entrants)).sum(),
    })
}

#[allow(clippy::cast_precision_loss)] // window sizes are tiny
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0_f64, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

//! Best-effort normalization of upstream price and numeric fields.
//!
//! The Canopy API is inconsistent about how it reports prices: sometimes a
//! structured `{value, currency, display}` object, sometimes a bare number,
//! sometimes only a human-readable string like `"$19.99"`. Everything here is
//! total — malformed input degrades to `None`, never to an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First decimal-number substring in a display string. Accepts both `.` and
/// `,` as the decimal separator (`"EUR 19,99"` is a real upstream shape).
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?[0-9]*[.,]?[0-9]+").expect("valid amount regex"));

/// A price field exactly as the upstream API sent it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// Bare numeric price, e.g. `19.99`.
    Number(f64),
    /// Bare display string, e.g. `"$19.99"`.
    Text(String),
    /// Structured Canopy price object. `value` is kept as raw JSON because
    /// the API has been observed sending it as both a number and a string.
    Structured {
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        currency: Option<String>,
        #[serde(default)]
        display: Option<String>,
    },
}

/// Canonical `(amount, currency, display)` form of a raw price field.
///
/// `currency` is passed through as observed; the `"USD"` fallback is applied
/// at the persistence layer, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPrice {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub display: Option<String>,
}

/// Normalizes a raw price field into a best-effort tuple.
///
/// A structured `value` is coerced to float when present; coercion failure
/// yields `amount = None` without falling back to the display string. Only
/// when no `value` exists at all is the display string mined for the first
/// decimal number. Never panics, never errors.
#[must_use]
pub fn normalize_price(raw: Option<&RawPrice>) -> NormalizedPrice {
    let Some(raw) = raw else {
        return NormalizedPrice::default();
    };

    match raw {
        RawPrice::Number(n) => NormalizedPrice {
            amount: Some(*n),
            currency: None,
            display: None,
        },
        RawPrice::Text(s) => NormalizedPrice {
            amount: extract_amount(s),
            currency: None,
            display: Some(s.clone()),
        },
        RawPrice::Structured {
            value,
            currency,
            display,
        } => {
            let amount = match value {
                Some(v) => coerce_f64(v),
                None => display.as_deref().and_then(extract_amount),
            };
            NormalizedPrice {
                amount,
                currency: currency.clone(),
                display: display.clone(),
            }
        }
    }
}

/// Extracts the first decimal-number substring from a display string and
/// parses it, treating `,` as a decimal separator. Unparsable text is `None`.
#[must_use]
pub fn extract_amount(display: &str) -> Option<f64> {
    let matched = AMOUNT_RE.find(display)?;
    matched.as_str().replace(',', ".").parse::<f64>().ok()
}

/// Lenient float coercion for loosely-typed upstream fields: accepts a JSON
/// number or a numeric string; everything else is `None`.
#[must_use]
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Lenient integer coercion: float coercion followed by truncation, so
/// `"4.0"` and `4.7` both coerce (to 4) while `"many"` is `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // truncation is the documented coercion rule
pub fn coerce_i64(value: &Value) -> Option<i64> {
    coerce_f64(value).map(|f| f.trunc() as i64)
}

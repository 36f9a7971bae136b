//! HTTP client for the Canopy Amazon data API.
//!
//! Wraps `reqwest` with typed response deserialization and converts raw
//! search results into [`serpscope_core::SerpResult`] records. Pacing between
//! requests is the caller's concern (see `inter_request_delay_ms` in the app
//! config); there is deliberately no retry layer here.

mod client;
mod error;
mod normalize;
mod types;

pub use client::{CanopyClient, SearchPage};
pub use error::CanopyError;
pub use normalize::normalize_result;
pub use types::{PageInfo, ProductDetails, RawSearchResult};

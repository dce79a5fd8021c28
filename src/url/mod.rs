//! URL handling module for Grant Scout
//!
//! This module provides URL normalization (used to key the discovered and
//! crawled URL sets), domain extraction, and region inference from a
//! domain's top-level suffix.

mod domain;
mod normalize;

pub use domain::{extract_domain, infer_region, is_same_site};
pub use normalize::{normalize_url, url_key};

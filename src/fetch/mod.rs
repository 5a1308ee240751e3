//! Review retrieval from the external app store source.
//!
//! This module owns the paginated collection loop and the pluggable source
//! seam behind it.

mod client;
mod collector;
mod source;
mod types;

pub use self::client::HttpReviewSource;
pub use self::collector::{CollectOutcome, PaginatedCollector};
pub use self::source::{ReviewSource, StaticReviewSource};
pub use self::types::*;

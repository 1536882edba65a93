//! HTML parsing and data extraction
//!
//! This module handles parsing Nitter profile pages and extracting
//! structured post records.

pub mod selectors;
pub mod timeline;

// Re-export main parser and public types
pub use selectors::TimelineSelectors;
pub use timeline::{extract_status_id, parse_timestamp, TimelineParser, ORIGIN_BASE};

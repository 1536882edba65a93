//! Nitter timeline page parser
//!
//! Turns one rendered profile page into an ordered list of [`PostRecord`]s,
//! newest first as the mirror renders them.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

use crate::models::PostRecord;
use crate::parser::selectors::{TimelineSelectors, UNAVAILABLE_CLASS};
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// Canonical site the mirrors proxy
pub const ORIGIN_BASE: &str = "https://twitter.com";

/// Nitter date attribute, e.g. `Jan 5, 2023 · 3:04 PM UTC`
const DATE_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// HTML parser for Nitter profile timelines
pub struct TimelineParser {
    selectors: TimelineSelectors,
}

impl TimelineParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: TimelineSelectors::new(),
        }
    }

    /// Parse a timeline page, keeping at most `max_items` posts
    ///
    /// Pinned and unavailable items are skipped and do not count towards
    /// `max_items`.
    ///
    /// # Errors
    /// Returns `ParseError::TimelineNotFound` if the page has no timeline,
    /// or the first per-item error when a post is missing a required field
    pub fn parse(&self, html: &str, max_items: usize) -> Result<Vec<PostRecord>, ParseError> {
        let document = Html::parse_document(html);

        let timeline = document
            .select(self.selectors.timeline)
            .next()
            .ok_or(ParseError::TimelineNotFound)?;

        let mut records = Vec::new();
        for item in timeline.select(self.selectors.item) {
            if records.len() >= max_items {
                break;
            }

            if self.is_skipped(&item) {
                continue;
            }

            let record = self.parse_item(&item)?;
            tracing::trace!(id = record.id, url = %record.url, "Parsed timeline item");
            records.push(record);
        }

        Ok(records)
    }

    fn is_skipped(&self, item: &ElementRef<'_>) -> bool {
        item.select(self.selectors.pinned).next().is_some()
            || item.value().classes().any(|c| c == UNAVAILABLE_CLASS)
    }

    fn parse_item(&self, item: &ElementRef<'_>) -> Result<PostRecord, ParseError> {
        let href = self
            .attr(item, self.selectors.link, "href")
            .ok_or(ParseError::MissingField { field: "tweet link" })?;
        let id = extract_status_id(&href)?;

        let full_name = self
            .attr(item, self.selectors.full_name, "title")
            .ok_or(ParseError::MissingField { field: "full name" })?;

        let username = self
            .attr(item, self.selectors.username, "title")
            .ok_or(ParseError::MissingField { field: "username" })?;

        let date = self
            .attr(item, self.selectors.date, "title")
            .ok_or(ParseError::MissingField { field: "date" })?;
        let timestamp = parse_timestamp(&date)?;

        let content = item
            .select(self.selectors.content)
            .next()
            .map(|el| absolutize_links(&el.inner_html()))
            .ok_or(ParseError::MissingField { field: "content" })?;

        Ok(PostRecord {
            id,
            timestamp,
            url: format!("{ORIGIN_BASE}{href}"),
            full_name,
            username,
            content,
        })
    }

    fn attr(
        &self,
        item: &ElementRef<'_>,
        selector: &scraper::Selector,
        name: &str,
    ) -> Option<String> {
        item.select(selector)
            .next()
            .and_then(|el| el.value().attr(name))
            .map(str::to_string)
    }
}

impl Default for TimelineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the numeric status id from a link like `/jack/status/20#m`
pub fn extract_status_id(href: &str) -> Result<u64, ParseError> {
    static STATUS_RE: OnceLock<Regex> = OnceLock::new();

    let re = STATUS_RE.get_or_init(|| Regex::new(r"status/([0-9]+)").expect("Invalid regex pattern"));

    re.captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ParseError::IdExtractionFailed(href.to_string()))
}

/// Parse the Nitter date attribute into UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let cleaned = normalize_whitespace(&raw.replace('·', " "));
    let without_zone = cleaned
        .strip_suffix(" UTC")
        .or_else(|| cleaned.strip_suffix(" GMT"))
        .unwrap_or(&cleaned);

    NaiveDateTime::parse_from_str(without_zone, DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}

/// Point mirror-relative links at the origin site
fn absolutize_links(content: &str) -> String {
    content.replace("href=\"/", &format!("href=\"{ORIGIN_BASE}/"))
}

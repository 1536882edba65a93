//! CSS selectors for Nitter timeline pages
//!
//! Nitter renders a profile as a `div.timeline` holding one
//! `div.timeline-item` per post; everything else on the page is ignored.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref TIMELINE: Selector = parse_selector!("div.timeline");
    static ref TIMELINE_ITEM: Selector = parse_selector!("div.timeline-item");
    static ref PINNED: Selector = parse_selector!("div.pinned");
    static ref TWEET_LINK: Selector = parse_selector!("a.tweet-link");
    static ref FULLNAME: Selector = parse_selector!("a.fullname");
    static ref USERNAME: Selector = parse_selector!("a.username");
    static ref TWEET_DATE: Selector = parse_selector!("span.tweet-date a");
    static ref TWEET_CONTENT: Selector = parse_selector!("div.tweet-content");
}

/// Selectors for a Nitter profile timeline
pub struct TimelineSelectors {
    pub timeline: &'static Selector,
    pub item: &'static Selector,
    pub pinned: &'static Selector,
    pub link: &'static Selector,
    pub full_name: &'static Selector,
    pub username: &'static Selector,
    pub date: &'static Selector,
    pub content: &'static Selector,
}

impl TimelineSelectors {
    pub fn new() -> Self {
        Self {
            timeline: &TIMELINE,
            item: &TIMELINE_ITEM,
            pinned: &PINNED,
            link: &TWEET_LINK,
            full_name: &FULLNAME,
            username: &USERNAME,
            date: &TWEET_DATE,
            content: &TWEET_CONTENT,
        }
    }
}

impl Default for TimelineSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Class marking posts that were deleted or withheld
pub const UNAVAILABLE_CLASS: &str = "unavailable";

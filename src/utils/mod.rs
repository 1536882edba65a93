//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use regex::Regex;
use std::sync::OnceLock;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Strip a scheme and trailing path from a directory host name
///
/// The instance directory lists bare hosts, but hand-edited configs
/// sometimes carry `https://host/`.
pub fn normalize_host(name: &str) -> String {
    let name = name.trim();
    let without_scheme = name
        .strip_prefix("https://")
        .or_else(|| name.strip_prefix("http://"))
        .unwrap_or(name);
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

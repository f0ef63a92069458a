//! Type identifier validation.
//!
//! A type identifier names a message kind in the host's registry, as a
//! dotted path with an optional leading `/`:
//!
//! ```text
//! bank.Send
//! /cosmos.bank.v1beta1.MsgSend
//! ```

use crate::{error::CircuitError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static TYPE_URL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    TYPE_URL_PATTERN.get_or_init(|| {
        Regex::new(r"^/?[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("type url pattern is valid")
    })
}

/// Checks that `type_url` is a well-formed type identifier.
///
/// # Errors
///
/// Returns `CircuitError::InvalidArgument` if it is not.
pub fn validate_type_url(type_url: &str) -> Result<()> {
    if pattern().is_match(type_url) {
        Ok(())
    } else {
        Err(CircuitError::InvalidArgument(format!(
            "malformed type url '{type_url}'"
        )))
    }
}

/// Validates a list of type identifiers and drops repeats.
///
/// Order of first occurrence is kept.
///
/// # Errors
///
/// Returns `CircuitError::InvalidArgument` if the list is empty or any
/// entry is malformed.
pub fn normalize_type_urls<S: AsRef<str>>(type_urls: &[S]) -> Result<Vec<String>> {
    if type_urls.is_empty() {
        return Err(CircuitError::InvalidArgument(
            "at least one type url is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(type_urls.len());
    for type_url in type_urls {
        let type_url = type_url.as_ref();
        validate_type_url(type_url)?;
        if seen.insert(type_url) {
            normalized.push(type_url.to_string());
        }
    }
    Ok(normalized)
}

/// Splits a comma-separated list of type identifiers.
///
/// Whitespace around entries is ignored. Empty entries are an error rather
/// than being skipped, so `"bank.Send,"` is rejected.
///
/// # Example
///
/// ```rust
/// use circuit_core::split_type_urls;
///
/// let urls = split_type_urls("bank.Send, gov.Vote").unwrap();
/// assert_eq!(urls, vec!["bank.Send", "gov.Vote"]);
/// ```
pub fn split_type_urls(list: &str) -> Result<Vec<String>> {
    let entries: Vec<&str> = list.split(',').map(str::trim).collect();
    if entries.iter().any(|entry| entry.is_empty()) {
        return Err(CircuitError::InvalidArgument(format!(
            "empty entry in type url list '{list}'"
        )));
    }
    normalize_type_urls(&entries)
}

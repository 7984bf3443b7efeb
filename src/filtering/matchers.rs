//! Token list matching for filter text predicates.
//!
//! Filter text fields hold comma or newline separated tokens. Tokens are
//! globs (`*`/`?`) by default, full regexes when the filter says so; both
//! match case-insensitively against the whole value. Compiled patterns are
//! cached process-wide since filters are evaluated for every announce.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::OnceLock;
use tracing::warn;

fn pattern_cache() -> &'static Mutex<HashMap<String, Option<Regex>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Splits a filter list field into trimmed tokens.
#[must_use]
pub fn tokens(list: &str) -> Vec<String> {
    list.split([',', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn glob_to_pattern(token: &str) -> String {
    let escaped = regex::escape(token);
    let pattern = escaped.replace(r"\*", ".*").replace(r"\?", ".");
    format!("(?i)^{pattern}$")
}

fn compiled(pattern: &str) -> Option<Regex> {
    let mut cache = pattern_cache().lock().expect("pattern cache poisoned");
    cache
        .entry(pattern.to_string())
        .or_insert_with(|| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                warn!(%pattern, %err, "ignoring invalid filter pattern");
                None
            }
        })
        .clone()
}

fn token_matches(token: &str, value: &str, use_regex: bool) -> bool {
    if use_regex {
        let pattern = format!("(?i){token}");
        return compiled(&pattern).is_some_and(|re| re.is_match(value));
    }

    if !token.contains(['*', '?']) {
        return token.eq_ignore_ascii_case(value);
    }
    compiled(&glob_to_pattern(token)).is_some_and(|re| re.is_match(value))
}

/// True when at least one token in `list` matches `value`.
#[must_use]
pub fn matches_any(list: &str, value: &str, use_regex: bool) -> bool {
    tokens(list)
        .iter()
        .any(|token| token_matches(token, value, use_regex))
}

/// Case-insensitive `value ∈ list` for enumerated set predicates.
#[must_use]
pub fn list_contains(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

/// True when `values` and `list` intersect, case-insensitively.
#[must_use]
pub fn intersects(list: &[String], values: &[String]) -> bool {
    values.iter().any(|v| list_contains(list, v))
}

/// Case-insensitive substring match used by the shows predicate.
#[must_use]
pub fn contains_any_substring(list: &str, value: &str) -> bool {
    let value = value.to_lowercase();
    tokens(list)
        .iter()
        .any(|token| value.contains(&token.to_lowercase()))
}

/// Range expression evaluation: `A`, `A-B` and comma-combined forms.
/// Unparseable chunks never match.
#[must_use]
pub fn range_contains(expr: &str, value: i32) -> bool {
    for chunk in tokens(expr) {
        if let Some((lo, hi)) = chunk.split_once('-') {
            if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<i32>(), hi.trim().parse::<i32>())
                && (lo..=hi).contains(&value)
            {
                return true;
            }
        } else if chunk.parse::<i32>() == Ok(value) {
            return true;
        }
    }
    false
}

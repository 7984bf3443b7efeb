pub mod name;
pub mod size;
pub mod tags;
pub mod vars;

use regex::Regex;
use std::sync::OnceLock;

pub(crate) fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Splits `s` on any character in `seps`, dropping empty fields.
#[must_use]
pub fn split_any(s: &str, seps: &str) -> Vec<String> {
    s.split(|c| seps.contains(c))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

//! `{{ .var }}` URL templating.
//!
//! Templates in definition `match` blocks reference captured variables and
//! user-supplied setting values. Rendering is a straight substitution; a
//! reference that resolves to nothing is an error so a half-built download
//! URL never leaves the pipeline.

use crate::parser::get_regex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template references unknown variable '{0}'")]
    UnknownVariable(String),
}

/// Renders `template`, replacing every `{{ .name }}` with the value from
/// `vars`.
pub fn render(template: &str, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\{\{\s*\.(\w+)\s*\}\}");

    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in re.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];
        let value = vars
            .get(name)
            .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))?;

        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_variables() {
        let out = render(
            "{{ .baseUrl }}/download/{{ .torrentId }}/{{ .passkey }}",
            &vars(&[
                ("baseUrl", "https://mock.example"),
                ("torrentId", "4242"),
                ("passkey", "s3cr3t"),
            ]),
        )
        .unwrap();
        assert_eq!(out, "https://mock.example/download/4242/s3cr3t");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = render("{{ .missing }}", &vars(&[])).unwrap_err();
        assert_eq!(err, TemplateError::UnknownVariable("missing".to_string()));
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            render("https://mock.example/rss", &vars(&[])).unwrap(),
            "https://mock.example/rss"
        );
    }

    #[test]
    fn tolerates_spacing() {
        let out = render("{{.id}} {{ .id }}", &vars(&[("id", "7")])).unwrap();
        assert_eq!(out, "7 7");
    }
}

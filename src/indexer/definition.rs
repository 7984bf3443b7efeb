//! Declarative indexer definition schema.
//!
//! One YAML file per tracker: identity, the IRC network it announces on,
//! announcer nicks, line patterns with named capture variables, and URL
//! templates for the info and download links.

use crate::models::Protocol;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerDefinition {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub privacy: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub supports: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub settings: Vec<SettingSchema>,
    pub irc: Option<IrcBlock>,
}

impl IndexerDefinition {
    /// Names of required settings, across the tracker and IRC blocks.
    pub fn required_settings(&self) -> impl Iterator<Item = &str> {
        let irc = self.irc.iter().flat_map(|irc| irc.settings.iter());
        self.settings
            .iter()
            .chain(irc)
            .filter(|s| s.required)
            .map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    #[default]
    Text,
    Secret,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingSchema {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: SettingKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcBlock {
    pub network: String,
    pub server: String,
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    pub channels: Vec<String>,
    pub announcers: Vec<String>,
    #[serde(default)]
    pub settings: Vec<SettingSchema>,
    #[serde(default)]
    pub invite_command: Option<String>,
    pub parse: Option<ParseBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseType {
    #[default]
    Single,
    Multi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseBlock {
    #[serde(rename = "type", default)]
    pub kind: ParseType,
    #[serde(rename = "forcesizeunit", default)]
    pub force_size_unit: Option<String>,
    pub lines: Vec<ParseLine>,
    #[serde(rename = "match")]
    pub match_block: MatchBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseLine {
    #[serde(default)]
    pub test: Vec<String>,
    pub pattern: String,
    pub vars: Vec<String>,
    #[serde(default)]
    pub ignore: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchBlock {
    #[serde(default)]
    pub infourl: String,
    #[serde(default)]
    pub torrenturl: String,
}

//! Indexer definition registry.
//!
//! Definitions ship embedded in the binary; a configured directory of YAML
//! files can add to or replace them. User settings from `config.toml` are
//! merged in at load time, and the finished registry is published as an
//! immutable snapshot behind an `RwLock<Arc<_>>` so announce processing
//! never blocks a reload.

pub mod definition;
pub mod template;

use anyhow::{Context, Result};
use regex::Regex;
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use definition::{IndexerDefinition, IrcBlock, ParseBlock};

#[derive(RustEmbed)]
#[folder = "definitions/"]
struct EmbeddedDefinitions;

/// One definition line pattern with its regex compiled.
pub struct CompiledLine {
    pub regex: Regex,
    pub vars: Vec<String>,
    pub ignore: bool,
}

/// A loaded definition plus the user's setting values for it.
pub struct CompiledIndexer {
    pub definition: IndexerDefinition,
    pub lines: Vec<CompiledLine>,
    pub settings: HashMap<String, String>,
    pub enabled: bool,
}

impl CompiledIndexer {
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.definition.identifier
    }

    #[must_use]
    pub fn irc(&self) -> Option<&IrcBlock> {
        self.definition.irc.as_ref()
    }

    #[must_use]
    pub fn parse(&self) -> Option<&ParseBlock> {
        self.irc().and_then(|irc| irc.parse.as_ref())
    }

    #[must_use]
    pub fn force_size_unit(&self) -> Option<&str> {
        self.parse().and_then(|p| p.force_size_unit.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AnnounceKey {
    network: String,
    channel: String,
    announcer: String,
}

impl AnnounceKey {
    fn new(network: &str, channel: &str, announcer: &str) -> Self {
        Self {
            network: network.to_lowercase(),
            channel: channel.to_lowercase(),
            announcer: announcer.to_lowercase(),
        }
    }
}

#[derive(Default)]
pub struct Registry {
    indexers: HashMap<String, Arc<CompiledIndexer>>,
    announce_index: HashMap<AnnounceKey, Arc<CompiledIndexer>>,
}

impl Registry {
    /// Loads embedded definitions, then `extra_dir` overrides, and merges
    /// user configuration. Structurally invalid YAML is fatal; a definition
    /// whose line pattern does not compile is skipped with a warning.
    pub fn load(extra_dir: Option<&Path>, configs: &[IndexerConfig]) -> Result<Self> {
        let mut sources: Vec<(String, String)> = Vec::new();

        for file in EmbeddedDefinitions::iter() {
            let content = EmbeddedDefinitions::get(&file)
                .with_context(|| format!("missing embedded definition {file}"))?;
            let text = std::str::from_utf8(content.data.as_ref())
                .with_context(|| format!("embedded definition {file} is not utf-8"))?
                .to_string();
            sources.push((file.to_string(), text));
        }

        if let Some(dir) = extra_dir {
            for entry in std::fs::read_dir(dir)
                .with_context(|| format!("reading definition dir {}", dir.display()))?
            {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    sources.push((path.display().to_string(), text));
                }
            }
        }

        let mut registry = Self::default();
        for (name, text) in sources {
            let def: IndexerDefinition = serde_yaml::from_str(&text)
                .with_context(|| format!("invalid indexer definition {name}"))?;
            registry.insert(def, configs);
        }

        info!(
            definitions = registry.indexers.len(),
            active = registry.announce_index.len(),
            "indexer definitions loaded"
        );

        Ok(registry)
    }

    fn insert(&mut self, def: IndexerDefinition, configs: &[IndexerConfig]) {
        let identifier = def.identifier.clone();

        let mut lines = Vec::new();
        if let Some(parse) = def.irc.as_ref().and_then(|irc| irc.parse.as_ref()) {
            for line in &parse.lines {
                match Regex::new(&line.pattern) {
                    Ok(regex) => lines.push(CompiledLine {
                        regex,
                        vars: line.vars.clone(),
                        ignore: line.ignore,
                    }),
                    Err(err) => {
                        warn!(indexer = %identifier, %err, "skipping definition with invalid pattern");
                        return;
                    }
                }
            }
        }

        let user = configs.iter().find(|c| c.identifier == identifier);

        // schema defaults first, user values on top
        let mut settings: HashMap<String, String> = HashMap::new();
        let schema = def
            .settings
            .iter()
            .chain(def.irc.iter().flat_map(|irc| irc.settings.iter()));
        for setting in schema {
            if let Some(default) = &setting.default {
                settings.insert(setting.name.clone(), default.clone());
            }
        }
        if let Some(user) = user {
            for (k, v) in &user.settings {
                settings.insert(k.clone(), v.clone());
            }
        }

        let mut enabled = user.is_some_and(|u| u.enabled);
        if enabled {
            let missing: Vec<&str> = def
                .required_settings()
                .filter(|name| !settings.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                warn!(indexer = %identifier, ?missing, "disabling indexer, required settings missing");
                enabled = false;
            }
        }

        let compiled = Arc::new(CompiledIndexer {
            definition: def,
            lines,
            settings,
            enabled,
        });

        if enabled && let Some(irc) = compiled.irc() {
            for channel in &irc.channels {
                for announcer in &irc.announcers {
                    self.announce_index.insert(
                        AnnounceKey::new(&irc.network, channel, announcer),
                        Arc::clone(&compiled),
                    );
                }
            }
        }

        debug!(indexer = %identifier, enabled, "definition registered");
        self.indexers.insert(identifier, compiled);
    }

    #[must_use]
    pub fn get_by_identifier(&self, id: &str) -> Option<&Arc<CompiledIndexer>> {
        self.indexers.get(id)
    }

    /// Routes an announce to its definition by network, channel and sender.
    #[must_use]
    pub fn get_for_announcer(
        &self,
        network: &str,
        channel: &str,
        announcer: &str,
    ) -> Option<&Arc<CompiledIndexer>> {
        self.announce_index
            .get(&AnnounceKey::new(network, channel, announcer))
    }

    /// Indexers that should have an IRC session running.
    #[must_use]
    pub fn enabled_irc_indexers(&self) -> Vec<Arc<CompiledIndexer>> {
        let mut out: Vec<Arc<CompiledIndexer>> = self
            .indexers
            .values()
            .filter(|i| i.enabled && i.irc().is_some())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        out
    }
}

/// Copy-on-write published registry: readers clone the `Arc` snapshot,
/// reload swaps the whole thing.
pub struct SharedRegistry {
    inner: RwLock<Arc<Registry>>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: RwLock::new(Arc::new(registry)),
        }
    }

    pub async fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&*self.inner.read().await)
    }

    pub async fn publish(&self, registry: Registry) {
        *self.inner.write().await = Arc::new(registry);
        info!("indexer registry reloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(identifier: &str, settings: &[(&str, &str)]) -> IndexerConfig {
        IndexerConfig {
            identifier: identifier.to_string(),
            enabled: true,
            irc_nick: "testbot".to_string(),
            irc_auth_account: String::new(),
            irc_auth_password: String::new(),
            irc_sasl: false,
            settings: settings
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn loads_embedded_definitions() {
        let registry = Registry::load(None, &[]).unwrap();
        assert!(registry.get_by_identifier("polarbytes").is_some());
        assert!(registry.get_by_identifier("audiohaven").is_some());
        assert!(registry.get_by_identifier("seedforge").is_some());
    }

    #[test]
    fn unconfigured_indexers_are_disabled() {
        let registry = Registry::load(None, &[]).unwrap();
        assert!(registry.enabled_irc_indexers().is_empty());
        assert!(
            registry
                .get_for_announcer("PolarBytes.IRC", "#pb-announce", "PolarBot")
                .is_none()
        );
    }

    #[test]
    fn announce_routing_is_case_insensitive() {
        let configs = vec![test_config(
            "polarbytes",
            &[("passkey", "k"), ("invite_key", "inv")],
        )];
        let registry = Registry::load(None, &configs).unwrap();
        let hit = registry
            .get_for_announcer("polarbytes.irc", "#PB-Announce", "polarbot")
            .unwrap();
        assert_eq!(hit.identifier(), "polarbytes");
    }

    #[test]
    fn missing_required_setting_disables() {
        let configs = vec![test_config("polarbytes", &[])];
        let registry = Registry::load(None, &configs).unwrap();
        let indexer = registry.get_by_identifier("polarbytes").unwrap();
        assert!(!indexer.enabled);
    }
}

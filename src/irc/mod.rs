//! IRC session management.
//!
//! One cooperative session per configured network. Sessions read announce
//! channels and hand matching `PRIVMSG` lines to the pipeline in arrival
//! order over a bounded channel.

pub mod message;
pub mod session;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::IndexerConfig;
use crate::domain::events::NotificationEvent;
use crate::indexer::{Registry, template};
use session::IrcSession;

/// One announce line as it left a session.
#[derive(Debug, Clone)]
pub struct Announce {
    pub network: String,
    pub channel: String,
    pub announcer: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Connection settings for one network session.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: String,
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub nick: String,
    pub auth_account: String,
    pub auth_password: String,
    pub sasl: bool,
    pub channels: Vec<String>,
    pub announcers: Vec<String>,
    pub invite_commands: Vec<String>,
}

/// Session timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct IrcTimings {
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub nickserv_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub ready_reset: Duration,
}

impl Default for IrcTimings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(60),
            pong_timeout: Duration::from_secs(90),
            nickserv_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(300),
            ready_reset: Duration::from_secs(30),
        }
    }
}

/// Builds one `NetworkConfig` per distinct (network, server, port) across
/// the enabled indexers, merging channels and announcers of indexers that
/// share a network.
#[must_use]
pub fn build_network_configs(registry: &Registry, configs: &[IndexerConfig]) -> Vec<NetworkConfig> {
    let mut networks: HashMap<(String, String, u16), NetworkConfig> = HashMap::new();

    for indexer in registry.enabled_irc_indexers() {
        let Some(irc) = indexer.irc() else { continue };
        let Some(user) = configs.iter().find(|c| c.identifier == indexer.identifier()) else {
            continue;
        };
        if user.irc_nick.is_empty() {
            warn!(indexer = %indexer.identifier(), "no irc nick configured, skipping network");
            continue;
        }

        let key = (
            irc.network.to_lowercase(),
            irc.server.to_lowercase(),
            irc.port,
        );
        let entry = networks.entry(key).or_insert_with(|| NetworkConfig {
            network: irc.network.clone(),
            server: irc.server.clone(),
            port: irc.port,
            tls: irc.tls,
            nick: user.irc_nick.clone(),
            auth_account: user.irc_auth_account.clone(),
            auth_password: user.irc_auth_password.clone(),
            sasl: user.irc_sasl,
            channels: Vec::new(),
            announcers: Vec::new(),
            invite_commands: Vec::new(),
        });

        for channel in &irc.channels {
            if !entry.channels.iter().any(|c| c.eq_ignore_ascii_case(channel)) {
                entry.channels.push(channel.clone());
            }
        }
        for announcer in &irc.announcers {
            if !entry
                .announcers
                .iter()
                .any(|a| a.eq_ignore_ascii_case(announcer))
            {
                entry.announcers.push(announcer.clone());
            }
        }

        if let Some(command) = &irc.invite_command {
            let mut vars = indexer.settings.clone();
            vars.insert("nick".to_string(), user.irc_nick.clone());
            match template::render(command, &vars) {
                Ok(rendered) => entry.invite_commands.push(rendered),
                Err(err) => {
                    warn!(indexer = %indexer.identifier(), %err, "invite command template failed");
                }
            }
        }
    }

    let mut out: Vec<NetworkConfig> = networks.into_values().collect();
    out.sort_by(|a, b| a.network.cmp(&b.network));
    out
}

/// Spawns one session task per network.
#[must_use]
pub fn start_sessions(
    networks: Vec<NetworkConfig>,
    timings: IrcTimings,
    announce_tx: &mpsc::Sender<Announce>,
    events: &broadcast::Sender<NotificationEvent>,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    networks
        .into_iter()
        .map(|network| {
            let session = IrcSession::new(
                network,
                timings,
                announce_tx.clone(),
                events.clone(),
                shutdown.clone(),
            );
            tokio::spawn(session.run())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexer_config(identifier: &str, settings: &[(&str, &str)]) -> IndexerConfig {
        IndexerConfig {
            identifier: identifier.to_string(),
            enabled: true,
            irc_nick: "announcebot".to_string(),
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
    fn builds_network_with_rendered_invite_command() {
        let configs = vec![indexer_config(
            "polarbytes",
            &[("passkey", "k"), ("invite_key", "inv123")],
        )];
        let registry = Registry::load(None, &configs).unwrap();
        let networks = build_network_configs(&registry, &configs);

        assert_eq!(networks.len(), 1);
        let net = &networks[0];
        assert_eq!(net.network, "PolarBytes.IRC");
        assert_eq!(net.port, 6697);
        assert!(net.tls);
        assert_eq!(net.channels, vec!["#pb-announce"]);
        assert_eq!(net.announcers, vec!["PolarBot"]);
        assert_eq!(net.invite_commands, vec!["PRIVMSG PolarBot :invite inv123"]);
    }

    #[test]
    fn no_enabled_indexers_means_no_networks() {
        let registry = Registry::load(None, &[]).unwrap();
        assert!(build_network_configs(&registry, &[]).is_empty());
    }
}

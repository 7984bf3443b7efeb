//! Domain events for the application.
//!
//! These events are published on the broadcast bus so notification
//! transports and the API layer can observe pipeline and IRC state changes.

use serde::Serialize;

/// Events emitted by the core.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    IrcDisconnected {
        network: String,
    },
    IrcReconnected {
        network: String,
    },

    PushApproved {
        indexer: String,
        torrent_name: String,
        filter: String,
    },
    PushRejected {
        indexer: String,
        torrent_name: String,
        filter: String,
        rejections: Vec<String>,
    },
    PushError {
        indexer: String,
        torrent_name: String,
        message: String,
    },
}

//! One IRC network session.
//!
//! The session is a cooperative state machine:
//!
//! ```text
//! DISCONNECTED → CONNECTING → TLS_HANDSHAKE → REGISTERING
//!              → IDENTIFYING → JOINING → AWAITING_INVITES → READY
//!              → (on error) BACKING_OFF → CONNECTING
//!              → (on stop)  CLOSING → DISCONNECTED
//! ```
//!
//! Exactly one reader and one writer task per session. The writer drains a
//! bounded mailbox; overflow drops the oldest non-PING command so keepalive
//! never starves. All announce lines leave this module in arrival order.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use std::collections::HashSet;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::{Instant, interval, sleep, sleep_until, timeout};
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::domain::events::NotificationEvent;
use crate::irc::message::Message;
use crate::irc::{Announce, IrcTimings, NetworkConfig};

const MAILBOX_CAPACITY: usize = 64;
const MAX_NICK_RETRIES: u32 = 3;
const MAX_LINE_LEN: usize = 510;

#[derive(Debug, Error)]
pub enum IrcError {
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tls server name")]
    InvalidServerName,
    #[error("nick in use after {MAX_NICK_RETRIES} retries")]
    NickInUse,
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("no pong within deadline")]
    PongTimeout,
    #[error("server closed the connection: {0}")]
    Disconnected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    TlsHandshake,
    Registering,
    Identifying,
    Joining,
    AwaitingInvites,
    Ready,
    BackingOff,
    Closing,
}

/// Outbound command queue. Bounded; overflow drops the oldest non-PING
/// command and logs it.
struct Mailbox {
    queue: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn push(&self, command: impl Into<String>) {
        let command = command.into();
        {
            let mut queue = self.queue.lock().expect("mailbox poisoned");
            if queue.len() >= MAILBOX_CAPACITY {
                let victim = queue
                    .iter()
                    .position(|c| !c.starts_with("PING") && !c.starts_with("PONG"))
                    .unwrap_or(0);
                if let Some(dropped) = queue.remove(victim) {
                    warn!(dropped = %dropped, "outbound mailbox full, dropping oldest command");
                }
            }
            queue.push_back(command);
        }
        self.notify.notify_one();
    }

    async fn pop(&self) -> String {
        loop {
            if let Some(command) = self.queue.lock().expect("mailbox poisoned").pop_front() {
                return command;
            }
            self.notify.notified().await;
        }
    }

    fn clear(&self) {
        self.queue.lock().expect("mailbox poisoned").clear();
    }

    fn is_empty(&self) -> bool {
        self.queue.lock().expect("mailbox poisoned").is_empty()
    }
}

type ReadStream = Box<dyn AsyncRead + Send + Unpin>;
type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, attempt: 0 }
    }

    fn next(&mut self) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(self.attempt.min(16) as i32);
        let capped = exp.min(self.cap.as_secs_f64());
        self.attempt = self.attempt.saturating_add(1);
        let jitter = rand::rng().random_range(0.5..=1.0);
        Duration::from_secs_f64(capped * jitter)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

pub struct IrcSession {
    config: NetworkConfig,
    timings: IrcTimings,
    announce_tx: mpsc::Sender<Announce>,
    events: broadcast::Sender<NotificationEvent>,
    shutdown: watch::Receiver<bool>,
    mailbox: Arc<Mailbox>,
    had_disconnect: bool,
    last_ready_dwell: Duration,
}

impl IrcSession {
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        timings: IrcTimings,
        announce_tx: mpsc::Sender<Announce>,
        events: broadcast::Sender<NotificationEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            timings,
            announce_tx,
            events,
            shutdown,
            mailbox: Arc::new(Mailbox::new()),
            had_disconnect: false,
            last_ready_dwell: Duration::ZERO,
        }
    }

    /// Runs the session until shutdown: connect, drive, back off, repeat.
    pub async fn run(mut self) {
        let mut backoff =
            ExponentialBackoff::new(self.timings.backoff_base, self.timings.backoff_cap);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            match self.connect_and_drive().await {
                Ok(()) => break,
                Err(err) => {
                    warn!(network = %self.config.network, %err, "session lost");
                    let _ = self.events.send(NotificationEvent::IrcDisconnected {
                        network: self.config.network.clone(),
                    });
                    self.had_disconnect = true;

                    if self.last_ready_dwell >= self.timings.ready_reset {
                        backoff.reset();
                    }

                    let delay = backoff.next();
                    debug!(network = %self.config.network, state = ?SessionState::BackingOff, ?delay, "reconnecting after backoff");
                    let mut shutdown = self.shutdown.clone();
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!(network = %self.config.network, "session stopped");
    }

    async fn connect_and_drive(&mut self) -> Result<(), IrcError> {
        let network = self.config.network.clone();
        debug!(%network, state = ?SessionState::Connecting, server = %self.config.server, port = self.config.port, "connecting");

        let tcp = timeout(
            self.timings.connect_timeout,
            TcpStream::connect((self.config.server.as_str(), self.config.port)),
        )
        .await
        .map_err(|_| IrcError::ConnectTimeout)??;

        let (read_half, mut write_half): (ReadStream, WriteStream) = if self.config.tls {
            debug!(%network, state = ?SessionState::TlsHandshake, "tls handshake");
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let tls_config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let connector = TlsConnector::from(Arc::new(tls_config));
            let server_name = ServerName::try_from(self.config.server.clone())
                .map_err(|_| IrcError::InvalidServerName)?;
            let (r, w) = tokio::io::split(connector.connect(server_name, tcp).await?);
            (Box::new(r), Box::new(w))
        } else {
            let (r, w) = tokio::io::split(tcp);
            (Box::new(r), Box::new(w))
        };

        self.mailbox.clear();
        let writer_mailbox = Arc::clone(&self.mailbox);
        let writer = tokio::spawn(async move {
            loop {
                let mut line = writer_mailbox.pop().await;
                if line.len() > MAX_LINE_LEN {
                    let mut cut = MAX_LINE_LEN;
                    while !line.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    line.truncate(cut);
                }
                line.push_str("\r\n");
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if write_half.flush().await.is_err() {
                    break;
                }
            }
        });

        let result = self.drive(BufReader::new(read_half)).await;

        // let the writer drain QUIT and friends before tearing down
        let drain_deadline = Instant::now() + Duration::from_millis(500);
        while !self.mailbox.is_empty() && Instant::now() < drain_deadline {
            sleep(Duration::from_millis(20)).await;
        }
        writer.abort();

        result
    }

    #[allow(clippy::too_many_lines)]
    async fn drive(&mut self, reader: BufReader<ReadStream>) -> Result<(), IrcError> {
        let config = self.config.clone();
        let timings = self.timings;
        let mailbox = Arc::clone(&self.mailbox);
        let announce_tx = self.announce_tx.clone();
        let events = self.events.clone();
        let mut shutdown = self.shutdown.clone();
        let had_disconnect = self.had_disconnect;

        let mut state = SessionState::Registering;
        let mut nick = config.nick.clone();
        let mut nick_retries: u32 = 0;
        let mut identify_deadline: Option<Instant> = None;
        let mut ready_at: Option<Instant> = None;
        let mut joined: HashSet<String> = HashSet::new();
        let wanted: HashSet<String> = config
            .channels
            .iter()
            .map(|c| c.to_lowercase())
            .collect();
        let announcers: HashSet<String> = config
            .announcers
            .iter()
            .map(|a| a.to_lowercase())
            .collect();

        debug!(network = %config.network, ?state, "registering");
        if config.sasl {
            mailbox.push("CAP REQ :sasl");
        }
        mailbox.push(format!("NICK {nick}"));
        mailbox.push(format!("USER {nick} 8 * :{nick}"));

        let mut lines = reader.lines();
        let mut ping_timer = interval(timings.ping_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ping_timer.reset(); // first tick should come after a full interval
        let mut last_activity = Instant::now();

        let join_all = |state: &mut SessionState| {
            *state = SessionState::Joining;
            for channel in &config.channels {
                mailbox.push(format!("JOIN {channel}"));
            }
        };

        let outcome: Result<(), IrcError> = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        state = SessionState::Closing;
                        debug!(network = %config.network, ?state, "closing");
                        mailbox.push("QUIT :shutting down");
                        break Ok(());
                    }
                }

                _ = ping_timer.tick() => {
                    mailbox.push(format!("PING :{}", config.server));
                    if last_activity.elapsed() > timings.pong_timeout {
                        break Err(IrcError::PongTimeout);
                    }
                }

                () = maybe_deadline(identify_deadline) => {
                    warn!(network = %config.network, "no nickserv confirmation, joining anyway");
                    identify_deadline = None;
                    join_all(&mut state);
                }

                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break Err(IrcError::Disconnected("eof".to_string())),
                        Err(err) => break Err(IrcError::Io(err)),
                    };
                    last_activity = Instant::now();
                    let Some(msg) = Message::parse(&line) else { continue };

                    match msg.command.as_str() {
                        "PING" => {
                            mailbox.push(format!("PONG :{}", msg.body().unwrap_or_default()));
                        }
                        "PONG" => {}
                        "ERROR" => {
                            break Err(IrcError::Disconnected(
                                msg.body().unwrap_or_default().to_string(),
                            ));
                        }

                        "CAP" => {
                            let ack = msg.params.iter().any(|p| p == "ACK");
                            let sasl = msg.params.iter().any(|p| p.contains("sasl"));
                            if ack && sasl {
                                mailbox.push("AUTHENTICATE PLAIN");
                            }
                        }
                        "AUTHENTICATE" => {
                            if msg.params.first().is_some_and(|p| p == "+") {
                                let account = if config.auth_account.is_empty() {
                                    nick.as_str()
                                } else {
                                    config.auth_account.as_str()
                                };
                                let payload = format!(
                                    "{account}\0{account}\0{password}",
                                    password = config.auth_password
                                );
                                mailbox.push(format!("AUTHENTICATE {}", BASE64.encode(payload)));
                            }
                        }
                        // SASL result numerics
                        "903" => {
                            debug!(network = %config.network, "sasl authentication succeeded");
                            mailbox.push("CAP END");
                        }
                        "904" | "905" => {
                            warn!(network = %config.network, "sasl authentication failed");
                            mailbox.push("CAP END");
                        }

                        "433" => {
                            nick_retries += 1;
                            if nick_retries > MAX_NICK_RETRIES {
                                break Err(IrcError::NickInUse);
                            }
                            nick.push('_');
                            debug!(network = %config.network, %nick, "nick in use, retrying");
                            mailbox.push(format!("NICK {nick}"));
                        }

                        // welcome: registration done
                        "001" => {
                            if !config.sasl && !config.auth_password.is_empty() {
                                state = SessionState::Identifying;
                                debug!(network = %config.network, ?state, "identifying with nickserv");
                                let account = if config.auth_account.is_empty() {
                                    nick.as_str()
                                } else {
                                    config.auth_account.as_str()
                                };
                                mailbox.push(format!(
                                    "PRIVMSG NickServ :IDENTIFY {account} {password}",
                                    password = config.auth_password
                                ));
                                identify_deadline =
                                    Some(Instant::now() + timings.nickserv_timeout);
                            } else {
                                join_all(&mut state);
                            }
                        }

                        "NOTICE" => {
                            if msg.sender_nick().is_some_and(|n| n.eq_ignore_ascii_case("NickServ")) {
                                let body = msg.body().unwrap_or_default().to_lowercase();
                                if body.contains("now identified")
                                    || body.contains("password accepted")
                                    || body.contains("now logged in")
                                {
                                    identify_deadline = None;
                                    join_all(&mut state);
                                } else if body.contains("invalid")
                                    || body.contains("incorrect")
                                {
                                    break Err(IrcError::AuthFailed(body));
                                }
                            }
                        }

                        // invite-only / bad key: ask the bot to invite us
                        "473" | "475" => {
                            if config.invite_commands.is_empty() {
                                warn!(network = %config.network, channel = ?msg.params.get(1), "cannot join channel and no invite command configured");
                            } else {
                                state = SessionState::AwaitingInvites;
                                debug!(network = %config.network, ?state, "requesting invite");
                                for command in &config.invite_commands {
                                    mailbox.push(command.clone());
                                }
                            }
                        }
                        "INVITE" => {
                            if let Some(channel) = msg.body() {
                                mailbox.push(format!("JOIN {channel}"));
                            }
                        }

                        "JOIN" => {
                            if msg.sender_nick().is_some_and(|n| n.eq_ignore_ascii_case(&nick)) {
                                let channel = msg
                                    .body()
                                    .unwrap_or_default()
                                    .to_lowercase();
                                if !channel.is_empty() {
                                    joined.insert(channel);
                                }
                                if state != SessionState::Ready && joined.is_superset(&wanted) {
                                    state = SessionState::Ready;
                                    ready_at = Some(Instant::now());
                                    info!(network = %config.network, channels = joined.len(), "connected and ready");
                                    if had_disconnect {
                                        let _ = events.send(NotificationEvent::IrcReconnected {
                                            network: config.network.clone(),
                                        });
                                    }
                                }
                            }
                        }

                        "PRIVMSG" => {
                            let Some(target) = msg.target() else { continue };
                            let Some(sender) = msg.sender_nick() else { continue };
                            if !wanted.contains(&target.to_lowercase())
                                || !announcers.contains(&sender.to_lowercase())
                            {
                                continue;
                            }
                            let Some(body) = msg.body() else { continue };

                            let announce = Announce {
                                network: config.network.clone(),
                                channel: target.to_string(),
                                announcer: sender.to_string(),
                                message: body.to_string(),
                                timestamp: chrono::Utc::now(),
                            };
                            // bounded send keeps per-session arrival order
                            if announce_tx.send(announce).await.is_err() {
                                break Ok(());
                            }
                        }

                        _ => {}
                    }
                }
            }
        };

        self.last_ready_dwell = ready_at.map(|t| t.elapsed()).unwrap_or_default();
        outcome
    }
}

async fn maybe_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

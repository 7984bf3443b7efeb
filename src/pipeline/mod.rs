//! Release pipeline coordinator.
//!
//! Fan-in stage between the IRC sessions and the action dispatcher. Intake
//! is sequential so announces from one session are parsed and matched in
//! arrival order; the slow tail of each release (size probe, external
//! gates, delay, dispatch) runs on a bounded worker pool where ordering is
//! not guaranteed.

pub mod gates;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use crate::domain::events::NotificationEvent;
use crate::filtering::{self, MatchResult};
use crate::indexer::{CompiledIndexer, SharedRegistry, template};
use crate::irc::Announce;
use crate::models::{Filter, Release};
use crate::parser;
use crate::repository::{ActionDispatcher, ApprovedRelease, PushStatus, Repository, SizeProbe};

const DEDUPE_WINDOW: Duration = Duration::from_secs(5);
const TORRENT_FETCH_ATTEMPTS: u32 = 3;

/// Accumulated capture state for a multi-line announce.
struct MultiPending {
    vars: HashMap<String, String>,
    next_line: usize,
}

pub struct Pipeline {
    registry: Arc<SharedRegistry>,
    repo: Arc<dyn Repository>,
    dispatcher: Arc<dyn ActionDispatcher>,
    size_probe: Option<Arc<dyn SizeProbe>>,
    events: broadcast::Sender<NotificationEvent>,
    http: reqwest::Client,
    workers: Arc<Semaphore>,
    dedupe: Mutex<HashMap<(String, String), Instant>>,
    multi_pending: Mutex<HashMap<(String, String), MultiPending>>,
    parse_failures: AtomicU64,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        registry: Arc<SharedRegistry>,
        repo: Arc<dyn Repository>,
        dispatcher: Arc<dyn ActionDispatcher>,
        size_probe: Option<Arc<dyn SizeProbe>>,
        events: broadcast::Sender<NotificationEvent>,
        workers: usize,
    ) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism().map_or(4, std::num::NonZero::get)
        } else {
            workers
        };
        Self {
            registry,
            repo,
            dispatcher,
            size_probe,
            events,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            workers: Arc::new(Semaphore::new(workers)),
            dedupe: Mutex::new(HashMap::new()),
            multi_pending: Mutex::new(HashMap::new()),
            parse_failures: AtomicU64::new(0),
        }
    }

    /// Announce lines that matched no pattern since startup.
    #[must_use]
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    /// Consumes announces until shutdown, then drains in-flight releases for
    /// up to `grace` before cancelling them.
    pub async fn run(
        self: Arc<Self>,
        mut announces: mpsc::Receiver<Announce>,
        mut shutdown: watch::Receiver<bool>,
        grace: Duration,
    ) {
        let mut tails = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                announce = announces.recv() => {
                    let Some(announce) = announce else { break };
                    if let Some((release, filter, size_deferred)) = self.evaluate(announce).await {
                        let this = Arc::clone(&self);
                        tails.spawn(this.finalize(release, filter, size_deferred));
                    }
                    while tails.try_join_next().is_some() {}
                }
            }
        }

        info!(in_flight = tails.len(), "pipeline draining");
        let deadline = Instant::now() + grace;
        while !tails.is_empty() {
            match timeout_at(deadline, tails.join_next()).await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!(cancelled = tails.len(), "drain deadline reached, cancelling releases");
                    break;
                }
            }
        }
        tails.abort_all();
    }

    /// Steps 1–6 of the per-line flow: resolve, capture, build, match, cap.
    /// Returns the approved release ready for its slow tail.
    async fn evaluate(&self, announce: Announce) -> Option<(Release, Filter, bool)> {
        let registry = self.registry.snapshot().await;
        let Some(indexer) =
            registry.get_for_announcer(&announce.network, &announce.channel, &announce.announcer)
        else {
            debug!(network = %announce.network, channel = %announce.channel, announcer = %announce.announcer, "no indexer definition for announce");
            return None;
        };

        let vars = self.capture_vars(indexer, &announce)?;

        let mut release = Release::new(indexer.identifier());
        release.timestamp = announce.timestamp;
        parser::vars::map_vars(&mut release, &vars, indexer.force_size_unit());
        if release.torrent_name.is_empty() {
            debug!(indexer = %release.indexer, "announce carried no torrent name, dropping");
            return None;
        }

        let name = release.torrent_name.clone();
        parser::name::parse_into(&mut release, &name);
        let tags = release.release_tags.clone();
        if !tags.is_empty() {
            parser::tags::parse_release_tags_into(&mut release, &tags);
        }

        if !self.render_urls(indexer, &vars, &mut release) {
            return None;
        }

        if self.is_duplicate(&release) {
            debug!(indexer = %release.indexer, torrent = %release.torrent_name, "duplicate announce within window, dropping");
            return None;
        }

        let filters = match self.repo.list_filters_by_indexer(&release.indexer).await {
            Ok(filters) => filters,
            Err(err) => {
                warn!(indexer = %release.indexer, %err, "loading filters failed");
                return None;
            }
        };
        if filters.is_empty() {
            debug!(indexer = %release.indexer, "no enabled filters, dropping");
            return None;
        }

        let duplicate_episode = if filters.iter().any(|f| f.smart_episode) {
            self.repo
                .known_episode(&release.indexer, &release.title, release.season, release.episode)
                .await
                .unwrap_or(false)
        } else {
            false
        };

        let mut result: MatchResult = filtering::find_match(&release, &filters, duplicate_episode);
        let Some(filter) = result.winner.take() else {
            release.reject(result.rejection_reasons());
            debug!(
                indexer = %release.indexer,
                torrent = %release.torrent_name,
                rejections = ?release.rejections,
                "no filter matched"
            );
            return None;
        };

        if filter.has_download_cap()
            && let Some(unit) = filter.max_downloads_unit
        {
            let counts = match self.repo.download_counts(filter.id).await {
                Ok(counts) => counts,
                Err(err) => {
                    warn!(filter = %filter.name, %err, "download count lookup failed");
                    return None;
                }
            };
            #[allow(clippy::cast_sign_loss)]
            if counts.in_window(unit) >= filter.max_downloads as u32 {
                release.reject(vec!["max_downloads".to_string()]);
                info!(
                    filter = %filter.name,
                    torrent = %release.torrent_name,
                    "download cap reached, rejecting"
                );
                return None;
            }
        }

        release.additional_size_check_required = result.size_deferred;
        release.approve(filter.id, &filter.name);
        if let Err(err) = self.repo.record_approved(&release, filter.id).await {
            warn!(filter = %filter.name, %err, "recording approval failed");
        }

        Some((release, filter, result.size_deferred))
    }

    /// Runs the definition's line patterns over the payload and builds the
    /// capture map, tracking partial state for multi-line announces.
    fn capture_vars(
        &self,
        indexer: &Arc<CompiledIndexer>,
        announce: &Announce,
    ) -> Option<HashMap<String, String>> {
        use crate::indexer::definition::ParseType;

        let parse = indexer.parse()?;
        let lines = &indexer.lines;
        if lines.is_empty() {
            return None;
        }

        let capture_line =
            |idx: usize, out: &mut HashMap<String, String>| -> bool {
                let line = &lines[idx];
                let Some(caps) = line.regex.captures(&announce.message) else {
                    return false;
                };
                if !line.ignore {
                    for (i, var) in line.vars.iter().enumerate() {
                        if let Some(value) = caps.get(i + 1) {
                            out.insert(var.clone(), value.as_str().trim().to_string());
                        }
                    }
                }
                true
            };

        match parse.kind {
            ParseType::Single => {
                let mut vars = HashMap::new();
                for idx in 0..lines.len() {
                    if capture_line(idx, &mut vars) {
                        if lines[idx].ignore {
                            return None;
                        }
                        return Some(vars);
                    }
                }
                self.parse_failures.fetch_add(1, Ordering::Relaxed);
                debug!(indexer = %indexer.identifier(), line = %announce.message, "announce line did not match any pattern");
                None
            }
            ParseType::Multi => {
                let key = (
                    announce.network.to_lowercase(),
                    announce.channel.to_lowercase(),
                );
                let mut pending = self.multi_pending.lock().expect("pending map poisoned");
                let mut entry = pending.remove(&key).unwrap_or(MultiPending {
                    vars: HashMap::new(),
                    next_line: 0,
                });

                let advanced = if entry.next_line < lines.len()
                    && capture_line(entry.next_line, &mut entry.vars)
                {
                    entry.next_line += 1;
                    true
                } else {
                    // out of sync: see if this line restarts the sequence
                    let mut fresh = HashMap::new();
                    if capture_line(0, &mut fresh) {
                        entry = MultiPending {
                            vars: fresh,
                            next_line: 1,
                        };
                        true
                    } else {
                        false
                    }
                };

                if !advanced {
                    self.parse_failures.fetch_add(1, Ordering::Relaxed);
                    pending.insert(key, entry);
                    return None;
                }

                if entry.next_line >= lines.len() {
                    return Some(entry.vars);
                }
                pending.insert(key, entry);
                None
            }
        }
    }

    /// Fills torrent/info URLs from the definition templates. Returns false
    /// when a template references a variable nothing captured.
    fn render_urls(
        &self,
        indexer: &Arc<CompiledIndexer>,
        vars: &HashMap<String, String>,
        release: &mut Release,
    ) -> bool {
        let Some(parse) = indexer.parse() else {
            return true;
        };

        let mut url_vars = indexer.settings.clone();
        for (k, v) in vars {
            url_vars.insert(k.clone(), v.clone());
        }

        if !parse.match_block.torrenturl.is_empty() {
            match template::render(&parse.match_block.torrenturl, &url_vars) {
                Ok(url) => release.torrent_url = url,
                Err(err) => {
                    debug!(indexer = %release.indexer, %err, "torrent url template failed, dropping");
                    return false;
                }
            }
        }
        if !parse.match_block.infourl.is_empty() {
            match template::render(&parse.match_block.infourl, &url_vars) {
                Ok(url) => release.info_url = url,
                Err(err) => {
                    debug!(indexer = %release.indexer, %err, "info url template failed, dropping");
                    return false;
                }
            }
        }
        true
    }

    /// At most one approval per `(indexer, torrent_id)` within the window.
    fn is_duplicate(&self, release: &Release) -> bool {
        let key = (
            release.indexer.clone(),
            if release.torrent_id.is_empty() {
                release.torrent_name.clone()
            } else {
                release.torrent_id.clone()
            },
        );

        let now = Instant::now();
        let mut seen = self.dedupe.lock().expect("dedupe map poisoned");
        seen.retain(|_, t| now.duration_since(*t) < DEDUPE_WINDOW);

        if seen.contains_key(&key) {
            return true;
        }
        seen.insert(key, now);
        false
    }

    /// Steps 7–9: size re-check, external gates, delay, dispatch.
    async fn finalize(self: Arc<Self>, mut release: Release, filter: Filter, size_deferred: bool) {
        let Ok(_permit) = self.workers.acquire().await else {
            return;
        };

        if size_deferred && let Some(probe) = self.size_probe.clone() {
            match self.probe_size(probe.as_ref(), &release).await {
                Ok(size) => {
                    release.size = size;
                    release.additional_size_check_required = false;
                    let (rejections, _) = filtering::check_filter(&release, &filter, false);
                    if !rejections.is_empty() {
                        self.reject(
                            &mut release,
                            &filter,
                            rejections.iter().map(ToString::to_string).collect(),
                        );
                        return;
                    }
                }
                Err(err) => {
                    warn!(torrent = %release.torrent_name, %err, "size probe failed, continuing unchecked");
                }
            }
        }

        if filter.external_script_enabled && !filter.external_script_cmd.is_empty() {
            match gates::run_script(&release, &filter).await {
                Ok(true) => {}
                Ok(false) => {
                    self.reject(&mut release, &filter, vec!["external_script".to_string()]);
                    return;
                }
                Err(err) => {
                    warn!(filter = %filter.name, %err, "external script gate errored");
                    self.reject(&mut release, &filter, vec!["external_script".to_string()]);
                    return;
                }
            }
        }

        if filter.external_webhook_enabled && !filter.external_webhook_host.is_empty() {
            match gates::run_webhook(&self.http, &release, &filter).await {
                Ok(true) => {}
                Ok(false) => {
                    self.reject(&mut release, &filter, vec!["external_webhook".to_string()]);
                    return;
                }
                Err(err) => {
                    warn!(filter = %filter.name, %err, "external webhook gate errored");
                    self.reject(&mut release, &filter, vec!["external_webhook".to_string()]);
                    return;
                }
            }
        }

        if filter.delay > 0 {
            debug!(filter = %filter.name, delay = filter.delay, "delaying release");
            sleep(Duration::from_secs(filter.delay)).await;
        }

        let approved = ApprovedRelease {
            release: release.clone(),
            filter: filter.clone(),
        };
        match self.dispatcher.submit(approved).await {
            Ok(result) => match result.status {
                PushStatus::Pending | PushStatus::PushApproved => {
                    info!(
                        indexer = %release.indexer,
                        torrent = %release.torrent_name,
                        filter = %filter.name,
                        "release pushed"
                    );
                    let _ = self.events.send(NotificationEvent::PushApproved {
                        indexer: release.indexer.clone(),
                        torrent_name: release.torrent_name.clone(),
                        filter: filter.name.clone(),
                    });
                }
                PushStatus::PushRejected => {
                    let _ = self.events.send(NotificationEvent::PushRejected {
                        indexer: release.indexer.clone(),
                        torrent_name: release.torrent_name.clone(),
                        filter: filter.name.clone(),
                        rejections: vec![result.message],
                    });
                }
                PushStatus::PushError => {
                    let _ = self.events.send(NotificationEvent::PushError {
                        indexer: release.indexer.clone(),
                        torrent_name: release.torrent_name.clone(),
                        message: result.message,
                    });
                }
            },
            Err(err) => {
                warn!(torrent = %release.torrent_name, %err, "dispatch failed");
                let _ = self.events.send(NotificationEvent::PushError {
                    indexer: release.indexer.clone(),
                    torrent_name: release.torrent_name.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    async fn probe_size(&self, probe: &dyn SizeProbe, release: &Release) -> anyhow::Result<u64> {
        let mut delay = Duration::from_secs(2);
        let mut attempt = 1;
        loop {
            match probe.torrent_size(release).await {
                Ok(size) => return Ok(size),
                Err(err) if attempt < TORRENT_FETCH_ATTEMPTS => {
                    warn!(attempt, %err, "torrent size fetch failed, retrying");
                    sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn reject(&self, release: &mut Release, filter: &Filter, reasons: Vec<String>) {
        info!(
            indexer = %release.indexer,
            torrent = %release.torrent_name,
            filter = %filter.name,
            rejections = ?reasons,
            "release rejected"
        );
        release.reject(reasons.clone());
        let _ = self.events.send(NotificationEvent::PushRejected {
            indexer: release.indexer.clone(),
            torrent_name: release.torrent_name.clone(),
            filter: filter.name.clone(),
            rejections: reasons,
        });
    }
}

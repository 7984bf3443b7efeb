//! Interfaces to the collaborators the core depends on.
//!
//! The status store, action dispatcher and torrent size probe live outside
//! the announce pipeline; the traits here are their full contract. The
//! in-memory implementations back the standalone daemon and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::info;

use crate::models::{Filter, FilterDownloads, Release};

/// Outcome reported by the action dispatcher for one submitted release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushStatus {
    Pending,
    PushApproved,
    PushRejected,
    PushError,
}

#[derive(Debug, Clone)]
pub struct PushResult {
    pub status: PushStatus,
    pub message: String,
}

/// A release that cleared every gate, paired with the filter that won.
#[derive(Debug, Clone)]
pub struct ApprovedRelease {
    pub release: Release,
    pub filter: Filter,
}

/// Status store contract consumed by the pipeline.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_filters_by_indexer(&self, indexer: &str) -> anyhow::Result<Vec<Filter>>;
    async fn download_counts(&self, filter_id: i32) -> anyhow::Result<FilterDownloads>;
    async fn record_approved(&self, release: &Release, filter_id: i32) -> anyhow::Result<()>;
    async fn known_episode(
        &self,
        indexer: &str,
        show: &str,
        season: i32,
        episode: i32,
    ) -> anyhow::Result<bool>;
}

/// Hands approved releases to the download-client side of the house.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn submit(&self, approved: ApprovedRelease) -> anyhow::Result<PushResult>;
}

/// Fetches the real torrent size when the announce did not carry one.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn torrent_size(&self, release: &Release) -> anyhow::Result<u64>;
}

struct ApprovedEntry {
    filter_id: i32,
    timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    filters: Vec<(Vec<String>, Filter)>,
    approved: Vec<ApprovedEntry>,
    episodes: HashSet<(String, String, i32, i32)>,
}

/// Status store kept in memory. Filters come from configuration, approvals
/// and seen episodes accumulate for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    /// `filters` pairs each filter with the indexer identifiers it applies
    /// to; an empty list means every indexer.
    #[must_use]
    pub fn with_filters(filters: Vec<(Vec<String>, Filter)>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                filters,
                ..MemoryState::default()
            }),
        }
    }
}

fn window_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let hour = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let day = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now);
    let week = day - ChronoDuration::days(i64::from(now.weekday().num_days_from_monday()));
    let month = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    (hour, day, week, month)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_filters_by_indexer(&self, indexer: &str) -> anyhow::Result<Vec<Filter>> {
        let state = self.state.lock().expect("repository poisoned");
        Ok(state
            .filters
            .iter()
            .filter(|(indexers, filter)| {
                filter.enabled
                    && (indexers.is_empty() || indexers.iter().any(|i| i == indexer))
            })
            .map(|(_, filter)| filter.clone())
            .collect())
    }

    async fn download_counts(&self, filter_id: i32) -> anyhow::Result<FilterDownloads> {
        let state = self.state.lock().expect("repository poisoned");
        let (hour, day, week, month) = window_starts(Utc::now());

        let mut counts = FilterDownloads::default();
        for entry in state.approved.iter().filter(|e| e.filter_id == filter_id) {
            counts.total_count += 1;
            if entry.timestamp >= hour {
                counts.hour_count += 1;
            }
            if entry.timestamp >= day {
                counts.day_count += 1;
            }
            if entry.timestamp >= week {
                counts.week_count += 1;
            }
            if entry.timestamp >= month {
                counts.month_count += 1;
            }
        }
        Ok(counts)
    }

    async fn record_approved(&self, release: &Release, filter_id: i32) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("repository poisoned");
        state.approved.push(ApprovedEntry {
            filter_id,
            timestamp: Utc::now(),
        });
        state.episodes.insert((
            release.indexer.clone(),
            release.title.to_lowercase(),
            release.season,
            release.episode,
        ));
        Ok(())
    }

    async fn known_episode(
        &self,
        indexer: &str,
        show: &str,
        season: i32,
        episode: i32,
    ) -> anyhow::Result<bool> {
        let state = self.state.lock().expect("repository poisoned");
        Ok(state.episodes.contains(&(
            indexer.to_string(),
            show.to_lowercase(),
            season,
            episode,
        )))
    }
}

/// Dispatcher that only logs; stands in when no download client is wired up.
#[derive(Default)]
pub struct LogDispatcher;

#[async_trait]
impl ActionDispatcher for LogDispatcher {
    async fn submit(&self, approved: ApprovedRelease) -> anyhow::Result<PushResult> {
        info!(
            indexer = %approved.release.indexer,
            torrent = %approved.release.torrent_name,
            filter = %approved.filter.name,
            "would push release to download client"
        );
        Ok(PushResult {
            status: PushStatus::PushApproved,
            message: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_scope_to_indexer() {
        let f = |id: i32| Filter {
            id,
            enabled: true,
            ..Filter::default()
        };
        let repo = InMemoryRepository::with_filters(vec![
            (vec!["polarbytes".to_string()], f(1)),
            (vec![], f(2)),
            (vec!["audiohaven".to_string()], f(3)),
        ]);

        let filters = repo.list_filters_by_indexer("polarbytes").await.unwrap();
        let ids: Vec<i32> = filters.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn download_counts_accumulate() {
        let repo = InMemoryRepository::default();
        let release = Release::new("mock");

        repo.record_approved(&release, 7).await.unwrap();
        repo.record_approved(&release, 7).await.unwrap();
        repo.record_approved(&release, 8).await.unwrap();

        let counts = repo.download_counts(7).await.unwrap();
        assert_eq!(counts.total_count, 2);
        assert_eq!(counts.hour_count, 2);
    }

    #[tokio::test]
    async fn known_episode_tracks_grabs() {
        let repo = InMemoryRepository::default();
        let mut release = Release::new("mock");
        release.title = "Servant".to_string();
        release.season = 1;
        release.episode = 2;

        assert!(!repo.known_episode("mock", "Servant", 1, 2).await.unwrap());
        repo.record_approved(&release, 1).await.unwrap();
        assert!(repo.known_episode("mock", "servant", 1, 2).await.unwrap());
        assert!(!repo.known_episode("mock", "Servant", 1, 3).await.unwrap());
    }
}

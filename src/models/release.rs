use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a release has made it through the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterStatus {
    #[default]
    Pending,
    Filtered,
    FilterApproved,
    FilterRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Torrent,
    Usenet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Implementation {
    #[default]
    Irc,
    Rss,
    Torznab,
    Newznab,
}

/// A parsed, structured view of one announce line.
///
/// Created by the pipeline when an announce arrives, filled in by the
/// capture mapper and the name/tags parsers, then handed to the action
/// dispatcher on approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub filter_status: FilterStatus,
    pub rejections: Vec<String>,
    pub indexer: String,
    pub filter_name: String,
    pub filter_id: i32,
    pub protocol: Protocol,
    pub implementation: Implementation,
    pub timestamp: DateTime<Utc>,

    pub group_id: String,
    pub torrent_id: String,
    pub torrent_url: String,
    pub info_url: String,
    pub torrent_hash: String,
    pub torrent_name: String,

    pub size: u64,
    pub title: String,
    pub category: String,
    pub categories: Vec<String>,
    pub season: i32,
    pub episode: i32,
    pub year: i32,
    pub resolution: String,
    pub source: String,
    pub codec: Vec<String>,
    pub container: String,
    pub hdr: Vec<String>,
    pub audio: Vec<String>,
    pub audio_channels: String,
    pub group: String,
    pub region: String,
    pub language: Vec<String>,
    pub proper: bool,
    pub repack: bool,
    pub website: String,
    pub other: Vec<String>,

    pub artists: String,
    pub release_type: String,
    pub log_score: i32,
    pub has_log: bool,
    pub has_cue: bool,

    pub origin: String,
    pub tags: Vec<String>,
    pub release_tags: String,
    pub freeleech: bool,
    pub freeleech_percent: i32,
    pub bonus: Vec<String>,
    pub uploader: String,

    pub additional_size_check_required: bool,
}

impl Release {
    #[must_use]
    pub fn new(indexer: &str) -> Self {
        Self {
            id: 0,
            filter_status: FilterStatus::Pending,
            rejections: Vec::new(),
            indexer: indexer.to_string(),
            filter_name: String::new(),
            filter_id: 0,
            protocol: Protocol::Torrent,
            implementation: Implementation::Irc,
            timestamp: Utc::now(),
            group_id: String::new(),
            torrent_id: String::new(),
            torrent_url: String::new(),
            info_url: String::new(),
            torrent_hash: String::new(),
            torrent_name: String::new(),
            size: 0,
            title: String::new(),
            category: String::new(),
            categories: Vec::new(),
            season: 0,
            episode: 0,
            year: 0,
            resolution: String::new(),
            source: String::new(),
            codec: Vec::new(),
            container: String::new(),
            hdr: Vec::new(),
            audio: Vec::new(),
            audio_channels: String::new(),
            group: String::new(),
            region: String::new(),
            language: Vec::new(),
            proper: false,
            repack: false,
            website: String::new(),
            other: Vec::new(),
            artists: String::new(),
            release_type: String::new(),
            log_score: 0,
            has_log: false,
            has_cue: false,
            origin: String::new(),
            tags: Vec::new(),
            release_tags: String::new(),
            freeleech: false,
            freeleech_percent: 0,
            bonus: Vec::new(),
            uploader: String::new(),
            additional_size_check_required: false,
        }
    }

    /// Marks the release rejected, keeping the ordered reason list.
    pub fn reject(&mut self, rejections: Vec<String>) {
        self.filter_status = FilterStatus::FilterRejected;
        self.rejections = rejections;
    }

    pub fn approve(&mut self, filter_id: i32, filter_name: &str) {
        self.filter_status = FilterStatus::FilterApproved;
        self.filter_id = filter_id;
        self.filter_name = filter_name.to_string();
        self.rejections.clear();
    }

    /// Appends a bonus token unless it is already present.
    pub fn add_bonus(&mut self, bonus: &str) {
        if !self.bonus.iter().any(|b| b == bonus) {
            self.bonus.push(bonus.to_string());
        }
    }
}

impl Default for Release {
    fn default() -> Self {
        Self::new("")
    }
}

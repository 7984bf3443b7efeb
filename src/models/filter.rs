use serde::{Deserialize, Serialize};

/// Rolling window for the per-filter download cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaxDownloadsUnit {
    Hour,
    Day,
    Week,
    Month,
    Ever,
}

/// How a tag list predicate combines its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagsMatchLogic {
    #[default]
    Any,
    All,
}

/// Download counts per window for one filter, as reported by the status
/// store. Counts cover PENDING and PUSH_APPROVED pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDownloads {
    pub hour_count: u32,
    pub day_count: u32,
    pub week_count: u32,
    pub month_count: u32,
    pub total_count: u32,
}

impl FilterDownloads {
    #[must_use]
    pub const fn in_window(&self, unit: MaxDownloadsUnit) -> u32 {
        match unit {
            MaxDownloadsUnit::Hour => self.hour_count,
            MaxDownloadsUnit::Day => self.day_count,
            MaxDownloadsUnit::Week => self.week_count,
            MaxDownloadsUnit::Month => self.month_count,
            MaxDownloadsUnit::Ever => self.total_count,
        }
    }
}

/// A user-defined matcher evaluated against every parsed release.
///
/// Text list fields (`match_releases`, `shows`, uploader/category lists…)
/// hold comma or newline separated tokens; the engine compiles them on load.
/// Tri-state booleans use `Option`: `None` means the predicate is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub id: i32,
    pub name: String,
    pub enabled: bool,
    pub priority: i32,

    pub min_size: String,
    pub max_size: String,
    pub delay: u64,
    pub max_downloads: i32,
    pub max_downloads_unit: Option<MaxDownloadsUnit>,

    pub match_releases: String,
    pub except_releases: String,
    pub use_regex: bool,
    pub match_release_groups: String,
    pub except_release_groups: String,
    pub match_release_tags: String,
    pub except_release_tags: String,
    pub use_regex_release_tags: bool,

    pub scene: Option<bool>,
    pub freeleech: Option<bool>,
    pub freeleech_percent: String,
    pub smart_episode: bool,

    pub shows: String,
    pub seasons: String,
    pub episodes: String,
    pub years: String,

    pub resolutions: Vec<String>,
    pub codecs: Vec<String>,
    pub sources: Vec<String>,
    pub containers: Vec<String>,
    pub match_hdr: Vec<String>,
    pub except_hdr: Vec<String>,
    pub match_other: Vec<String>,
    pub except_other: Vec<String>,
    pub match_release_types: Vec<String>,
    pub formats: Vec<String>,
    pub quality: Vec<String>,
    pub media: Vec<String>,
    pub match_language: Vec<String>,
    pub except_language: Vec<String>,
    pub origins: Vec<String>,
    pub except_origins: Vec<String>,

    pub artists: String,
    pub albums: String,
    pub log_score: Option<i32>,
    pub has_log: Option<bool>,
    pub has_cue: Option<bool>,
    pub perfect_flac: Option<bool>,

    pub match_categories: String,
    pub except_categories: String,
    pub match_uploaders: String,
    pub except_uploaders: String,

    pub tags: String,
    pub except_tags: String,
    pub tags_match_logic: TagsMatchLogic,
    pub except_tags_match_logic: TagsMatchLogic,

    pub external_script_enabled: bool,
    pub external_script_cmd: String,
    pub external_script_args: String,
    pub external_script_expect_status: i32,
    pub external_webhook_enabled: bool,
    pub external_webhook_host: String,
    pub external_webhook_data: String,
    pub external_webhook_expect_status: u16,
}

impl Filter {
    /// True when the download cap applies and could reject a release.
    #[must_use]
    pub fn has_download_cap(&self) -> bool {
        self.max_downloads > 0 && self.max_downloads_unit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloads_window_lookup() {
        let d = FilterDownloads {
            hour_count: 1,
            day_count: 2,
            week_count: 3,
            month_count: 4,
            total_count: 5,
        };
        assert_eq!(d.in_window(MaxDownloadsUnit::Hour), 1);
        assert_eq!(d.in_window(MaxDownloadsUnit::Ever), 5);
    }

    #[test]
    fn cap_requires_both_fields() {
        let mut f = Filter {
            max_downloads: 2,
            ..Filter::default()
        };
        assert!(!f.has_download_cap());
        f.max_downloads_unit = Some(MaxDownloadsUnit::Hour);
        assert!(f.has_download_cap());
    }

    #[test]
    fn default_tags_logic_is_any() {
        let f = Filter::default();
        assert_eq!(f.tags_match_logic, TagsMatchLogic::Any);
    }
}

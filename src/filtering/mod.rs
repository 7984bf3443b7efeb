//! Filter matching engine.
//!
//! Candidates are walked in descending priority (ascending id within a
//! priority). Every predicate of a filter is evaluated even after the first
//! failure so the stored rejection list names everything that did not fit;
//! the first filter with zero rejections wins.

pub mod matchers;

use crate::models::{Filter, Release, TagsMatchLogic};
use crate::parser::size::parse_size;
use matchers::{contains_any_substring, intersects, list_contains, matches_any, range_contains, tokens};
use std::fmt;

/// A single failed predicate: stable short code plus a log-friendly detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: &'static str,
    pub detail: String,
}

impl Rejection {
    fn new(code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

/// Rejections for one losing filter.
#[derive(Debug, Clone)]
pub struct FilterRejections {
    pub filter_id: i32,
    pub filter_name: String,
    pub rejections: Vec<Rejection>,
}

/// Outcome of matching one release against a candidate list.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub winner: Option<Filter>,
    /// Size bounds exist but the announce carried no size; the pipeline must
    /// enrich the release and re-check before acting.
    pub size_deferred: bool,
    pub rejected: Vec<FilterRejections>,
}

impl MatchResult {
    /// Flattens loser rejections into the release's ordered reason list.
    #[must_use]
    pub fn rejection_reasons(&self) -> Vec<String> {
        self.rejected
            .iter()
            .flat_map(|f| f.rejections.iter().map(ToString::to_string))
            .collect()
    }
}

/// Finds the highest-priority accepting filter.
///
/// `duplicate` is the smart-episode verdict for this release, supplied by
/// the pipeline from the status store.
#[must_use]
pub fn find_match(release: &Release, filters: &[Filter], duplicate: bool) -> MatchResult {
    let mut candidates: Vec<&Filter> = filters.iter().filter(|f| f.enabled).collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

    let mut result = MatchResult::default();

    for filter in candidates {
        let (rejections, size_deferred) = check_filter(release, filter, duplicate);
        if rejections.is_empty() {
            result.winner = Some(filter.clone());
            result.size_deferred = size_deferred;
            return result;
        }
        result.rejected.push(FilterRejections {
            filter_id: filter.id,
            filter_name: filter.name.clone(),
            rejections,
        });
    }

    result
}

/// Evaluates every predicate of `filter`, returning all failures and whether
/// the size predicate had to be deferred.
#[must_use]
pub fn check_filter(release: &Release, filter: &Filter, duplicate: bool) -> (Vec<Rejection>, bool) {
    let mut rejections = Vec::new();
    let mut reject = |code: &'static str, detail: String| {
        rejections.push(Rejection::new(code, detail));
    };

    // size
    let min_size = parse_size(&filter.min_size, None);
    let max_size = parse_size(&filter.max_size, None);
    let mut size_deferred = false;
    if min_size.is_some() || max_size.is_some() {
        if release.size == 0 {
            size_deferred = true;
        } else {
            if let Some(min) = min_size
                && release.size < min
            {
                reject("size", format!("got {} want min {}", release.size, min));
            }
            if let Some(max) = max_size
                && release.size > max
            {
                reject("size", format!("got {} want max {}", release.size, max));
            }
        }
    }

    // text predicates against the raw name
    if !filter.match_releases.is_empty()
        && !matches_any(&filter.match_releases, &release.torrent_name, filter.use_regex)
    {
        reject("match_releases", release.torrent_name.clone());
    }
    if !filter.except_releases.is_empty()
        && matches_any(&filter.except_releases, &release.torrent_name, filter.use_regex)
    {
        reject("except_releases", release.torrent_name.clone());
    }

    if !filter.match_release_groups.is_empty()
        && !matches_any(&filter.match_release_groups, &release.group, filter.use_regex)
    {
        reject("match_release_groups", release.group.clone());
    }
    if !filter.except_release_groups.is_empty()
        && matches_any(&filter.except_release_groups, &release.group, filter.use_regex)
    {
        reject("except_release_groups", release.group.clone());
    }

    if !filter.match_release_tags.is_empty()
        && !matches_any(
            &filter.match_release_tags,
            &release.release_tags,
            filter.use_regex_release_tags,
        )
    {
        reject("match_release_tags", release.release_tags.clone());
    }
    if !filter.except_release_tags.is_empty()
        && matches_any(
            &filter.except_release_tags,
            &release.release_tags,
            filter.use_regex_release_tags,
        )
    {
        reject("except_release_tags", release.release_tags.clone());
    }

    // tri-state booleans
    if let Some(scene) = filter.scene
        && release.origin.eq_ignore_ascii_case("SCENE") != scene
    {
        reject("scene", release.origin.clone());
    }
    if let Some(freeleech) = filter.freeleech
        && release.freeleech != freeleech
    {
        reject("freeleech", release.freeleech.to_string());
    }
    if !filter.freeleech_percent.is_empty()
        && release.freeleech_percent > 0
        && !range_contains(&filter.freeleech_percent, release.freeleech_percent)
    {
        reject("freeleech_percent", release.freeleech_percent.to_string());
    }

    if filter.smart_episode && duplicate {
        reject(
            "duplicate",
            format!(
                "{} S{:02}E{:02} already grabbed",
                release.title, release.season, release.episode
            ),
        );
    }

    // scope
    if !filter.shows.is_empty() && !contains_any_substring(&filter.shows, &release.title) {
        reject("shows", release.title.clone());
    }
    if !filter.seasons.is_empty() && !range_contains(&filter.seasons, release.season) {
        reject("seasons", release.season.to_string());
    }
    if !filter.episodes.is_empty() && !range_contains(&filter.episodes, release.episode) {
        reject("episodes", release.episode.to_string());
    }
    if !filter.years.is_empty() && !range_contains(&filter.years, release.year) {
        reject("years", release.year.to_string());
    }

    // enumerated sets
    if !filter.resolutions.is_empty() && !list_contains(&filter.resolutions, &release.resolution) {
        reject("resolution", release.resolution.clone());
    }
    if !filter.codecs.is_empty() && !intersects(&filter.codecs, &release.codec) {
        reject("codec", release.codec.join(","));
    }
    if !filter.sources.is_empty() && !list_contains(&filter.sources, &release.source) {
        reject("source", release.source.clone());
    }
    if !filter.containers.is_empty() && !list_contains(&filter.containers, &release.container) {
        reject("container", release.container.clone());
    }
    if !filter.match_hdr.is_empty() && !intersects(&filter.match_hdr, &release.hdr) {
        reject("hdr", release.hdr.join(","));
    }
    if !filter.except_hdr.is_empty() && intersects(&filter.except_hdr, &release.hdr) {
        reject("except_hdr", release.hdr.join(","));
    }
    if !filter.match_other.is_empty() && !intersects(&filter.match_other, &release.other) {
        reject("other", release.other.join(","));
    }
    if !filter.except_other.is_empty() && intersects(&filter.except_other, &release.other) {
        reject("except_other", release.other.join(","));
    }
    if !filter.match_release_types.is_empty()
        && !list_contains(&filter.match_release_types, &release.release_type)
    {
        reject("release_types", release.release_type.clone());
    }
    if !filter.formats.is_empty() && !intersects(&filter.formats, &release.audio) {
        reject("formats", release.audio.join(","));
    }
    if !filter.quality.is_empty() && !intersects(&filter.quality, &release.audio) {
        reject("quality", release.audio.join(","));
    }
    if !filter.media.is_empty() && !list_contains(&filter.media, &release.source) {
        reject("media", release.source.clone());
    }
    if !filter.match_language.is_empty() && !intersects(&filter.match_language, &release.language) {
        reject("language", release.language.join(","));
    }
    if !filter.except_language.is_empty() && intersects(&filter.except_language, &release.language)
    {
        reject("except_language", release.language.join(","));
    }
    if !filter.origins.is_empty() && !list_contains(&filter.origins, &release.origin) {
        reject("origin", release.origin.clone());
    }
    if !filter.except_origins.is_empty() && list_contains(&filter.except_origins, &release.origin) {
        reject("except_origins", release.origin.clone());
    }

    // music
    if !filter.artists.is_empty() {
        let artist = if release.artists.is_empty() {
            &release.title
        } else {
            &release.artists
        };
        if !matches_any(&filter.artists, artist, false) {
            reject("artists", artist.clone());
        }
    }
    if !filter.albums.is_empty() {
        let album = if release.group.is_empty() {
            &release.torrent_name
        } else {
            &release.group
        };
        if !matches_any(&filter.albums, album, false) {
            reject("albums", album.clone());
        }
    }
    if let Some(min_score) = filter.log_score
        && release.log_score < min_score
    {
        reject("log_score", release.log_score.to_string());
    }
    if let Some(log) = filter.has_log
        && release.has_log != log
    {
        reject("log", release.has_log.to_string());
    }
    if let Some(cue) = filter.has_cue
        && release.has_cue != cue
    {
        reject("cue", release.has_cue.to_string());
    }
    if let Some(perfect) = filter.perfect_flac {
        let lossless = list_contains(&release.audio, "Lossless")
            || list_contains(&release.audio, "24BIT Lossless");
        let is_perfect = list_contains(&release.audio, "FLAC")
            && lossless
            && release.has_log
            && release.has_cue
            && release.log_score == 100;
        if is_perfect != perfect {
            reject("perfect_flac", is_perfect.to_string());
        }
    }

    // categories and uploaders
    if !filter.match_categories.is_empty() {
        let hit = matches_any(&filter.match_categories, &release.category, false)
            || release
                .categories
                .iter()
                .any(|c| matches_any(&filter.match_categories, c, false));
        if !hit {
            reject("match_categories", release.category.clone());
        }
    }
    if !filter.except_categories.is_empty()
        && matches_any(&filter.except_categories, &release.category, false)
    {
        reject("except_categories", release.category.clone());
    }
    if !filter.match_uploaders.is_empty()
        && !matches_any(&filter.match_uploaders, &release.uploader, false)
    {
        reject("uploaders", release.uploader.clone());
    }
    if !filter.except_uploaders.is_empty()
        && matches_any(&filter.except_uploaders, &release.uploader, false)
    {
        reject("except_uploaders", release.uploader.clone());
    }

    // tags
    if !filter.tags.is_empty()
        && !tag_logic_matches(&filter.tags, filter.tags_match_logic, &release.tags)
    {
        reject("tags", release.tags.join(","));
    }
    if !filter.except_tags.is_empty()
        && tag_logic_matches(&filter.except_tags, filter.except_tags_match_logic, &release.tags)
    {
        reject("except_tags", release.tags.join(","));
    }

    (rejections, size_deferred)
}

fn tag_logic_matches(filter_tags: &str, logic: TagsMatchLogic, release_tags: &[String]) -> bool {
    let wanted = tokens(filter_tags);
    if wanted.is_empty() {
        return false;
    }
    match logic {
        TagsMatchLogic::Any => wanted.iter().any(|t| list_contains(release_tags, t)),
        TagsMatchLogic::All => wanted.iter().all(|t| list_contains(release_tags, t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_2160p() -> Release {
        let mut r = Release::new("mock");
        crate::parser::name::parse_into(
            &mut r,
            "Servant S01 2160p ATVP WEB-DL DDP 5.1 Atmos DV HEVC-FLUX",
        );
        r
    }

    fn filter(id: i32, name: &str, priority: i32) -> Filter {
        Filter {
            id,
            name: name.to_string(),
            enabled: true,
            priority,
            ..Filter::default()
        }
    }

    #[test]
    fn priority_order_picks_highest_accepting() {
        let release = release_2160p();

        let mut f1 = filter(1, "hd", 10);
        f1.resolutions = vec!["1080p".to_string()];
        let mut f2 = filter(2, "uhd", 5);
        f2.resolutions = vec!["2160p".to_string()];

        let result = find_match(&release, &[f1, f2], false);
        assert_eq!(result.winner.as_ref().map(|f| f.id), Some(2));
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].filter_id, 1);
        assert_eq!(result.rejection_reasons(), vec!["resolution"]);
    }

    #[test]
    fn equal_priority_breaks_ties_by_id() {
        let release = release_2160p();
        let f1 = filter(7, "b", 5);
        let f2 = filter(3, "a", 5);
        let result = find_match(&release, &[f1, f2], false);
        assert_eq!(result.winner.as_ref().map(|f| f.id), Some(3));
    }

    #[test]
    fn all_failing_predicates_are_collected() {
        let release = release_2160p();
        let mut f = filter(1, "strict", 0);
        f.resolutions = vec!["1080p".to_string()];
        f.sources = vec!["BluRay".to_string()];
        f.except_release_groups = "FLUX".to_string();

        let (rejections, _) = check_filter(&release, &f, false);
        let codes: Vec<&str> = rejections.iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["except_release_groups", "resolution", "source"]);
    }

    #[test]
    fn size_defers_when_announce_has_no_size() {
        let release = release_2160p();
        let mut f = filter(1, "sized", 0);
        f.min_size = "5GB".to_string();

        let (rejections, deferred) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());
        assert!(deferred);
    }

    #[test]
    fn size_bounds_enforced_when_present() {
        let mut release = release_2160p();
        release.size = 1_000_000_000;
        let mut f = filter(1, "sized", 0);
        f.min_size = "5GB".to_string();

        let (rejections, deferred) = check_filter(&release, &f, false);
        assert!(!deferred);
        assert_eq!(rejections[0].code, "size");
    }

    #[test]
    fn match_release_groups_glob() {
        let release = release_2160p();
        let mut f = filter(1, "groups", 0);
        f.match_release_groups = "FLUX, NOSiViD".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());

        f.match_release_groups = "NOSiViD".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "match_release_groups");
    }

    #[test]
    fn except_releases_regex() {
        let release = release_2160p();
        let mut f = filter(1, "no-atmos", 0);
        f.use_regex = true;
        f.except_releases = r"Atmos.*HEVC".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "except_releases");
    }

    #[test]
    fn hdr_predicates() {
        let release = release_2160p();

        let mut f = filter(1, "dv", 0);
        f.match_hdr = vec!["DV".to_string()];
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());

        let mut f = filter(2, "no-dv", 0);
        f.except_hdr = vec!["DV".to_string(), "HDR10+".to_string()];
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "except_hdr");
    }

    #[test]
    fn year_range_expression() {
        let mut release = release_2160p();
        release.year = 2023;
        let mut f = filter(1, "years", 0);
        f.years = "2018-2022, 2024".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "years");

        release.year = 2024;
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());
    }

    #[test]
    fn tags_any_and_all_logic() {
        let mut release = release_2160p();
        release.tags = vec!["comedy".to_string(), "fantasy".to_string()];

        let mut f = filter(1, "tags", 0);
        f.tags = "fantasy, horror".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty(), "ANY logic needs one hit");

        f.tags_match_logic = TagsMatchLogic::All;
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "tags");

        f.tags = "fantasy, comedy".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty(), "ALL logic satisfied");
    }

    #[test]
    fn except_tags_rejects_on_hit() {
        let mut release = release_2160p();
        release.tags = vec!["anime".to_string()];
        let mut f = filter(1, "no-anime", 0);
        f.except_tags = "anime".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "except_tags");
    }

    #[test]
    fn tri_state_booleans_ignored_when_unset() {
        let release = release_2160p();
        let f = filter(1, "open", 0);
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());
    }

    #[test]
    fn freeleech_tri_state() {
        let release = release_2160p();
        let mut f = filter(1, "fl-only", 0);
        f.freeleech = Some(true);
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "freeleech");
    }

    #[test]
    fn freeleech_percent_applies_only_when_positive() {
        let mut release = release_2160p();
        let mut f = filter(1, "fl-range", 0);
        f.freeleech_percent = "50-100".to_string();

        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty(), "percent 0 skips the range check");

        release.freeleech_percent = 25;
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "freeleech_percent");

        release.freeleech_percent = 75;
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());
    }

    #[test]
    fn smart_episode_duplicate() {
        let release = release_2160p();
        let mut f = filter(1, "smart", 0);
        f.smart_episode = true;

        let (rejections, _) = check_filter(&release, &f, true);
        assert_eq!(rejections[0].code, "duplicate");

        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());
    }

    #[test]
    fn shows_title_list() {
        let release = release_2160p();
        let mut f = filter(1, "shows", 0);
        f.shows = "servant, severance".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());

        f.shows = "severance".to_string();
        let (rejections, _) = check_filter(&release, &f, false);
        assert_eq!(rejections[0].code, "shows");
    }

    #[test]
    fn music_perfect_flac() {
        let mut release = Release::new("mock");
        crate::parser::name::parse_into(&mut release, "Artist - Albumname");
        crate::parser::tags::parse_release_tags_into(
            &mut release,
            "FLAC / Lossless / Log / 100% / Cue / CD",
        );

        let mut f = filter(1, "perfect", 0);
        f.perfect_flac = Some(true);
        let (rejections, _) = check_filter(&release, &f, false);
        assert!(rejections.is_empty());

        let mut imperfect = Release::new("mock");
        crate::parser::name::parse_into(&mut imperfect, "Artist - Albumname");
        crate::parser::tags::parse_release_tags_into(&mut imperfect, "FLAC / Lossless / CD");
        let (rejections, _) = check_filter(&imperfect, &f, false);
        assert_eq!(rejections[0].code, "perfect_flac");
    }

    #[test]
    fn disabled_filters_are_skipped() {
        let release = release_2160p();
        let mut f = filter(1, "off", 10);
        f.enabled = false;
        let result = find_match(&release, &[f], false);
        assert!(result.winner.is_none());
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn rejection_list_is_stable() {
        let release = release_2160p();
        let mut f = filter(1, "strict", 0);
        f.resolutions = vec!["1080p".to_string()];
        f.sources = vec!["BluRay".to_string()];

        let (first, _) = check_filter(&release, &f, false);
        let (second, _) = check_filter(&release, &f, false);
        assert_eq!(first, second);
    }
}

//! Folds announce-captured variables into a release.
//!
//! Capture maps are string→string; this module owns every conversion into
//! the typed release fields, keyed by the variable names used in indexer
//! definitions.

use crate::models::Release;
use crate::parser::size::parse_size;
use std::collections::HashMap;

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "free" | "freeleech" | "freeleech!" | "vip"
    )
}

fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Applies the captured variable map to `release`.
///
/// `force_size_unit` comes from the indexer definition and only applies to
/// unit-less size captures. Unknown variables are ignored.
pub fn map_vars(
    release: &mut Release,
    vars: &HashMap<String, String>,
    force_size_unit: Option<&str>,
) {
    let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(name) = get("torrentName") {
        release.torrent_name = name.to_string();
    }
    if let Some(title) = get("title") {
        release.title = title.to_string();
    }
    if let Some(category) = get("category") {
        release.category = category.to_string();
    }
    if let Some(year) = get("year") {
        release.year = year.parse().unwrap_or(0);
    }
    if let Some(season) = get("season") {
        release.season = season.parse().unwrap_or(0);
    }
    if let Some(episode) = get("episode") {
        release.episode = episode.parse().unwrap_or(0);
    }

    if let Some(freeleech) = get("freeleech")
        && truthy(freeleech)
    {
        release.freeleech = true;
        release.freeleech_percent = 100;
        release.add_bonus("Freeleech");
    }

    if let Some(percent) = get("freeleechPercent")
        && let Ok(percent) = percent.trim_end_matches('%').parse::<i32>()
        && (0..=100).contains(&percent)
        && percent > 0
    {
        release.freeleech = true;
        release.freeleech_percent = percent;
        release.add_bonus("Freeleech");
        if matches!(percent, 25 | 50 | 75 | 100) {
            release.add_bonus(&format!("Freeleech{percent}"));
        }
    }

    if let Some(uploader) = get("uploader") {
        release.uploader = uploader.to_string();
    }

    if let Some(size) = get("torrentSize") {
        release.size = parse_size(size, force_size_unit).unwrap_or(0);
    }
    if let Some(bytes) = get("torrentSizeBytes") {
        release.size = bytes.parse().unwrap_or(0);
    }

    if let Some(tags) = get("tags") {
        release.tags = split_tags(tags);
    }

    if let Some(group) = get("releaseGroup") {
        release.group = group.to_string();
    }
    if let Some(tags) = get("releaseTags") {
        release.release_tags = tags.to_string();
    }
    if let Some(release_type) = get("releaseType") {
        release.release_type = release_type.to_string();
    }

    if let Some(scene) = get("scene")
        && truthy(scene)
    {
        release.origin = "SCENE".to_string();
    }
    if let Some(internal) = get("internal")
        && truthy(internal)
    {
        release.origin = "INTERNAL".to_string();
    }
    if let Some(origin) = get("origin") {
        release.origin = origin.to_string();
    }

    if let Some(id) = get("torrentId") {
        release.torrent_id = id.to_string();
    }
    if let Some(id) = get("groupId") {
        release.group_id = id.to_string();
    }
    if let Some(hash) = get("torrentHash") {
        release.torrent_hash = hash.to_string();
    }
    if let Some(score) = get("logScore") {
        release.log_score = score.parse().unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_name_only() {
        let mut r = Release::new("mock");
        map_vars(
            &mut r,
            &vars(&[(
                "torrentName",
                "Good show S02 2160p ATVP WEB-DL DDP 5.1 Atmos DV HEVC-GROUP2",
            )]),
            None,
        );
        assert_eq!(
            r.torrent_name,
            "Good show S02 2160p ATVP WEB-DL DDP 5.1 Atmos DV HEVC-GROUP2"
        );
    }

    #[test]
    fn maps_freeleech_flag() {
        let mut r = Release::new("mock");
        map_vars(
            &mut r,
            &vars(&[
                ("torrentName", "Good show S02"),
                ("category", "tv"),
                ("freeleech", "freeleech"),
                ("uploader", "Anon"),
                ("torrentSize", "10GB"),
            ]),
            None,
        );
        assert_eq!(r.category, "tv");
        assert!(r.freeleech);
        assert_eq!(r.freeleech_percent, 100);
        assert_eq!(r.bonus, vec!["Freeleech"]);
        assert_eq!(r.uploader, "Anon");
        assert_eq!(r.size, 10_000_000_000);
    }

    #[test]
    fn maps_freeleech_percent_100() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("freeleechPercent", "100%")]), None);
        assert!(r.freeleech);
        assert_eq!(r.freeleech_percent, 100);
        assert_eq!(r.bonus, vec!["Freeleech", "Freeleech100"]);
    }

    #[test]
    fn maps_freeleech_percent_50() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("freeleechPercent", "50%")]), None);
        assert_eq!(r.freeleech_percent, 50);
        assert_eq!(r.bonus, vec!["Freeleech", "Freeleech50"]);
    }

    #[test]
    fn maps_freeleech_percent_25() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("freeleechPercent", "25%")]), None);
        assert_eq!(r.freeleech_percent, 25);
        assert_eq!(r.bonus, vec!["Freeleech", "Freeleech25"]);
    }

    #[test]
    fn maps_tags_with_whitespace() {
        let mut r = Release::new("mock");
        map_vars(
            &mut r,
            &vars(&[("tags", "hip.hop,rhythm.and.blues, 2000s")]),
            None,
        );
        assert_eq!(r.tags, vec!["hip.hop", "rhythm.and.blues", "2000s"]);
    }

    #[test]
    fn maps_size_with_forced_unit() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("torrentSize", "10000")]), Some("MB"));
        assert_eq!(r.size, 10_000_000_000);
    }

    #[test]
    fn maps_group_year_uploader() {
        let mut r = Release::new("mock");
        map_vars(
            &mut r,
            &vars(&[
                ("torrentName", "Greatest Anime Ever"),
                ("year", "2022"),
                ("releaseGroup", "GROUP1"),
                ("tags", "comedy, fantasy, school.life, shounen, slice.of.life"),
                ("uploader", "Tester"),
            ]),
            None,
        );
        assert_eq!(r.year, 2022);
        assert_eq!(r.group, "GROUP1");
        assert_eq!(
            r.tags,
            vec!["comedy", "fantasy", "school.life", "shounen", "slice.of.life"]
        );
        assert_eq!(r.uploader, "Tester");
    }

    #[test]
    fn maps_vip_freeleech_label() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("freeleech", "VIP")]), None);
        assert!(r.freeleech);
        assert_eq!(r.freeleech_percent, 100);
        assert_eq!(r.bonus, vec!["Freeleech"]);
    }

    #[test]
    fn maps_origin_vars() {
        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("internal", "1")]), None);
        assert_eq!(r.origin, "INTERNAL");

        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("scene", "true")]), None);
        assert_eq!(r.origin, "SCENE");

        let mut r = Release::new("mock");
        map_vars(&mut r, &vars(&[("origin", "P2P")]), None);
        assert_eq!(r.origin, "P2P");
    }
}

//! Release tags parsing.
//!
//! Trackers append a short metadata tail to announces, e.g.
//! `MP4 | 2160p | WEB-DL | Freeleech!` or `FLAC / Lossless / Log / 100% / Cue
//! / CD`. Tokens are separated by pipes or slashes. Audio tokens are emitted
//! in the fixed table order below, not input order.

use crate::models::Release;
use crate::parser::{get_regex, split_any};
use regex::Regex;
use std::sync::OnceLock;

const CONTAINERS: &[&str] = &["mkv", "mp4", "avi", "ts", "iso", "m2ts", "vob"];

const MEDIA: &[&str] = &[
    "CD",
    "WEB",
    "Vinyl",
    "Cassette",
    "DVD",
    "SACD",
    "DAT",
    "Soundboard",
    "Blu-Ray",
];

fn has_token(tokens: &[String], want: &str) -> bool {
    tokens.iter().any(|t| t.eq_ignore_ascii_case(want))
}

fn log_score(tokens: &[String]) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^(\d{1,3})%$");

    if !has_token(tokens, "log") {
        return None;
    }
    tokens
        .iter()
        .find_map(|t| re.captures(t))
        .and_then(|caps| caps[1].parse().ok())
}

/// Audio table. Output order is the order of this table; each entry decides
/// its own match rule against the token list.
fn audio_tags(toks: &[String], score: Option<i32>) -> Vec<String> {
    static BIT24: OnceLock<Regex> = OnceLock::new();
    static VBR: OnceLock<Regex> = OnceLock::new();

    let bit24 = get_regex(&BIT24, r"(?i)^24[-\s]?bit lossless$");
    let vbr = get_regex(&VBR, r"(?i)^(?:V0 \(VBR\)|V\d \(VBR\)|VBR)$");

    let has_24bit_lossless = toks.iter().any(|t| bit24.is_match(t));

    let mut audio = Vec::new();
    if has_24bit_lossless {
        audio.push("24BIT Lossless".to_string());
    }
    if has_token(toks, "320") {
        audio.push("320".to_string());
    }
    if has_token(toks, "cue") {
        audio.push("Cue".to_string());
    }
    if has_token(toks, "flac") {
        audio.push("FLAC".to_string());
    }
    if has_token(toks, "lossless") && !has_24bit_lossless {
        audio.push("Lossless".to_string());
    }
    if score == Some(100) {
        audio.push("Log100".to_string());
    }
    if has_token(toks, "log") {
        audio.push("Log".to_string());
    }
    if has_token(toks, "mp3") {
        audio.push("MP3".to_string());
    }
    if toks.iter().any(|t| vbr.is_match(t)) {
        audio.push("VBR".to_string());
    }
    audio
}

/// Folds a release-tags tail into the release.
pub fn parse_release_tags_into(release: &mut Release, tags: &str) {
    static RESOLUTION: OnceLock<Regex> = OnceLock::new();
    static CHANNELS: OnceLock<Regex> = OnceLock::new();
    static FREELEECH: OnceLock<Regex> = OnceLock::new();

    let resolution_re = get_regex(&RESOLUTION, r"(?i)^\d{3,4}[pi]$");
    let channels_re = get_regex(&CHANNELS, r"^[2457]\.[0-2]$");
    let freeleech_re = get_regex(&FREELEECH, r"(?i)freeleech");

    release.release_tags = tags.to_string();
    let toks = split_any(tags, "/|");

    for tok in &toks {
        let lower = tok.to_lowercase();

        if CONTAINERS.contains(&lower.as_str()) {
            release.container = lower;
            continue;
        }

        if let Some(media) = MEDIA.iter().find(|m| m.eq_ignore_ascii_case(tok)) {
            if release.source.is_empty() {
                release.source = (*media).to_string();
            }
            continue;
        }

        if resolution_re.is_match(tok) {
            if release.resolution.is_empty() {
                release.resolution = lower;
            }
            continue;
        }

        if channels_re.is_match(tok) {
            if release.audio_channels.is_empty() {
                release.audio_channels = tok.clone();
            }
            continue;
        }

        if freeleech_re.is_match(tok) {
            release.freeleech = true;
            release.add_bonus("Freeleech");
        }
    }

    let score = log_score(&toks);
    if let Some(score) = score {
        release.log_score = score;
    }
    if has_token(&toks, "log") {
        release.has_log = true;
    }
    if has_token(&toks, "cue") {
        release.has_cue = true;
    }

    let audio = audio_tags(&toks, score);
    if !audio.is_empty() {
        release.audio = audio;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::name;

    fn parsed(torrent_name: &str, tags: &str) -> Release {
        let mut r = Release::new("mock");
        name::parse_into(&mut r, torrent_name);
        parse_release_tags_into(&mut r, tags);
        r
    }

    #[test]
    fn container_from_tags() {
        let r = parsed(
            "Servant.S01.2160p.ATVP.WEB-DL.DDP.5.1.Atmos.DV.HEVC-FLUX",
            "MKV / 2160p / WEB-DL",
        );
        assert_eq!(r.container, "mkv");
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.audio, vec!["DDP", "Atmos"]);
    }

    #[test]
    fn pipe_separated_tags() {
        let r = parsed(
            "Servant.S01.2160p.ATVP.WEB-DL.DDP.5.1.Atmos.DV.HEVC-FLUX",
            "MP4 | 2160p | WEB-DL",
        );
        assert_eq!(r.container, "mp4");
    }

    #[test]
    fn freeleech_tag_sets_flag_and_bonus() {
        let r = parsed(
            "Servant.S01.2160p.ATVP.WEB-DL.DDP.5.1.Atmos.DV.HEVC-FLUX",
            "MP4 | 2160p | WEB-DL | Freeleech!",
        );
        assert!(r.freeleech);
        assert_eq!(r.bonus, vec!["Freeleech"]);
        assert_eq!(r.container, "mp4");
    }

    #[test]
    fn music_flac_log_cue_cd() {
        let r = parsed("Artist - Albumname", "FLAC / Lossless / Log / 100% / Cue / CD");
        assert_eq!(r.title, "Artist");
        assert_eq!(r.group, "Albumname");
        assert_eq!(r.audio, vec!["Cue", "FLAC", "Lossless", "Log100", "Log"]);
        assert_eq!(r.source, "CD");
        assert_eq!(r.log_score, 100);
        assert!(r.has_log);
        assert!(r.has_cue);
    }

    #[test]
    fn music_24bit_lossless_suppresses_plain_lossless() {
        let r = parsed(
            "Artist - Albumname",
            "FLAC / 24bit Lossless / Log / 100% / Cue / CD",
        );
        assert_eq!(
            r.audio,
            vec!["24BIT Lossless", "Cue", "FLAC", "Log100", "Log"]
        );
        assert_eq!(r.source, "CD");
    }

    #[test]
    fn music_mp3_cassette() {
        let r = parsed("Various Artists - Music '21", "MP3 / 320 / Cassette");
        assert_eq!(r.title, "Various Artists - Music '21");
        assert_eq!(r.source, "Cassette");
        assert_eq!(r.audio, vec!["320", "MP3"]);
    }

    #[test]
    fn music_vbr() {
        let r = parsed(
            "The artist (ザ・フリーダムユニティ) - Long album name",
            "MP3 / V0 (VBR) / CD",
        );
        assert_eq!(r.title, "The artist");
        assert_eq!(r.group, "name");
        assert_eq!(r.source, "CD");
        assert_eq!(r.audio, vec!["MP3", "VBR"]);
    }

    #[test]
    fn partial_log_score() {
        let r = parsed("Artist - Albumname", "FLAC / Lossless / Log / 92% / Cue / CD");
        assert_eq!(r.log_score, 92);
        assert_eq!(r.audio, vec!["Cue", "FLAC", "Lossless", "Log"]);
    }
}

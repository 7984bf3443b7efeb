//! Release name parsing.
//!
//! Field extraction is regex-table driven: every token family (codec, HDR,
//! audio, source, language, "other") is a list of canonical tokens with
//! patterns, scanned most-specific first. Matched spans are claimed so a
//! `DTS-HD MA` hit does not also surface as `DTS-HD` and `DTS`. Output order
//! within a family follows position in the name.

use crate::models::Release;
use crate::parser::get_regex;
use regex::Regex;
use std::sync::OnceLock;

struct TokenDef {
    canonical: &'static str,
    pattern: &'static str,
}

const CODECS: &[TokenDef] = &[
    TokenDef { canonical: "HEVC", pattern: r"(?i)\bHEVC\b" },
    TokenDef { canonical: "H.265", pattern: r"(?i)\bH[. ]?265\b" },
    TokenDef { canonical: "x265", pattern: r"(?i)\bx265\b" },
    TokenDef { canonical: "H.264", pattern: r"(?i)\bH[. ]?264\b" },
    TokenDef { canonical: "x264", pattern: r"(?i)\bx264\b" },
    TokenDef { canonical: "AV1", pattern: r"(?i)\bAV1\b" },
    TokenDef { canonical: "VC-1", pattern: r"(?i)\bVC-?1\b" },
    TokenDef { canonical: "MPEG-2", pattern: r"(?i)\bMPEG-?2\b" },
    TokenDef { canonical: "AVC", pattern: r"(?i)\bAVC\b" },
    TokenDef { canonical: "XviD", pattern: r"(?i)\bXviD\b" },
];

const HDR: &[TokenDef] = &[
    TokenDef { canonical: "HDR10+", pattern: r"(?i)\bHDR10\+" },
    TokenDef { canonical: "HDR10+", pattern: r"(?i)\bHDR\+" },
    TokenDef { canonical: "HDR10", pattern: r"(?i)\bHDR10\b" },
    TokenDef { canonical: "DV", pattern: r"(?i)\b(?:DV|DoVi|Dolby[\s.]?Vision)\b" },
    TokenDef { canonical: "HDR", pattern: r"(?i)\bHDR\b" },
];

const AUDIO: &[TokenDef] = &[
    TokenDef { canonical: "DTS-HD.MA", pattern: r"(?i)\bDTS[-. ]HD[-. ]?MA\b" },
    TokenDef { canonical: "DTS-HD", pattern: r"(?i)\bDTS[-. ]HD\b" },
    TokenDef { canonical: "TrueHD", pattern: r"(?i)\bTrueHD\b" },
    // glued channel digits (DDP5.1) mean no trailing word boundary
    TokenDef { canonical: "DDP", pattern: r"(?i)\bDDPA?|\bDD\+|\bEAC3\b" },
    TokenDef { canonical: "Atmos", pattern: r"(?i)\bAtmos\b" },
    TokenDef { canonical: "DTS", pattern: r"(?i)\bDTS\b" },
    TokenDef { canonical: "AC3", pattern: r"(?i)\bAC3\b" },
    TokenDef { canonical: "AAC", pattern: r"(?i)\bAAC" },
    TokenDef { canonical: "FLAC", pattern: r"(?i)\bFLAC\b" },
    TokenDef { canonical: "LPCM", pattern: r"(?i)\bLPCM\b" },
    TokenDef { canonical: "OPUS", pattern: r"(?i)\bOPUS\b" },
    TokenDef { canonical: "MP3", pattern: r"(?i)\bMP3\b" },
];

const SOURCES: &[TokenDef] = &[
    TokenDef { canonical: "UHD.BluRay", pattern: r"(?i)\bUHD[\s.]?Blu[\s.-]?Ray\b" },
    TokenDef { canonical: "WEB-DL", pattern: r"(?i)\bWEB[\s.-]?DL\b" },
    TokenDef { canonical: "WEBRip", pattern: r"(?i)\bWEB[\s.-]?Rip\b" },
    TokenDef { canonical: "BluRay", pattern: r"(?i)\bBlu[\s.-]?Ray\b" },
    TokenDef { canonical: "HDTV", pattern: r"(?i)\bHDTV\b" },
    TokenDef { canonical: "DVDRip", pattern: r"(?i)\bDVD[\s.-]?Rip\b" },
    TokenDef { canonical: "BDRip", pattern: r"(?i)\bBD[\s.-]?Rip\b" },
    TokenDef { canonical: "DVD", pattern: r"(?i)\bDVD\b" },
    TokenDef { canonical: "WEB", pattern: r"(?i)\bWEB\b" },
];

const LANGUAGES: &[TokenDef] = &[
    TokenDef { canonical: "ENGLiSH", pattern: r"(?i)\bENGLISH\b" },
    TokenDef { canonical: "GERMAN", pattern: r"(?i)\bGERMAN\b" },
    TokenDef { canonical: "FRENCH", pattern: r"(?i)\bFRENCH\b" },
    TokenDef { canonical: "SPANiSH", pattern: r"(?i)\bSPANISH\b" },
    TokenDef { canonical: "iTALiAN", pattern: r"(?i)\bITALIAN\b" },
    TokenDef { canonical: "NORDiC", pattern: r"(?i)\bNORDIC\b" },
    TokenDef { canonical: "JAPANESE", pattern: r"(?i)\bJAPANESE\b" },
    TokenDef { canonical: "KOREAN", pattern: r"(?i)\bKOREAN\b" },
    TokenDef { canonical: "RUSSiAN", pattern: r"(?i)\bRUSSIAN\b" },
    TokenDef { canonical: "MULTi", pattern: r"(?i)\bMULTI\b" },
    TokenDef { canonical: "DUBBED", pattern: r"(?i)\bDUBBED\b" },
    TokenDef { canonical: "SUBBED", pattern: r"(?i)\bSUBBED\b" },
];

const OTHER: &[TokenDef] = &[
    TokenDef { canonical: "HYBRiD", pattern: r"(?i)\bHYBRID\b" },
    TokenDef { canonical: "REMUX", pattern: r"(?i)\bREMUX\b" },
    TokenDef { canonical: "EXTENDED", pattern: r"(?i)\bEXTENDED\b" },
    TokenDef { canonical: "UNCUT", pattern: r"(?i)\bUNCUT\b" },
    TokenDef { canonical: "UNRATED", pattern: r"(?i)\bUNRATED\b" },
];

fn table_regexes(defs: &'static [TokenDef], cell: &'static OnceLock<Vec<Regex>>) -> &'static [Regex] {
    cell.get_or_init(|| {
        defs.iter()
            .map(|d| Regex::new(d.pattern).expect("Invalid regex pattern defined in code"))
            .collect()
    })
}

/// Scans `name` against a token table, claiming matched spans so broader
/// patterns later in the table cannot re-match inside them. Returns
/// `(position, canonical)` pairs sorted by position, deduplicated.
fn collect_tokens(
    name: &str,
    defs: &'static [TokenDef],
    cell: &'static OnceLock<Vec<Regex>>,
) -> Vec<(usize, &'static str)> {
    let regexes = table_regexes(defs, cell);
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, &'static str)> = Vec::new();

    for (def, re) in defs.iter().zip(regexes) {
        for m in re.find_iter(name) {
            let overlaps = claimed
                .iter()
                .any(|&(s, e)| m.start() < e && s < m.end());
            if overlaps {
                continue;
            }
            claimed.push((m.start(), m.end()));
            if !found.iter().any(|&(_, c)| c == def.canonical) {
                found.push((m.start(), def.canonical));
            }
            break;
        }
    }

    found.sort_by_key(|&(pos, _)| pos);
    found
}

fn token_values(found: &[(usize, &'static str)]) -> Vec<String> {
    found.iter().map(|&(_, c)| c.to_string()).collect()
}

struct SeasonEpisode {
    season: i32,
    episode: i32,
    pos: usize,
}

fn find_season_episode(name: &str) -> Option<SeasonEpisode> {
    static SE: OnceLock<Regex> = OnceLock::new();
    static S_ONLY: OnceLock<Regex> = OnceLock::new();
    static CROSS: OnceLock<Regex> = OnceLock::new();
    static ANIME: OnceLock<Regex> = OnceLock::new();

    let se = get_regex(&SE, r"(?i)\bS(\d{1,3})[\s._-]?E(\d{1,4})\b");
    if let Some(caps) = se.captures(name) {
        return Some(SeasonEpisode {
            season: caps[1].parse().unwrap_or(0),
            episode: caps[2].parse().unwrap_or(0),
            pos: caps.get(0).map_or(0, |m| m.start()),
        });
    }

    let s_only = get_regex(&S_ONLY, r"(?i)\bS(\d{1,3})\b");
    if let Some(caps) = s_only.captures(name) {
        return Some(SeasonEpisode {
            season: caps[1].parse().unwrap_or(0),
            episode: 0,
            pos: caps.get(0).map_or(0, |m| m.start()),
        });
    }

    let cross = get_regex(&CROSS, r"\b(\d{1,2})x(\d{2,3})\b");
    if let Some(caps) = cross.captures(name) {
        return Some(SeasonEpisode {
            season: caps[1].parse().unwrap_or(0),
            episode: caps[2].parse().unwrap_or(0),
            pos: caps.get(0).map_or(0, |m| m.start()),
        });
    }

    // anime style: "Title - 04 (1080p)"
    let anime = get_regex(&ANIME, r"-\s+(\d{2,4})\s*(?:v\d+)?\s*(?:$|[\[(])");
    if let Some(caps) = anime.captures(name) {
        return Some(SeasonEpisode {
            season: 0,
            episode: caps[1].parse().unwrap_or(0),
            pos: caps.get(0).map_or(0, |m| m.start()),
        });
    }

    None
}

fn find_year(name: &str) -> Option<(usize, i32)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\b(19\d{2}|20\d{2})\b");

    let max = chrono::Utc::now().format("%Y").to_string().parse::<i32>().unwrap_or(2100) + 2;
    re.find_iter(name)
        .filter_map(|m| {
            let year: i32 = m.as_str().parse().ok()?;
            (1900..=max).contains(&year).then_some((m.start(), year))
        })
        .last()
}

fn find_resolution(name: &str) -> Option<(usize, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(480p|576p|720p|1080i|1080p|2160p|4320p)\b");
    re.find(name).map(|m| (m.start(), m.as_str().to_lowercase()))
}

fn find_audio_channels(name: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)(?:^|[\s.(])[a-z]*([2457]\.[0-2])\b");
    re.captures(name).map(|caps| caps[1].to_string())
}

/// Trailing `-GROUP` extraction; single token after the final dash, with an
/// optional closing paren swallowed.
fn find_dash_group(name: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"-\s?([A-Za-z0-9][A-Za-z0-9._]*)\)?$");
    re.captures(name).map(|caps| caps[1].to_string())
}

fn find_bracket_group(name: &str) -> Option<(String, &str)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^\[([^\]]+)\]\s*");
    re.captures(name).map(|caps| {
        let rest = &name[caps.get(0).map_or(0, |m| m.end())..];
        (caps[1].to_string(), rest)
    })
}

fn clean_title(raw: &str) -> String {
    let replaced = raw.replace(['.', '_'], " ");
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches([' ', '-', '(', '['])
        .trim()
        .to_string()
}

/// Strips one trailing parenthesised run, e.g. an alternate artist spelling.
fn strip_trailing_paren(s: &str) -> &str {
    let trimmed = s.trim_end();
    if trimmed.ends_with(')')
        && let Some(open) = trimmed.rfind('(')
    {
        return trimmed[..open].trim_end();
    }
    trimmed
}

fn is_plain_word(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^[A-Za-z0-9][A-Za-z0-9._-]*$");
    re.is_match(s)
}

/// Parses a torrent name into the release's structured fields.
///
/// Never fails; tokens that are not recognised are simply left alone, and
/// fields that are not found keep their current values.
pub fn parse_into(release: &mut Release, name: &str) {
    static CODEC_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static HDR_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static AUDIO_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static SOURCE_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static LANGUAGE_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static OTHER_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    static PROPER_RE: OnceLock<Regex> = OnceLock::new();
    static REPACK_RE: OnceLock<Regex> = OnceLock::new();

    release.torrent_name = name.to_string();

    let season_episode = find_season_episode(name);
    let year = find_year(name);
    let resolution = find_resolution(name);
    let sources = collect_tokens(name, SOURCES, &SOURCE_RE);
    let codecs = collect_tokens(name, CODECS, &CODEC_RE);

    let video_shaped = season_episode.is_some()
        || year.is_some()
        || resolution.is_some()
        || !sources.is_empty()
        || !codecs.is_empty();

    if !video_shaped {
        parse_music_name(release, name);
        return;
    }

    if let Some(se) = &season_episode {
        release.season = se.season;
        release.episode = se.episode;
    }
    if let Some((_, year)) = year {
        release.year = year;
    }
    if let Some((_, resolution)) = &resolution {
        release.resolution = resolution.clone();
    }
    if let Some(&(_, source)) = sources.first() {
        release.source = source.to_string();
    }
    if !codecs.is_empty() {
        release.codec = token_values(&codecs);
    }

    let hdr = collect_tokens(name, HDR, &HDR_RE);
    if !hdr.is_empty() {
        release.hdr = token_values(&hdr);
    }

    let audio = collect_tokens(name, AUDIO, &AUDIO_RE);
    if !audio.is_empty() {
        release.audio = token_values(&audio);
    }
    if let Some(channels) = find_audio_channels(name) {
        release.audio_channels = channels;
    }

    let language = collect_tokens(name, LANGUAGES, &LANGUAGE_RE);
    if !language.is_empty() {
        release.language = token_values(&language);
    }

    let other = collect_tokens(name, OTHER, &OTHER_RE);
    if !other.is_empty() {
        release.other = token_values(&other);
    }

    release.proper |= get_regex(&PROPER_RE, r"(?i)\bPROPER\b").is_match(name);
    release.repack |= get_regex(&REPACK_RE, r"(?i)\bREPACK\b").is_match(name);

    // title runs up to the first structural token
    let mut boundary = name.len();
    if let Some(se) = &season_episode {
        boundary = boundary.min(se.pos);
    }
    if let Some((pos, _)) = year {
        boundary = boundary.min(pos);
    }
    if let Some((pos, _)) = &resolution {
        boundary = boundary.min(*pos);
    }
    if let Some(&(pos, _)) = sources.first() {
        boundary = boundary.min(pos);
    }

    let mut title_part = &name[..boundary];
    if let Some((group, rest_of_name)) = find_bracket_group(name) {
        release.group = group;
        let consumed = name.len() - rest_of_name.len();
        title_part = &name[consumed..boundary.max(consumed)];
    } else if let Some(group) = find_dash_group(name) {
        release.group = group;
    }

    let title = clean_title(title_part);
    if !title.is_empty() {
        release.title = title;
    }
}

/// Music announces have no structural video tokens; `Artist - Album` splits
/// into title and group only when the album tail ends in a plain word. The
/// boundary is deliberately conservative: `Music '21` keeps the whole name.
fn parse_music_name(release: &mut Release, name: &str) {
    if let Some((left, right)) = name.split_once(" - ")
        && let Some(last) = right.split_whitespace().last()
        && is_plain_word(last)
    {
        release.title = strip_trailing_paren(left).to_string();
        release.group = last.to_string();
        return;
    }

    let title = name.trim();
    if !title.is_empty() {
        release.title = title.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str) -> Release {
        let mut r = Release::new("mock");
        parse_into(&mut r, name);
        r
    }

    #[test]
    fn parse_web_dl_spaces() {
        let r = parsed("Servant S01 2160p ATVP WEB-DL DDP 5.1 Atmos DV HEVC-FLUX");
        assert_eq!(r.title, "Servant");
        assert_eq!(r.season, 1);
        assert_eq!(r.episode, 0);
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.codec, vec!["HEVC"]);
        assert_eq!(r.audio, vec!["DDP", "Atmos"]);
        assert_eq!(r.audio_channels, "5.1");
        assert_eq!(r.hdr, vec!["DV"]);
        assert_eq!(r.group, "FLUX");
        assert_eq!(r.year, 0);
        assert!(r.website.is_empty());
    }

    #[test]
    fn parse_web_dl_dotted() {
        let r = parsed("Servant.S01.2160p.ATVP.WEB-DL.DDP.5.1.Atmos.DV.HEVC-FLUX");
        assert_eq!(r.title, "Servant");
        assert_eq!(r.season, 1);
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.codec, vec!["HEVC"]);
        assert_eq!(r.audio, vec!["DDP", "Atmos"]);
        assert_eq!(r.audio_channels, "5.1");
        assert_eq!(r.hdr, vec!["DV"]);
        assert_eq!(r.group, "FLUX");
    }

    #[test]
    fn parse_uhd_remux_movie() {
        let r = parsed(
            "I Am Movie 2007 Theatrical UHD BluRay 2160p DTS-HD MA 5.1 DV HEVC HYBRID REMUX-GROUP1",
        );
        assert_eq!(r.title, "I Am Movie");
        assert_eq!(r.year, 2007);
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "UHD.BluRay");
        assert_eq!(r.codec, vec!["HEVC"]);
        assert_eq!(r.hdr, vec!["DV"]);
        assert_eq!(r.audio, vec!["DTS-HD.MA"]);
        assert_eq!(r.audio_channels, "5.1");
        assert_eq!(r.other, vec!["HYBRiD", "REMUX"]);
        assert_eq!(r.group, "GROUP1");
    }

    #[test]
    fn parse_year_and_parenthesised_group() {
        let r = parsed(
            "The Peripheral (2022) S01 (2160p AMZN WEB-DL H265 HDR10+ DDP 5.1 English - GROUP1)",
        );
        assert_eq!(r.title, "The Peripheral");
        assert_eq!(r.year, 2022);
        assert_eq!(r.season, 1);
        assert_eq!(r.resolution, "2160p");
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.codec, vec!["H.265"]);
        assert_eq!(r.hdr, vec!["HDR10+"]);
        assert_eq!(r.audio, vec!["DDP"]);
        assert_eq!(r.audio_channels, "5.1");
        assert_eq!(r.language, vec!["ENGLiSH"]);
        assert_eq!(r.group, "GROUP1");
    }

    #[test]
    fn parse_episode_and_dotted_title() {
        let r = parsed("Outer.Range.S01E02.The.Land.1080p.AMZN.WEB-DL.DDP5.1.H.264-TOMMY");
        assert_eq!(r.title, "Outer Range");
        assert_eq!(r.season, 1);
        assert_eq!(r.episode, 2);
        assert_eq!(r.resolution, "1080p");
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.codec, vec!["H.264"]);
        assert_eq!(r.audio, vec!["DDP"]);
        assert_eq!(r.audio_channels, "5.1");
        assert_eq!(r.group, "TOMMY");
    }

    #[test]
    fn parse_bluray_avc() {
        let r = parsed("Without Remorse 2021 1080p Blu-ray AVC DTS-HD MA 5.1-MTeam");
        assert_eq!(r.title, "Without Remorse");
        assert_eq!(r.year, 2021);
        assert_eq!(r.source, "BluRay");
        assert_eq!(r.codec, vec!["AVC"]);
        assert_eq!(r.audio, vec!["DTS-HD.MA"]);
        assert_eq!(r.group, "MTeam");
    }

    #[test]
    fn parse_dated_news_show() {
        let r = parsed("NBC.Nightly.News.2022.04.12.1080p.NBC.WEB-DL.AAC2.0.H.264-TEPES");
        assert_eq!(r.title, "NBC Nightly News");
        assert_eq!(r.year, 2022);
        assert_eq!(r.source, "WEB-DL");
        assert_eq!(r.codec, vec!["H.264"]);
        assert_eq!(r.audio, vec!["AAC"]);
        assert_eq!(r.audio_channels, "2.0");
        assert_eq!(r.group, "TEPES");
    }

    #[test]
    fn parse_anime_bracket_style() {
        let r = parsed(
            "[SubsPlease] Heroine Tarumono! Kiraware Heroine to Naisho no Oshigoto - 04 (1080p) [17083ED9]",
        );
        assert_eq!(r.group, "SubsPlease");
        assert_eq!(r.episode, 4);
        assert_eq!(r.resolution, "1080p");
        assert_eq!(
            r.title,
            "Heroine Tarumono! Kiraware Heroine to Naisho no Oshigoto"
        );
    }

    #[test]
    fn parse_dovi_variants_normalise_to_dv() {
        for name in [
            "WeCrashed.S01.DV.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD",
            "WeCrashed.S01.DoVi.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD",
            "WeCrashed.S01.Dolby.Vision.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD",
        ] {
            let r = parsed(name);
            assert_eq!(r.hdr, vec!["DV"], "{name}");
            assert_eq!(r.codec, vec!["x265"], "{name}");
            assert_eq!(r.audio, vec!["DDP"], "{name}");
        }
    }

    #[test]
    fn parse_hdr_flavours() {
        assert_eq!(
            parsed("WeCrashed.S01E07.HDR.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD").hdr,
            vec!["HDR"]
        );
        assert_eq!(
            parsed("WeCrashed.S01.DoVi.HDR10+.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD").hdr,
            vec!["DV", "HDR10+"]
        );
        assert_eq!(
            parsed("WeCrashed.S01.DV.HDR+.2160p.ATVP.WEB-DL.DDPA5.1.x265-NOSiViD").hdr,
            vec!["DV", "HDR10+"]
        );
    }

    #[test]
    fn parse_music_split() {
        let r = parsed("Artist - Albumname");
        assert_eq!(r.title, "Artist");
        assert_eq!(r.group, "Albumname");
        assert_eq!(r.season, 0);
        assert_eq!(r.year, 0);
    }

    #[test]
    fn parse_music_keeps_odd_album_names_whole() {
        let r = parsed("Various Artists - Music '21");
        assert_eq!(r.title, "Various Artists - Music '21");
        assert_eq!(r.group, "");
    }

    #[test]
    fn parse_music_alternate_artist_spelling() {
        let r = parsed("The artist (ザ・フリーダムユニティ) - Long album name");
        assert_eq!(r.title, "The artist");
        assert_eq!(r.group, "name");
    }

    #[test]
    fn parse_proper_repack() {
        let r = parsed("Show.S02E04.REPACK.1080p.WEB-DL.H.264-GRP");
        assert!(r.repack);
        assert!(!r.proper);
    }

    #[test]
    fn parse_multi_language_complete() {
        let r = parsed("Sing 2 2021 MULTi COMPLETE UHD Blu-ray TrueHD Atmos 7.1-MMCLX");
        assert_eq!(r.year, 2021);
        assert_eq!(r.source, "UHD.BluRay");
        assert_eq!(r.audio, vec!["TrueHD", "Atmos"]);
        assert_eq!(r.audio_channels, "7.1");
        assert_eq!(r.language, vec!["MULTi"]);
        assert_eq!(r.group, "MMCLX");
    }
}

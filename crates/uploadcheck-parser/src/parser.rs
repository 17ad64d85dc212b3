//! Core parsing logic for movie release names.
//!
//! The parser operates in four phases over the token stream:
//! 1. Find the release group (the word after the last hyphen).
//! 2. Decide which four-digit token, if any, is the release year.
//! 3. Scan tokens for resolution, quality, codec and episode markers. When a
//!    year was chosen, only tokens after it count, so keywords inside the
//!    title ("Charlotte's.Web", "The.Cam.Show") stay title words.
//! 4. Build the title from the tokens before the chosen year, or before the
//!    first marker when there is no year.

use crate::quality::{Quality, Resolution};
use crate::tokenizer::{tokenize, SpannedToken, Token};
use crate::types::ParsedName;

const MIN_YEAR: u16 = 1900;
const MAX_YEAR: u16 = 2100;

/// Parse a release name (no directory, no extension).
pub(crate) fn parse(input: &str, title_noise: &[String]) -> ParsedName {
    let tokens = tokenize(input);

    if tokens.is_empty() {
        return ParsedName::new(clean_title(input));
    }

    let mut name = ParsedName::new(String::new());

    let group_idx = extract_group(&tokens, &mut name);
    let year = select_year(&tokens, group_idx);
    let metadata_start = match year {
        YearChoice::Chosen(idx, _) => idx + 1,
        YearChoice::Absent | YearChoice::Ambiguous => 0,
    };
    extract_metadata(&tokens, metadata_start, &mut name);
    extract_title(&tokens, input, year, group_idx, title_noise, &mut name);

    name
}

// -------------------------------------------------------------------------
// Release group extraction
// -------------------------------------------------------------------------

/// Find the release group and return its token index.
///
/// The group is the last content token, preceded by a hyphen, not itself a
/// recognized keyword, and only counted when some release metadata appears
/// before it (so hyphenated titles like `Spider-Man` keep their last word).
fn extract_group(tokens: &[SpannedToken<'_>], name: &mut ParsedName) -> Option<usize> {
    let last = last_significant(tokens, tokens.len())?;
    let candidate = &tokens[last];
    if !matches!(candidate.token, Token::Word(_) | Token::Number(_)) {
        return None;
    }
    if last == 0 || !matches!(tokens[last - 1].token, Token::Hyphen) {
        return None;
    }
    let has_metadata_before = tokens[..last - 1]
        .iter()
        .any(|t| t.token.is_marker() || matches!(t.token, Token::Year(_)));
    if !has_metadata_before {
        return None;
    }

    name.group = candidate.token.text().map(str::to_string);
    Some(last)
}

// -------------------------------------------------------------------------
// Metadata extraction
// -------------------------------------------------------------------------

/// Read release metadata from `tokens[start..]`. Episode markers count
/// anywhere in the name.
fn extract_metadata(tokens: &[SpannedToken<'_>], start: usize, name: &mut ParsedName) {
    let mut has_remux = false;
    let mut has_uhd = false;
    let mut source: Option<Quality> = None;

    name.is_episode = tokens
        .iter()
        .any(|st| matches!(st.token, Token::SeasonEpisode(_)));

    // Without a year, a leading keyword is read as a title word (see
    // `extract_title`).
    let title_head = if start == 0 {
        first_significant(tokens, 0).filter(|&i| i + 1 < tokens.len())
    } else {
        None
    };

    for (i, st) in tokens.iter().enumerate().skip(start) {
        if Some(i) == title_head {
            continue;
        }
        match &st.token {
            Token::Resolution(text) => {
                if !name.resolution.is_known() {
                    name.resolution = normalize_resolution(text);
                }
            }
            Token::Sd(_) => {
                if !name.resolution.is_known() {
                    name.resolution = Resolution::Sd;
                }
            }
            Token::Uhd(_) => has_uhd = true,

            Token::SourceRemux(_) => has_remux = true,
            Token::SourceBluRay(_) => set_if_none(&mut source, Quality::Encode),
            Token::SourceWebDL(_) => set_if_none(&mut source, Quality::WebDl),
            Token::SourceWebRip(_) | Token::SourceWeb(_) => {
                set_if_none(&mut source, Quality::WebRip)
            }
            Token::SourceHDTV(_) => set_if_none(&mut source, Quality::Hdtv),
            Token::SourceDVD(_) => set_if_none(&mut source, Quality::DvdRip),
            Token::SourceCam(_) => set_if_none(&mut source, Quality::Cam),
            Token::SourceTelesync(_) => set_if_none(&mut source, Quality::Telesync),

            Token::CodecH264(text) | Token::CodecH265(text) | Token::CodecOther(text) => {
                if name.video_codec.is_none() {
                    name.video_codec = Some(normalize_codec(text));
                }
            }

            _ => {}
        }
    }

    // A remux marker outranks the disc source it was cut from.
    name.quality = if has_remux {
        Quality::Remux
    } else {
        source.unwrap_or(Quality::Unknown)
    };

    if has_uhd && !name.resolution.is_known() {
        name.resolution = Resolution::_2160p;
    }
}

fn normalize_resolution(text: &str) -> Resolution {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "1080i" => Resolution::_1080i,
        _ => lower
            .trim_end_matches(['p', 'i'])
            .parse::<u32>()
            .ok()
            .and_then(|n| format!("{}p", n).parse().ok())
            .unwrap_or(Resolution::Unknown),
    }
}

fn normalize_codec(text: &str) -> String {
    let key: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "x264" => "x264".to_string(),
        "x265" => "x265".to_string(),
        "h264" | "avc" => "H.264".to_string(),
        "h265" | "hevc" => "H.265".to_string(),
        "xvid" => "XviD".to_string(),
        "divx" => "DivX".to_string(),
        _ => text.to_ascii_uppercase(),
    }
}

// -------------------------------------------------------------------------
// Year selection
// -------------------------------------------------------------------------

/// Outcome of choosing the release year among four-digit tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearChoice {
    /// No year-shaped token at all.
    Absent,
    /// The token at this index is the release year and ends the title.
    Chosen(usize, u16),
    /// Year-shaped tokens exist but none is clearly the release year; they
    /// stay in the title and the year is unknown.
    Ambiguous,
}

/// Pick the last in-range year that is followed by a marker or sits in
/// trailing position. A year that would leave the title empty is treated
/// as part of the title instead.
fn select_year(tokens: &[SpannedToken<'_>], group_idx: Option<usize>) -> YearChoice {
    let years: Vec<(usize, u16)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(i, st)| match st.token {
            Token::Year(text) => text
                .parse::<u16>()
                .ok()
                .filter(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
                .map(|y| (i, y)),
            _ => None,
        })
        .collect();

    if years.is_empty() {
        return YearChoice::Absent;
    }

    let first_content = first_significant(tokens, 0);

    for &(idx, year) in years.iter().rev() {
        let trailing_or_marked = match first_significant(tokens, idx + 1) {
            None => true,
            Some(next) => Some(next) == group_idx || tokens[next].token.is_marker(),
        };
        if !trailing_or_marked {
            continue;
        }
        if first_content == Some(idx) {
            // Nothing before it could be a title.
            return YearChoice::Ambiguous;
        }
        return YearChoice::Chosen(idx, year);
    }

    YearChoice::Ambiguous
}

// -------------------------------------------------------------------------
// Title extraction
// -------------------------------------------------------------------------

fn extract_title(
    tokens: &[SpannedToken<'_>],
    input: &str,
    year: YearChoice,
    group_idx: Option<usize>,
    title_noise: &[String],
    name: &mut ParsedName,
) {
    // The first content token always belongs to the title, even if it looks
    // like a keyword ("Cam.Girl.2014").
    let start = first_significant(tokens, 0).unwrap_or(0);
    let marker_stop = tokens
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, st)| st.token.is_marker())
        .map(|(i, _)| i);

    // A chosen year alone ends the title; markers before it are title words.
    let stop = match year {
        YearChoice::Chosen(idx, y) => {
            name.year = Some(y);
            Some(idx)
        }
        YearChoice::Absent | YearChoice::Ambiguous => marker_stop,
    };

    let end = [stop, group_idx.map(|g| g.saturating_sub(1))]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(tokens.len());

    let parts: Vec<&str> = tokens[..end]
        .iter()
        .filter_map(|st| st.token.text())
        .filter(|word| {
            !title_noise
                .iter()
                .any(|noise| noise.eq_ignore_ascii_case(word))
        })
        .collect();

    name.title = if parts.is_empty() {
        clean_title(input)
    } else {
        parts.join(" ")
    };
}

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

fn set_if_none<T>(slot: &mut Option<T>, value: T) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Index of the first non-structural token at or after `from`.
fn first_significant(tokens: &[SpannedToken<'_>], from: usize) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, st)| !st.token.is_structural())
        .map(|(i, _)| i)
}

/// Index of the last non-structural token before `until`.
fn last_significant(tokens: &[SpannedToken<'_>], until: usize) -> Option<usize> {
    tokens[..until.min(tokens.len())]
        .iter()
        .rposition(|st| !st.token.is_structural())
}

/// Fallback title: delimiters become spaces, runs of whitespace collapse.
fn clean_title(input: &str) -> String {
    input
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(input: &str) -> ParsedName {
        parse(input, &["UHD".to_string(), "HYBRID".to_string()])
    }

    #[test]
    fn test_basic_movie() {
        let n = p("Movie.Title.2014.1080p.BluRay.x264-GROUP");
        assert_eq!(n.title, "Movie Title");
        assert_eq!(n.year, Some(2014));
        assert_eq!(n.resolution, Resolution::_1080p);
        assert_eq!(n.quality, Quality::Encode);
        assert_eq!(n.video_codec.as_deref(), Some("x264"));
        assert_eq!(n.group.as_deref(), Some("GROUP"));
        assert!(!n.is_episode);
    }

    #[test]
    fn test_remux_outranks_bluray() {
        let n = p("Movie.2019.2160p.UHD.BluRay.REMUX.HDR.HEVC.TrueHD.7.1.Atmos-FraMeSToR");
        assert_eq!(n.quality, Quality::Remux);
        assert_eq!(n.resolution, Resolution::_2160p);
        assert_eq!(n.video_codec.as_deref(), Some("H.265"));
        assert_eq!(n.group.as_deref(), Some("FraMeSToR"));
    }

    #[test]
    fn test_web_sources() {
        assert_eq!(p("Movie.2020.1080p.WEB-DL.DDP5.1.H.264-NTb").quality, Quality::WebDl);
        assert_eq!(p("Movie.2020.1080p.WEBRip.x264-RARBG").quality, Quality::WebRip);
        assert_eq!(p("Movie.2020.1080p.WEB.H264-GROUP").quality, Quality::WebRip);
    }

    #[test]
    fn test_title_number_that_looks_like_year() {
        let n = p("1984.1984.1080p.BluRay.x264-GROUP");
        assert_eq!(n.title, "1984");
        assert_eq!(n.year, Some(1984));

        let n = p("2001.A.Space.Odyssey.1968.1080p.BluRay.x264-GROUP");
        assert_eq!(n.title, "2001 A Space Odyssey");
        assert_eq!(n.year, Some(1968));

        let n = p("Blade.Runner.2049.2017.2160p.WEB-DL-GROUP");
        assert_eq!(n.title, "Blade Runner 2049");
        assert_eq!(n.year, Some(2017));
    }

    #[test]
    fn test_lone_leading_year_is_title() {
        let n = p("1917.1080p.BluRay.x264-GROUP");
        assert_eq!(n.title, "1917");
        assert_eq!(n.year, None);
    }

    #[test]
    fn test_ambiguous_year_keeps_longer_title() {
        let n = p("Movie.2014.Something.Else.1080p.BluRay");
        assert_eq!(n.title, "Movie 2014 Something Else");
        assert_eq!(n.year, None);
    }

    #[test]
    fn test_trailing_year() {
        let n = p("Some Movie (2014)");
        assert_eq!(n.title, "Some Movie");
        assert_eq!(n.year, Some(2014));
        assert_eq!(n.resolution, Resolution::Unknown);
        assert_eq!(n.quality, Quality::Unknown);
    }

    #[test]
    fn test_year_in_brackets_before_marker() {
        let n = p("Some Movie (2014) [1080p] [WEBRip]");
        assert_eq!(n.title, "Some Movie");
        assert_eq!(n.year, Some(2014));
        assert_eq!(n.resolution, Resolution::_1080p);
    }

    #[test]
    fn test_year_before_group_is_trailing() {
        let n = p("Movie.Title.2014-GROUP");
        assert_eq!(n.title, "Movie Title");
        assert_eq!(n.year, Some(2014));
        assert_eq!(n.group.as_deref(), Some("GROUP"));
    }

    #[test]
    fn test_hyphenated_title_without_metadata() {
        let n = p("Spider-Man");
        assert_eq!(n.title, "Spider Man");
        assert_eq!(n.group, None);
    }

    #[test]
    fn test_noise_words_removed_from_title() {
        let n = p("Hybrid.Movie.2014.1080p.BluRay.x264-GROUP");
        assert_eq!(n.title, "Movie");
    }

    #[test]
    fn test_uhd_hint() {
        let n = p("Movie.2014.UHD.BluRay.x265-GROUP");
        assert_eq!(n.resolution, Resolution::_2160p);
        let n = p("Movie.2014.720p.4K.Upscale");
        assert_eq!(n.resolution, Resolution::_720p);
    }

    #[test]
    fn test_episode_detection() {
        let n = p("Show.S01E02.1080p.WEB-DL-GROUP");
        assert!(n.is_episode);
        assert_eq!(n.title, "Show");
    }

    #[test]
    fn test_leading_keyword_stays_in_title() {
        let n = p("Cam.Girl.2014.720p.WEB-DL-GROUP");
        assert_eq!(n.title, "Cam Girl");
        assert_eq!(n.quality, Quality::WebDl);
    }

    #[test]
    fn test_keywords_before_year_stay_in_title() {
        let n = p("Charlotte's.Web.2006.1080p.BluRay.x264-GRP");
        assert_eq!(n.title, "Charlotte's Web");
        assert_eq!(n.quality, Quality::Encode);

        let n = p("The.Cam.Show.2015.1080p.WEB-DL-GRP");
        assert_eq!(n.title, "The Cam Show");
        assert_eq!(n.quality, Quality::WebDl);
        assert_eq!(n.resolution, Resolution::_1080p);

        let n = p("The.Ts.Movie.2010.720p.BluRay.x264-GRP");
        assert_eq!(n.title, "The Ts Movie");
        assert_eq!(n.quality, Quality::Encode);
        assert_eq!(n.resolution, Resolution::_720p);
    }

    #[test]
    fn test_out_of_range_year_ignored() {
        let n = p("Movie.1850.1080p");
        assert_eq!(n.year, None);
    }

    #[test]
    fn test_garbage_input() {
        assert_eq!(p("").title, "");
        assert_eq!(p("!!!").title, "!!!");
        assert_eq!(p("....").quality, Quality::Unknown);
        let n = p("-.-_[]()");
        assert_eq!(n.year, None);
        assert_eq!(n.group, None);
    }

    #[test]
    fn test_normalize_resolution() {
        assert_eq!(normalize_resolution("1080P"), Resolution::_1080p);
        assert_eq!(normalize_resolution("1080i"), Resolution::_1080i);
        assert_eq!(normalize_resolution("576i"), Resolution::_576p);
        assert_eq!(normalize_resolution("2160p"), Resolution::_2160p);
    }
}

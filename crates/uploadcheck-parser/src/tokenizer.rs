//! Logos-based tokenizer for movie release filenames.
//!
//! Each variant of [`Token`] corresponds to a recognizable keyword or
//! structural element found in scene/P2P release names. Keyword patterns
//! are case-insensitive and carry explicit priorities so they beat the
//! generic [`Token::Word`] / [`Token::Number`] fallbacks on equal-length
//! matches.

use logos::Logos;
use std::ops::Range;

/// Token types emitted by the Logos lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    // -----------------------------------------------------------------
    // Episode markers (used only to ban TV content)
    // -----------------------------------------------------------------
    /// S01E01 style season/episode marker.
    #[regex(r"(?i)S[0-9]{1,2}E[0-9]{1,3}(E[0-9]{1,3})*", priority = 12)]
    SeasonEpisode(&'src str),

    // -----------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------
    /// Numeric resolution: 2160p, 1080p, 1080i, 720p, 576p, 480p.
    #[regex(r"(?i)(2160|1080|720|576|480)[pi]", priority = 10)]
    Resolution(&'src str),

    /// 4K / UHD hint, used when no numeric resolution is present.
    #[regex(r"(?i)(4K|UHD)", priority = 9)]
    Uhd(&'src str),

    /// Standard definition marker.
    #[regex(r"(?i)SD", priority = 6)]
    Sd(&'src str),

    // -----------------------------------------------------------------
    // Source / quality
    // -----------------------------------------------------------------
    /// Remux of a disc source.
    #[regex(r"(?i)REMUX", priority = 8)]
    SourceRemux(&'src str),

    /// BluRay / Blu-Ray / BRRip / BDRip encode.
    #[regex(r"(?i)(Blu-?Ray|BRRip|BDRip)", priority = 8)]
    SourceBluRay(&'src str),

    /// WEB-DL / WEBDL source.
    #[regex(r"(?i)WEB-?DL", priority = 8)]
    SourceWebDL(&'src str),

    /// WEBRip source.
    #[regex(r"(?i)WEB-?Rip", priority = 8)]
    SourceWebRip(&'src str),

    /// Bare WEB source (lower priority than WEB-DL / WEBRip).
    #[regex(r"(?i)WEB", priority = 5)]
    SourceWeb(&'src str),

    /// Broadcast captures.
    #[regex(r"(?i)(HDTV|PDTV|SDTV)", priority = 8)]
    SourceHDTV(&'src str),

    /// DVD rips and DVD-R images.
    #[regex(r"(?i)(DVDRip|DVD-?R|DVD)", priority = 8)]
    SourceDVD(&'src str),

    /// Theater camera recordings.
    #[regex(r"(?i)(CAM|CAMRip|HDCAM)", priority = 8)]
    SourceCam(&'src str),

    /// Telesync recordings.
    #[regex(r"(?i)(TS|HDTS|TELESYNC)", priority = 8)]
    SourceTelesync(&'src str),

    // -----------------------------------------------------------------
    // Video codecs
    // -----------------------------------------------------------------
    /// x264 / H.264 / AVC.
    #[regex(r"(?i)(x264|H\.?264|AVC)", priority = 9)]
    CodecH264(&'src str),

    /// x265 / H.265 / HEVC.
    #[regex(r"(?i)(x265|H\.?265|HEVC)", priority = 9)]
    CodecH265(&'src str),

    /// Less common codecs.
    #[regex(r"(?i)(AV1|VP9|XviD|DivX|MPEG-?2|VC-?1)", priority = 9)]
    CodecOther(&'src str),

    // -----------------------------------------------------------------
    // Audio, HDR, edition and release modifiers (title stops only)
    // -----------------------------------------------------------------
    /// Audio codec with an optional glued channel layout (DD5.1, AAC2.0).
    #[regex(
        r"(?i)(DTS-?HD(-?MA)?|DTS-?X|DTS|TrueHD|Atmos|DDP?\+?|E-?AC-?3|AC-?3|AAC|FLAC|Opus|L?PCM)([1-9]\.[0-2])?",
        priority = 7
    )]
    Audio(&'src str),

    /// HDR formats.
    #[regex(r"(?i)(HDR10Plus|HDR10\+|HDR10|HDR|DoVi|DV|HLG)", priority = 7)]
    Hdr(&'src str),

    /// Edition markers.
    #[regex(
        r"(?i)(EXTENDED|UNCUT|UNRATED|REMASTERED|THEATRICAL|CRITERION|IMAX|Directors?.?Cut)",
        priority = 7
    )]
    Edition(&'src str),

    /// Release modifiers.
    #[regex(r"(?i)(REPACK|PROPER|RERIP|INTERNAL|LIMITED)", priority = 7)]
    Modifier(&'src str),

    // -----------------------------------------------------------------
    // Numbers and structure
    // -----------------------------------------------------------------
    /// Four-digit year candidate. Range is validated by the parser.
    #[regex(r"(19[0-9]{2}|20[0-9]{2}|2100)", priority = 5)]
    Year(&'src str),

    /// Dot delimiter.
    #[token(".")]
    Dot,

    /// Hyphen delimiter.
    #[token("-")]
    Hyphen,

    /// Underscore delimiter.
    #[token("_")]
    Underscore,

    /// `[` or `(`.
    #[regex(r"[\[(]")]
    BracketOpen,

    /// `]` or `)`.
    #[regex(r"[\])]")]
    BracketClose,

    /// Generic word token (lowest priority).
    #[regex(r"[\p{L}][\p{L}\p{N}']*", priority = 1)]
    Word(&'src str),

    /// Numeric token.
    #[regex(r"[0-9]+", priority = 2)]
    Number(&'src str),
}

impl<'src> Token<'src> {
    /// Delimiters and brackets carry no content of their own.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Token::Dot | Token::Hyphen | Token::Underscore | Token::BracketOpen | Token::BracketClose
        )
    }

    /// Recognized release metadata that ends the title portion of a name.
    ///
    /// Years are not markers; the parser's year selection decides whether
    /// a year ends the title.
    pub fn is_marker(&self) -> bool {
        !matches!(
            self,
            Token::Year(_) | Token::Word(_) | Token::Number(_)
        ) && !self.is_structural()
    }

    /// Source text for content-bearing tokens.
    pub fn text(&self) -> Option<&'src str> {
        match self {
            Token::SeasonEpisode(t)
            | Token::Resolution(t)
            | Token::Uhd(t)
            | Token::Sd(t)
            | Token::SourceRemux(t)
            | Token::SourceBluRay(t)
            | Token::SourceWebDL(t)
            | Token::SourceWebRip(t)
            | Token::SourceWeb(t)
            | Token::SourceHDTV(t)
            | Token::SourceDVD(t)
            | Token::SourceCam(t)
            | Token::SourceTelesync(t)
            | Token::CodecH264(t)
            | Token::CodecH265(t)
            | Token::CodecOther(t)
            | Token::Audio(t)
            | Token::Hdr(t)
            | Token::Edition(t)
            | Token::Modifier(t)
            | Token::Year(t)
            | Token::Word(t)
            | Token::Number(t) => Some(t),
            Token::Dot
            | Token::Hyphen
            | Token::Underscore
            | Token::BracketOpen
            | Token::BracketClose => None,
        }
    }
}

/// A token paired with its byte span in the original input.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: Range<usize>,
}

/// Tokenize an input string into a `Vec` of spanned tokens.
///
/// Characters no pattern recognizes (punctuation such as `&` or `,`) are
/// dropped.
pub fn tokenize(input: &str) -> Vec<SpannedToken<'_>> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| SpannedToken { token, span }))
        .collect()
}

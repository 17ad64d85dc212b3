//! Resolution and quality tiers and their ordering.
//!
//! Both dimensions are explicit ordered enumerations. Resolution order is
//! fixed; quality order lives in a [`QualityLadder`] because trackers do not
//! agree on where WEB-DL sits relative to encodes. `Unknown` never takes
//! part in the order: any comparison that involves it is
//! [`Comparison::Incomparable`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error produced when a tier name or ladder cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Outcome of comparing two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lower,
    Equal,
    Higher,
    /// At least one side is unknown or not ranked.
    Incomparable,
}

impl Comparison {
    fn from_ranks(a: Option<usize>, b: Option<usize>) -> Self {
        match (a, b) {
            (Some(a), Some(b)) if a < b => Comparison::Lower,
            (Some(a), Some(b)) if a > b => Comparison::Higher,
            (Some(_), Some(_)) => Comparison::Equal,
            _ => Comparison::Incomparable,
        }
    }

    /// True for `Equal` and `Higher`.
    pub fn is_at_least(self) -> bool {
        matches!(self, Comparison::Equal | Comparison::Higher)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Lower => write!(f, "lower"),
            Comparison::Equal => write!(f, "equal"),
            Comparison::Higher => write!(f, "higher"),
            Comparison::Incomparable => write!(f, "incomparable"),
        }
    }
}

// -------------------------------------------------------------------------
// Resolution
// -------------------------------------------------------------------------

/// Video resolution of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "sd")]
    Sd,
    #[serde(rename = "480p")]
    _480p,
    #[serde(rename = "576p")]
    _576p,
    #[serde(rename = "720p")]
    _720p,
    #[serde(rename = "1080i")]
    _1080i,
    #[serde(rename = "1080p")]
    _1080p,
    #[serde(rename = "2160p")]
    _2160p,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Resolution {
    /// Known resolutions, lowest first.
    pub const ORDER: [Resolution; 7] = [
        Resolution::Sd,
        Resolution::_480p,
        Resolution::_576p,
        Resolution::_720p,
        Resolution::_1080i,
        Resolution::_1080p,
        Resolution::_2160p,
    ];

    /// Position in [`Resolution::ORDER`], `None` for `Unknown`.
    pub fn rank(self) -> Option<usize> {
        Self::ORDER.iter().position(|r| *r == self)
    }

    pub fn is_known(self) -> bool {
        self != Resolution::Unknown
    }

    pub fn compare(self, other: Resolution) -> Comparison {
        Comparison::from_ranks(self.rank(), other.rank())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Sd => write!(f, "SD"),
            Resolution::_480p => write!(f, "480p"),
            Resolution::_576p => write!(f, "576p"),
            Resolution::_720p => write!(f, "720p"),
            Resolution::_1080i => write!(f, "1080i"),
            Resolution::_1080p => write!(f, "1080p"),
            Resolution::_2160p => write!(f, "2160p"),
            Resolution::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sd" | "480i" => Ok(Resolution::Sd),
            "480p" => Ok(Resolution::_480p),
            "576p" | "576i" => Ok(Resolution::_576p),
            "720p" | "720i" => Ok(Resolution::_720p),
            "1080i" => Ok(Resolution::_1080i),
            "1080p" => Ok(Resolution::_1080p),
            "2160p" | "2160i" | "4k" | "uhd" => Ok(Resolution::_2160p),
            "unknown" | "" => Ok(Resolution::Unknown),
            _ => Err(ParseError(format!("invalid resolution: {}", s))),
        }
    }
}

// -------------------------------------------------------------------------
// Quality
// -------------------------------------------------------------------------

/// Source quality of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "cam")]
    Cam,
    #[serde(rename = "ts")]
    Telesync,
    #[serde(rename = "dvdrip")]
    DvdRip,
    #[serde(rename = "hdtv")]
    Hdtv,
    #[serde(rename = "webrip")]
    WebRip,
    #[serde(rename = "web-dl")]
    WebDl,
    #[serde(rename = "encode")]
    Encode,
    #[serde(rename = "remux")]
    Remux,
    /// Untouched disc image. Not produced by the filename parser; trackers
    /// report it.
    #[serde(rename = "fulldisc")]
    FullDisc,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    pub fn is_known(self) -> bool {
        self != Quality::Unknown
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Cam => write!(f, "CAM"),
            Quality::Telesync => write!(f, "TS"),
            Quality::DvdRip => write!(f, "DVDRip"),
            Quality::Hdtv => write!(f, "HDTV"),
            Quality::WebRip => write!(f, "WEBRip"),
            Quality::WebDl => write!(f, "WEB-DL"),
            Quality::Encode => write!(f, "BluRay-encode"),
            Quality::Remux => write!(f, "REMUX"),
            Quality::FullDisc => write!(f, "Full Disc"),
            Quality::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "cam" | "camrip" | "hdcam" => Ok(Quality::Cam),
            "ts" | "telesync" | "hdts" => Ok(Quality::Telesync),
            "dvdrip" | "dvd" | "dvdr" => Ok(Quality::DvdRip),
            "hdtv" | "pdtv" | "sdtv" => Ok(Quality::Hdtv),
            "webrip" | "web" => Ok(Quality::WebRip),
            "webdl" => Ok(Quality::WebDl),
            "encode" | "blurayencode" | "bluray" | "bdrip" | "brrip" => Ok(Quality::Encode),
            "remux" => Ok(Quality::Remux),
            "fulldisc" | "disc" | "bdmv" => Ok(Quality::FullDisc),
            "unknown" | "" => Ok(Quality::Unknown),
            _ => Err(ParseError(format!("invalid quality: {}", s))),
        }
    }
}

/// An ordered list of quality tiers, lowest first.
///
/// Qualities missing from the ladder are treated like `Unknown` when
/// compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Quality>", into = "Vec<Quality>")]
pub struct QualityLadder {
    order: Vec<Quality>,
}

impl QualityLadder {
    /// Build a ladder, rejecting `Unknown` and repeated entries.
    pub fn new(order: Vec<Quality>) -> Result<Self, ParseError> {
        if order.is_empty() {
            return Err(ParseError("quality ladder is empty".to_string()));
        }
        for (i, q) in order.iter().enumerate() {
            if !q.is_known() {
                return Err(ParseError("quality ladder cannot rank 'unknown'".to_string()));
            }
            if order[..i].contains(q) {
                return Err(ParseError(format!("quality ladder lists '{}' twice", q)));
            }
        }
        Ok(Self { order })
    }

    pub fn rank(&self, quality: Quality) -> Option<usize> {
        self.order.iter().position(|q| *q == quality)
    }

    /// Rank on a half-step scale. An HQ WEBRip sits just above encodes,
    /// below whatever follows them; without `Encode` on the ladder it keeps
    /// its plain WEBRip rank.
    fn release_rank(&self, release: &ReleaseTier) -> Option<usize> {
        let rank = self.rank(release.quality)? * 2;
        if release.hq_webrip && release.quality == Quality::WebRip {
            if let Some(encode) = self.rank(Quality::Encode) {
                return Some(rank.max(encode * 2 + 1));
            }
        }
        Some(rank)
    }

    pub fn compare(&self, a: Quality, b: Quality) -> Comparison {
        Comparison::from_ranks(self.rank(a), self.rank(b))
    }

    /// Compare two releases across both dimensions.
    ///
    /// `Equal` only when both dimensions match, `Higher` when `a` regresses
    /// in neither dimension and improves in at least one, `Incomparable`
    /// when any side is unknown. Every other case, including trade-offs
    /// such as more pixels from a worse source, is `Lower`: `a` is not
    /// better than `b`.
    pub fn compare_release(&self, a: &ReleaseTier, b: &ReleaseTier) -> Comparison {
        let res = a.resolution.compare(b.resolution);
        let quality = Comparison::from_ranks(self.release_rank(a), self.release_rank(b));
        match (res, quality) {
            (Comparison::Incomparable, _) | (_, Comparison::Incomparable) => {
                Comparison::Incomparable
            }
            (Comparison::Equal, Comparison::Equal) => Comparison::Equal,
            (r, q) if r.is_at_least() && q.is_at_least() => Comparison::Higher,
            _ => Comparison::Lower,
        }
    }

    pub fn tiers(&self) -> &[Quality] {
        &self.order
    }
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self {
            order: vec![
                Quality::Cam,
                Quality::Telesync,
                Quality::DvdRip,
                Quality::Hdtv,
                Quality::WebRip,
                Quality::WebDl,
                Quality::Encode,
                Quality::Remux,
                Quality::FullDisc,
            ],
        }
    }
}

impl TryFrom<Vec<Quality>> for QualityLadder {
    type Error = ParseError;

    fn try_from(order: Vec<Quality>) -> Result<Self, Self::Error> {
        Self::new(order)
    }
}

impl From<QualityLadder> for Vec<Quality> {
    fn from(ladder: QualityLadder) -> Self {
        ladder.order
    }
}

/// A (resolution, quality) pair, the unit trackers report releases in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReleaseTier {
    pub resolution: Resolution,
    pub quality: Quality,
    /// A WEBRip from a group known for high-quality WEBRips.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hq_webrip: bool,
}

impl ReleaseTier {
    pub fn new(resolution: Resolution, quality: Quality) -> Self {
        Self {
            resolution,
            quality,
            hq_webrip: false,
        }
    }

    /// Mark the release as an HQ WEBRip. Has no effect on other qualities.
    pub fn with_hq_webrip(mut self, hq: bool) -> Self {
        self.hq_webrip = hq && self.quality == Quality::WebRip;
        self
    }

    pub fn is_known(&self) -> bool {
        self.resolution.is_known() && self.quality.is_known()
    }
}

impl fmt::Display for ReleaseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resolution, self.quality)?;
        if self.hq_webrip {
            f.write_str(" (HQ)")?;
        }
        Ok(())
    }
}

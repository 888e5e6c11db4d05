//! Build version parsing, comparison, stability and range matching.
//!
//! Builds use Maven-style ordering rather than semver:
//! - Segments are split on `.`, `-` and on digit/letter transitions
//!   (`Beta1` is `beta`, `1`)
//! - Numeric segments compare as numbers
//! - Qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (final) < `sp`
//!
//! The qualifier of a build is also its [`Stability`], which is what a
//! channel frequency filters on.

use std::cmp::Ordering;
use std::fmt;

/// A parsed build version with comparable segments.
#[derive(Debug, Clone)]
pub struct BuildVersion {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for BuildVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BuildVersion {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(Stability),
    Text(String),
}

/// Release stability of a build, from least to most stable.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Stability {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Final,
    Sp,
}

impl Stability {
    /// Parse a frequency name such as `beta` or `final`.
    pub fn parse(name: &str) -> Option<Self> {
        match classify(name) {
            Segment::Qualifier(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Milestone => "milestone",
            Self::Rc => "rc",
            Self::Snapshot => "snapshot",
            Self::Final => "final",
            Self::Sp => "sp",
        };
        f.write_str(name)
    }
}

impl BuildVersion {
    pub fn parse(version: &str) -> Self {
        let segments = parse_segments(version);
        Self {
            original: version.to_string(),
            segments,
        }
    }

    /// The stability named by the last qualifier; unqualified builds are final.
    pub fn stability(&self) -> Stability {
        self.segments
            .iter()
            .rev()
            .find_map(|s| match s {
                Segment::Qualifier(q) => Some(*q),
                _ => None,
            })
            .unwrap_or(Stability::Final)
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for BuildVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ord = compare_segments(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for BuildVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&Stability::Final),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= Stability::Final {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= Stability::Final {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            if !current.is_empty() {
                segments.push(classify(&current));
                current.clear();
            }
            continue;
        }
        let transition = current
            .chars()
            .last()
            .is_some_and(|prev| prev.is_ascii_digit() != ch.is_ascii_digit());
        if transition {
            segments.push(classify(&current));
            current.clear();
        }
        current.push(ch);
    }
    if !current.is_empty() {
        segments.push(classify(&current));
    }

    segments
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(Stability::Alpha),
        "beta" | "b" => Segment::Qualifier(Stability::Beta),
        "milestone" | "m" => Segment::Qualifier(Stability::Milestone),
        "rc" | "cr" => Segment::Qualifier(Stability::Rc),
        "snapshot" => Segment::Qualifier(Stability::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(Stability::Final),
        "sp" => Segment::Qualifier(Stability::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// A Maven-style version range expression bounding the builds of a channel.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: BuildVersion,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a range string.
    ///
    /// Returns `None` for bare versions (not a range).
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if !(s.starts_with('[') || s.starts_with('(')) || !(s.ends_with(']') || s.ends_with(')'))
        {
            return None;
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let bound = |text: &str, inclusive: bool| {
                let text = text.trim();
                (!text.is_empty()).then(|| Bound {
                    version: BuildVersion::parse(text),
                    inclusive,
                })
            };
            Some(VersionRange {
                lower: bound(lower, open_inclusive),
                upper: bound(upper, close_inclusive),
            })
        } else {
            // [1.0] means exactly 1.0
            let v = BuildVersion::parse(inner.trim());
            Some(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            })
        }
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &BuildVersion) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}

//! Semantic versions for block schemas.
//!
//! Block instances carry their schema version as text. Ordering must follow
//! semver precedence (`1.10.0 > 1.9.0`), never string comparison, so every
//! comparison in the migration engine goes through [`SemVer`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VersionError;

/// A single pre-release identifier.
///
/// Variant order matters: numeric identifiers have lower precedence than
/// alphanumeric ones, which the derived `Ord` gives us for free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prerelease {
    Numeric(u64),
    Alpha(String),
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prerelease::Numeric(n) => write!(f, "{}", n),
            Prerelease::Alpha(s) => f.write_str(s),
        }
    }
}

/// A `major.minor.patch[-pre][+build]` version.
///
/// Build metadata is preserved for display but ignored by equality,
/// hashing and ordering.
#[derive(Debug, Clone)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<Prerelease>,
    pub build: Option<String>,
}

impl SemVer {
    /// `0.0.0`, the version assumed for blocks with no usable version.
    pub const ZERO: SemVer = SemVer::new(0, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: None,
        }
    }

    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    /// Whether `input` is a syntactically valid semantic version.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl PartialEq for SemVer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemVer {}

impl Hash for SemVer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre.hash(state);
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // A release outranks any of its pre-releases.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            f.write_str("-")?;
            for (i, ident) in self.pre.iter().enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{}", ident)?;
            }
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(VersionError::Empty);
        }
        let malformed = |reason: &str| VersionError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => {
                if !build.split('.').all(is_identifier) {
                    return Err(malformed("invalid build metadata"));
                }
                (rest, Some(build.to_string()))
            }
            None => (input, None),
        };

        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let major = parse_numeric(parts.next(), "major").map_err(|r| malformed(&r))?;
        let minor = parse_numeric(parts.next(), "minor").map_err(|r| malformed(&r))?;
        let patch = parse_numeric(parts.next(), "patch").map_err(|r| malformed(&r))?;
        if parts.next().is_some() {
            return Err(malformed("expected exactly three numeric components"));
        }

        let pre = match pre {
            Some(pre) => pre
                .split('.')
                .map(|ident| parse_prerelease(ident).ok_or_else(|| malformed("invalid pre-release identifier")))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }
}

fn is_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn parse_numeric(part: Option<&str>, name: &str) -> Result<u64, String> {
    let part = part.ok_or_else(|| format!("{} component missing", name))?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{} is not a number", name));
    }
    if part.len() > 1 && part.starts_with('0') {
        return Err(format!("{} has a leading zero", name));
    }
    part.parse::<u64>()
        .map_err(|_| format!("{} is out of range", name))
}

fn parse_prerelease(ident: &str) -> Option<Prerelease> {
    if !is_identifier(ident) {
        return None;
    }
    if ident.bytes().all(|b| b.is_ascii_digit()) {
        if ident.len() > 1 && ident.starts_with('0') {
            return None;
        }
        return ident.parse().ok().map(Prerelease::Numeric);
    }
    Some(Prerelease::Alpha(ident.to_string()))
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

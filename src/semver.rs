//! Semantic version parsing, formatting and ordering.
//!
//! Implements the canonical grammar and precedence rules from
//! <https://semver.org>. Parsing is strict: anything that does not match
//! the grammar fails with [`Error::Format`] carrying the offending string,
//! and `to_string` is the exact inverse of `parse`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

lazy_static! {
    // Canonical SemVer grammar from semver.org.
    static ref SEMVER_RE: Regex = Regex::new(
        r"^(?P<major>0|[1-9]\d*)\.(?P<minor>0|[1-9]\d*)\.(?P<patch>0|[1-9]\d*)(?:-(?P<prerelease>(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+(?P<buildmetadata>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$"
    )
    .expect("semver regex is valid");
}

/// A semantic version: `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemVer {
    major: u64,
    minor: u64,
    patch: u64,
    /// Dot-separated prerelease identifiers, e.g. `["rc", "1"]` for `-rc.1`.
    prerelease: Vec<String>,
    /// Dot-separated build metadata identifiers; no precedence.
    buildmetadata: Vec<String>,
}

impl SemVer {
    /// Create a release version without prerelease or build metadata.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            buildmetadata: Vec::new(),
        }
    }

    /// Parse a version string against the canonical grammar.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = SEMVER_RE
            .captures(s)
            .ok_or_else(|| Error::Format(s.to_string()))?;

        // The grammar guarantees these parse; overflow is the only failure.
        let number = |name: &str| -> Result<u64> {
            caps.name(name)
                .map(|m| m.as_str())
                .unwrap_or("0")
                .parse()
                .map_err(|_| Error::Format(s.to_string()))
        };

        let identifiers = |name: &str| -> Vec<String> {
            caps.name(name)
                .map(|m| m.as_str().split('.').map(str::to_string).collect())
                .unwrap_or_default()
        };

        Ok(Self {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            prerelease: identifiers("prerelease"),
            buildmetadata: identifiers("buildmetadata"),
        })
    }

    /// Replace the prerelease identifiers, validating each one.
    pub fn with_prerelease(mut self, prerelease: &str) -> Result<Self> {
        let candidate = format!("{}.{}.{}-{}", self.major, self.minor, self.patch, prerelease);
        let parsed = Self::parse(&candidate)?;
        self.prerelease = parsed.prerelease;
        Ok(self)
    }

    /// Replace the build metadata identifiers, validating each one.
    pub fn with_build(mut self, buildmetadata: &str) -> Result<Self> {
        let candidate = format!(
            "{}.{}.{}+{}",
            self.major, self.minor, self.patch, buildmetadata
        );
        let parsed = Self::parse(&candidate)?;
        self.buildmetadata = parsed.buildmetadata;
        Ok(self)
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> &[String] {
        &self.prerelease
    }

    pub fn buildmetadata(&self) -> &[String] {
        &self.buildmetadata
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Precedence comparison per semver.org §11.
    ///
    /// Build metadata never influences precedence; two versions differing
    /// only in build metadata compare equal here.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }
}

/// Compare prerelease identifier sequences per semver.org.
///
/// A version without prerelease outranks one with; numeric identifiers
/// compare numerically and rank below alphanumeric ones; a shorter
/// sequence that is a prefix of a longer one ranks lower.
fn compare_prerelease(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(n), Ok(m)) => n.cmp(&m),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    a.len().cmp(&b.len())
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Build metadata carries no precedence; it participates as a final
        // tie-break only so that Ord stays consistent with Eq.
        self.precedence(other)
            .then_with(|| self.buildmetadata.cmp(&other.buildmetadata))
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease.join("."))?;
        }
        if !self.buildmetadata.is_empty() {
            write!(f, "+{}", self.buildmetadata.join("."))?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SemVer {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<SemVer> for String {
    fn from(v: SemVer) -> Self {
        v.to_string()
    }
}

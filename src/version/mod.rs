// src/version/mod.rs

//! Version handling and relation checks for Debian packages
//!
//! Versions follow the `[epoch:]upstream[-revision]` layout. Comparison uses
//! the dpkg ordering: numeric epoch first, then the upstream part and the
//! revision, each compared as alternating non-digit and digit runs. In the
//! non-digit runs `~` sorts before anything (even the end of the string) and
//! letters sort before every other character.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed Debian version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a version string strictly
    ///
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=2, upstream="1.2.3", revision=None
    /// - "1.2-3-4ubuntu1" → epoch=0, upstream="1.2-3", revision=Some("4ubuntu1")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => {
                let epoch = e
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidVersion(s.to_string()))?;
                (epoch, r)
            }
            None => (0, s),
        };

        // The revision starts after the last hyphen
        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };

        if upstream.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        Ok(Self {
            epoch,
            upstream,
            revision,
        })
    }

    /// Split a version without validation, used to keep `compare` total
    fn lenient(s: &str) -> Self {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) if e.chars().all(|c| c.is_ascii_digit()) => {
                (e.parse::<u64>().unwrap_or(0), r)
            }
            _ => (0, s),
        };
        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };
        Self {
            epoch,
            upstream,
            revision,
        }
    }

    /// Compare two versions using dpkg rules
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| {
                verrevcmp(
                    self.revision.as_deref().unwrap_or(""),
                    other.revision.as_deref().unwrap_or(""),
                )
            })
    }
}

impl FromStr for DebVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort weight of one character in a non-digit run
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);
    let digit_at = |s: &[u8], k: usize| s.get(k).is_some_and(|c| c.is_ascii_digit());

    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while digit_at(a, i) && digit_at(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        // A longer digit run is the larger number
        if digit_at(a, i) {
            return Ordering::Greater;
        }
        if digit_at(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

/// Compare two version strings
///
/// Never fails: strings that do not parse are split leniently so the result
/// is still a total order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let va = DebVersion::parse(a).unwrap_or_else(|_| DebVersion::lenient(a));
    let vb = DebVersion::parse(b).unwrap_or_else(|_| DebVersion::lenient(b));
    va.compare(&vb)
}

/// Relation operators used in Depends/Conflicts/Replaces fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersionOperator {
    /// No version restriction
    #[default]
    #[serde(rename = "")]
    Any,
    #[serde(rename = "<<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">>")]
    GreaterThan,
}

impl VersionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            VersionOperator::Any => "",
            VersionOperator::LessThan => "<<",
            VersionOperator::LessOrEqual => "<=",
            VersionOperator::Equal => "=",
            VersionOperator::GreaterOrEqual => ">=",
            VersionOperator::GreaterThan => ">>",
        }
    }

    /// Check whether `version` stands in this relation to `reference`
    ///
    /// `Any` holds for every version. A missing reference only satisfies `Any`.
    pub fn satisfied_by(&self, version: &str, reference: Option<&str>) -> bool {
        let reference = match (self, reference) {
            (VersionOperator::Any, _) => return true,
            (_, Some(r)) => r,
            (_, None) => return false,
        };

        let ord = compare_versions(version, reference);
        match self {
            VersionOperator::Any => true,
            VersionOperator::LessThan => ord == Ordering::Less,
            VersionOperator::LessOrEqual => ord != Ordering::Greater,
            VersionOperator::Equal => ord == Ordering::Equal,
            VersionOperator::GreaterOrEqual => ord != Ordering::Less,
            VersionOperator::GreaterThan => ord == Ordering::Greater,
        }
    }
}

impl FromStr for VersionOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Ok(VersionOperator::Any),
            "<<" => Ok(VersionOperator::LessThan),
            // "<" and ">" are the obsolete spellings of "<=" and ">="
            "<=" | "<" => Ok(VersionOperator::LessOrEqual),
            "=" => Ok(VersionOperator::Equal),
            ">=" | ">" => Ok(VersionOperator::GreaterOrEqual),
            ">>" => Ok(VersionOperator::GreaterThan),
            other => Err(Error::ParseError(format!(
                "Invalid relation operator: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for VersionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a local package version relates to a tracked version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Nothing to compare against
    None,
    /// The tracked version is newer
    Outdated,
    Same,
    /// The local package is newer
    Newer,
}

/// Classify `candidate` against an optional reference version
pub fn classify(candidate: &str, reference: Option<&str>) -> VersionStatus {
    match reference {
        None => VersionStatus::None,
        Some(reference) => match compare_versions(reference, candidate) {
            Ordering::Equal => VersionStatus::Same,
            Ordering::Less => VersionStatus::Newer,
            Ordering::Greater => VersionStatus::Outdated,
        },
    }
}

// src/packages/source.rs

//! Debian source package descriptions (.dsc)
//!
//! A `.dsc` is a single control stanza, usually wrapped in an OpenPGP
//! clear signature. Only the build relations matter for installability:
//! Build-Depends must be installable and installed packages matching
//! Build-Conflicts have to go.

use crate::error::{Error, Result};
use crate::packages::candidate::Candidate;
use crate::packages::relations::{OrGroup, parse_relations};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Architecture recorded on the candidate built from a source package
pub const SOURCE_ARCH: &str = "source";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DscStanza {
    source: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    binary: Option<String>,
    #[serde(rename = "Build-Depends", default)]
    build_depends: Option<String>,
    #[serde(rename = "Build-Depends-Indep", default)]
    build_depends_indep: Option<String>,
    #[serde(rename = "Build-Depends-Arch", default)]
    build_depends_arch: Option<String>,
    #[serde(rename = "Build-Conflicts", default)]
    build_conflicts: Option<String>,
    #[serde(rename = "Build-Conflicts-Indep", default)]
    build_conflicts_indep: Option<String>,
    #[serde(rename = "Build-Conflicts-Arch", default)]
    build_conflicts_arch: Option<String>,
}

/// Build relations of a source package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePackage {
    pub name: String,
    pub version: String,
    /// Binary packages the source builds
    pub binaries: Vec<String>,
    /// Build-Depends, then -Arch, then -Indep
    pub build_depends: Vec<OrGroup>,
    pub build_conflicts: Vec<OrGroup>,
}

impl SourcePackage {
    /// Parse the text of a `.dsc`, signed or not
    pub fn from_dsc(content: &str) -> Result<Self> {
        let body = strip_signature(content);
        let stanza: DscStanza = rfc822_like::from_str::<Vec<DscStanza>>(&body)
            .map_err(|e| Error::ParseError(format!("Failed to parse source control: {}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ParseError("Source control contains no stanza".to_string()))?;

        let version = stanza.version.ok_or_else(|| {
            Error::ParseError(format!("Source {} has no Version field", stanza.source))
        })?;

        let mut build_depends = Vec::new();
        for value in [
            &stanza.build_depends,
            &stanza.build_depends_arch,
            &stanza.build_depends_indep,
        ]
        .into_iter()
        .flatten()
        {
            build_depends.extend(parse_relations(value)?);
        }

        let mut build_conflicts = Vec::new();
        for value in [
            &stanza.build_conflicts,
            &stanza.build_conflicts_arch,
            &stanza.build_conflicts_indep,
        ]
        .into_iter()
        .flatten()
        {
            build_conflicts.extend(parse_relations(value)?);
        }

        let binaries = stanza
            .binary
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: stanza.source,
            version,
            binaries,
            build_depends,
            build_conflicts,
        })
    }

    /// Read a `.dsc` file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = Self::from_dsc(&fs::read_to_string(path)?)?;
        debug!(
            "Read source {} {} from {}: {} build-depends, {} build-conflicts",
            source.name,
            source.version,
            path.display(),
            source.build_depends.len(),
            source.build_conflicts.len()
        );
        Ok(source)
    }

    /// Candidate standing in for the build environment
    ///
    /// Named `src:<name>` so it can never be mistaken for one of the
    /// binaries in the catalog.
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(&format!("src:{}", self.name), &self.version, SOURCE_ARCH)
            .with_depends(self.build_depends.clone())
            .with_conflicts(self.build_conflicts.clone())
    }
}

/// Body of an OpenPGP clear-signed message, or `content` unchanged
fn strip_signature(content: &str) -> String {
    let content = content.trim_start();
    let signed = content.starts_with("-----BEGIN PGP SIGNED MESSAGE-----");
    let mut lines = content.lines();

    if signed {
        // Armor headers end at the first blank line
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
        }
    }

    let mut body = String::with_capacity(content.len());
    for line in lines {
        if line.starts_with("-----BEGIN PGP SIGNATURE-") {
            break;
        }
        let line = if signed {
            line.strip_prefix("- ").unwrap_or(line)
        } else {
            line
        };
        body.push_str(line);
        body.push('\n');
    }
    body
}

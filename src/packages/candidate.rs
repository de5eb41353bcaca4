// src/packages/candidate.rs

//! The package under evaluation and package identities

use crate::error::{Error, Result};
use crate::packages::control::{ControlStanza, parse_control};
use crate::packages::deb;
use crate::packages::relations::OrGroup;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Identity of a package known to a database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    pub version: Option<String>,
    pub architecture: Option<String>,
}

impl PackageRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            architecture: None,
        }
    }

    pub fn with_version(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version.to_string()),
            architecture: None,
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref version) = self.version {
            write!(f, " {}", version)?;
        }
        if let Some(ref arch) = self.architecture {
            write!(f, " [{}]", arch)?;
        }
        Ok(())
    }
}

/// A local package considered for installation
///
/// `depends` holds Pre-Depends followed by Depends, both in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub version: String,
    pub architecture: String,
    #[serde(default)]
    pub depends: Vec<OrGroup>,
    #[serde(default)]
    pub conflicts: Vec<OrGroup>,
    #[serde(default)]
    pub provides: Vec<OrGroup>,
    #[serde(default)]
    pub replaces: Vec<OrGroup>,
}

impl Candidate {
    /// Create a candidate with no relations
    pub fn new(name: &str, version: &str, architecture: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            architecture: architecture.to_string(),
            depends: Vec::new(),
            conflicts: Vec::new(),
            provides: Vec::new(),
            replaces: Vec::new(),
        }
    }

    pub fn with_depends(mut self, depends: Vec<OrGroup>) -> Self {
        self.depends = depends;
        self
    }

    pub fn with_conflicts(mut self, conflicts: Vec<OrGroup>) -> Self {
        self.conflicts = conflicts;
        self
    }

    pub fn with_provides(mut self, provides: Vec<OrGroup>) -> Self {
        self.provides = provides;
        self
    }

    pub fn with_replaces(mut self, replaces: Vec<OrGroup>) -> Self {
        self.replaces = replaces;
        self
    }

    /// Build a candidate from an already parsed control stanza
    pub fn from_stanza(stanza: &ControlStanza) -> Result<Self> {
        let version = stanza.version.clone().ok_or_else(|| {
            Error::ParseError(format!("Package {} has no Version field", stanza.package))
        })?;
        let architecture = stanza.architecture.clone().ok_or_else(|| {
            Error::ParseError(format!(
                "Package {} has no Architecture field",
                stanza.package
            ))
        })?;

        Ok(Self {
            name: stanza.package.clone(),
            version,
            architecture,
            depends: stanza.merged_depends()?,
            conflicts: stanza.conflicts()?,
            provides: stanza.provides()?,
            replaces: stanza.replaces()?,
        })
    }

    /// Build a candidate from the text of a control file
    pub fn from_control(content: &str) -> Result<Self> {
        Self::from_stanza(&parse_control(content)?)
    }

    /// Build a candidate from a `.deb` archive on disk
    pub fn from_deb(path: &Path) -> Result<Self> {
        let control = deb::read_control(path)?;
        let candidate = Self::from_control(&control)?;
        debug!(
            "Read candidate {} {} ({}) from {}: {} depends, {} conflicts",
            candidate.name,
            candidate.version,
            candidate.architecture,
            path.display(),
            candidate.depends.len(),
            candidate.conflicts.len()
        );
        Ok(candidate)
    }

    pub fn package_ref(&self) -> PackageRef {
        PackageRef {
            name: self.name.clone(),
            version: Some(self.version.clone()),
            architecture: Some(self.architecture.clone()),
        }
    }
}

// src/packages/control.rs

//! Debian control stanzas
//!
//! The same RFC 822-like layout is used by a `.deb` control file, the dpkg
//! `status` database and APT `Packages` indices, so a single stanza type
//! covers all three.

use crate::error::{Error, Result};
use crate::packages::relations::{OrGroup, parse_relations};
use serde::Deserialize;

/// One control stanza, restricted to the fields installability analysis needs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlStanza {
    pub package: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub depends: Option<String>,
    #[serde(rename = "Pre-Depends", default)]
    pub pre_depends: Option<String>,
    #[serde(default)]
    pub conflicts: Option<String>,
    #[serde(default)]
    pub provides: Option<String>,
    #[serde(default)]
    pub replaces: Option<String>,
    /// dpkg status triple, e.g. "install ok installed"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub essential: Option<String>,
}

impl ControlStanza {
    /// Pre-Depends followed by Depends, in field order
    pub fn merged_depends(&self) -> Result<Vec<OrGroup>> {
        let mut groups = relation_field(self.pre_depends.as_deref())?;
        groups.extend(relation_field(self.depends.as_deref())?);
        Ok(groups)
    }

    pub fn conflicts(&self) -> Result<Vec<OrGroup>> {
        relation_field(self.conflicts.as_deref())
    }

    pub fn provides(&self) -> Result<Vec<OrGroup>> {
        relation_field(self.provides.as_deref())
    }

    pub fn replaces(&self) -> Result<Vec<OrGroup>> {
        relation_field(self.replaces.as_deref())
    }

    /// Whether dpkg reports the package as installed
    pub fn is_installed(&self) -> bool {
        self.status
            .as_deref()
            .and_then(|s| s.split_whitespace().last())
            .is_some_and(|state| state == "installed")
    }

    pub fn is_essential(&self) -> bool {
        self.essential
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case("yes"))
    }
}

fn relation_field(field: Option<&str>) -> Result<Vec<OrGroup>> {
    match field {
        Some(value) => parse_relations(value),
        None => Ok(Vec::new()),
    }
}

/// Parse every stanza of an index or status file
pub fn parse_stanzas(content: &str) -> Result<Vec<ControlStanza>> {
    rfc822_like::from_str(content)
        .map_err(|e| Error::ParseError(format!("Failed to parse control data: {}", e)))
}

/// Parse a control file holding exactly one package
pub fn parse_control(content: &str) -> Result<ControlStanza> {
    parse_stanzas(content)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::ParseError("Control file contains no stanza".to_string()))
}

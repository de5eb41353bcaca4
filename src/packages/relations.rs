// src/packages/relations.rs

//! Relation fields (Depends, Pre-Depends, Conflicts, Provides, Replaces)
//!
//! A relation field is a comma separated list of OR-groups, each group a
//! `|` separated list of alternatives such as `libc6 (>= 2.34)`.

use crate::error::{Error, Result};
use crate::version::VersionOperator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One alternative inside an OR-group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    #[serde(default)]
    pub operator: VersionOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Alternative {
    /// An alternative without a version restriction
    pub fn any(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operator: VersionOperator::Any,
            version: None,
        }
    }

    /// An alternative restricted by `operator version`
    pub fn versioned(name: &str, operator: VersionOperator, version: &str) -> Self {
        Self {
            name: name.to_string(),
            operator,
            version: Some(version.to_string()),
        }
    }

    /// Check `version` against this alternative's restriction
    pub fn accepts(&self, version: &str) -> bool {
        self.operator.satisfied_by(version, self.version.as_deref())
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.operator, &self.version) {
            (VersionOperator::Any, _) | (_, None) => write!(f, "{}", self.name),
            (op, Some(v)) => write!(f, "{} ({} {})", self.name, op, v),
        }
    }
}

/// A dependency clause satisfied by any one of its alternatives
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrGroup(pub Vec<Alternative>);

impl OrGroup {
    pub fn new(alternatives: Vec<Alternative>) -> Self {
        Self(alternatives)
    }

    /// Group with a single alternative
    pub fn single(alternative: Alternative) -> Self {
        Self(vec![alternative])
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names joined with `|`, as used in failure messages
    pub fn names(&self) -> String {
        self.0
            .iter()
            .map(|alt| alt.name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for OrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|alt| alt.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// Parse a whole relation field into OR-groups
///
/// Architecture qualifiers (`:any`), architecture restrictions (`[amd64]`)
/// and build profiles (`<!nocheck>`) are dropped.
pub fn parse_relations(field: &str) -> Result<Vec<OrGroup>> {
    let mut groups = Vec::new();

    for group in field.split(',') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }

        let alternatives = group
            .split('|')
            .map(parse_alternative)
            .collect::<Result<Vec<_>>>()?;
        groups.push(OrGroup(alternatives));
    }

    Ok(groups)
}

/// Parse a single alternative: `name[:arch] [(op version)] [[archs]] [<profiles>]`
fn parse_alternative(alt: &str) -> Result<Alternative> {
    let alt = strip_bracketed(alt.trim(), '[', ']');
    let alt = strip_bracketed(&alt, '<', '>');
    let alt = alt.trim();

    let (name_part, constraint) = match alt.find('(') {
        Some(open) => {
            let close = alt[open..].find(')').ok_or_else(|| {
                Error::ParseError(format!("Unclosed version restriction in '{}'", alt))
            })?;
            (&alt[..open], Some(&alt[open + 1..open + close]))
        }
        None => (alt, None),
    };

    let name = name_part
        .trim()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_string();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::ParseError(format!("Invalid package name in '{}'", alt)));
    }

    let Some(constraint) = constraint else {
        return Ok(Alternative {
            name,
            operator: VersionOperator::Any,
            version: None,
        });
    };

    let constraint = constraint.trim();
    let split_at = constraint
        .find(|c: char| !matches!(c, '<' | '>' | '='))
        .unwrap_or(constraint.len());
    let (op, version) = constraint.split_at(split_at);
    let version = version.trim();

    if op.is_empty() || version.is_empty() {
        return Err(Error::ParseError(format!(
            "Invalid version restriction '({})'",
            constraint
        )));
    }

    Ok(Alternative {
        name,
        operator: op.parse()?,
        version: Some(version.to_string()),
    })
}

/// Remove every `open ... close` section from `s`, leaving `( ... )` intact
fn strip_bracketed(s: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    let mut in_parens = false;
    for c in s.chars() {
        if in_parens {
            in_parens = c != ')';
            out.push(c);
        } else if c == open {
            depth += 1;
        } else if c == close && depth > 0 {
            depth -= 1;
        } else if depth == 0 {
            in_parens = c == '(';
            out.push(c);
        }
    }
    out
}

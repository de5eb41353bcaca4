// src/repository/mod.rs

//! Importing package indices into the catalog
//!
//! This module fills the `packages` and `provides` tables from:
//! - the dpkg `status` file (installed packages)
//! - APT `Packages` indices (installation candidates)

mod index;

pub use index::{IndexKind, read_index};

use crate::db::models::{PackageRecord, ProvideEntry};
use crate::error::Result;
use crate::packages::control::{ControlStanza, parse_stanzas};
use crate::version::compare_versions;
use rusqlite::Connection;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Counts from one index import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Stanzas read from the index
    pub stanzas: usize,
    /// Packages recorded as installed
    pub installed: usize,
    /// Packages whose candidate version was set or raised
    pub candidates: usize,
    pub provides: usize,
    /// Stanzas ignored: not installed, older than the known candidate, or
    /// without a version
    pub skipped: usize,
}

/// Options for importing a Packages index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Whether the index comes from an authenticated origin
    pub trusted: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { trusted: true }
    }
}

/// Import an index into the catalog in one transaction
pub fn import_index(
    conn: &mut Connection,
    content: &str,
    kind: IndexKind,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let stanzas = parse_stanzas(content)?;
    debug!("Parsed {} {} stanzas", stanzas.len(), kind.as_str());

    let summary = crate::db::transaction(conn, |tx| {
        let mut summary = ImportSummary {
            stanzas: stanzas.len(),
            ..Default::default()
        };
        for stanza in &stanzas {
            match kind {
                IndexKind::Status => import_status_entry(tx, stanza, &mut summary)?,
                IndexKind::Packages => import_packages_entry(tx, stanza, options, &mut summary)?,
            }
        }
        Ok(summary)
    })?;

    info!(
        "Imported {} index: {} installed, {} candidates, {} provides, {} skipped",
        kind.as_str(),
        summary.installed,
        summary.candidates,
        summary.provides,
        summary.skipped
    );
    Ok(summary)
}

fn import_status_entry(
    conn: &Connection,
    stanza: &ControlStanza,
    summary: &mut ImportSummary,
) -> Result<()> {
    let Some(version) = stanza.version.as_deref() else {
        summary.skipped += 1;
        return Ok(());
    };
    if !stanza.is_installed() {
        debug!("Skipping {}: not installed", stanza.package);
        summary.skipped += 1;
        return Ok(());
    }

    let mut record = PackageRecord::find_by_name(conn, &stanza.package)?
        .unwrap_or_else(|| PackageRecord::new(&stanza.package));
    record.installed_version = Some(version.to_string());
    record.essential = stanza.is_essential();
    if record.architecture.is_none() {
        record.architecture = stanza.architecture.clone();
    }

    // An installed package is its own candidate unless a newer one is known
    let newer_known = record
        .candidate_version
        .as_deref()
        .is_some_and(|candidate| compare_versions(candidate, version) == Ordering::Greater);
    if !newer_known {
        record.candidate_version = Some(version.to_string());
        record.depends = stanza.merged_depends()?;
    }

    record.upsert(conn)?;
    summary.installed += 1;
    summary.provides += import_provides(conn, stanza)?;
    Ok(())
}

fn import_packages_entry(
    conn: &Connection,
    stanza: &ControlStanza,
    options: ImportOptions,
    summary: &mut ImportSummary,
) -> Result<()> {
    let Some(version) = stanza.version.as_deref() else {
        warn!("Skipping {}: no Version field", stanza.package);
        summary.skipped += 1;
        return Ok(());
    };

    let mut record = PackageRecord::find_by_name(conn, &stanza.package)?
        .unwrap_or_else(|| PackageRecord::new(&stanza.package));

    if let Some(existing) = record.candidate_version.as_deref()
        && compare_versions(existing, version) == Ordering::Greater
    {
        debug!(
            "Keeping {} {} over older {}",
            stanza.package, existing, version
        );
        summary.skipped += 1;
        return Ok(());
    }

    record.candidate_version = Some(version.to_string());
    record.architecture = stanza.architecture.clone().or(record.architecture);
    record.depends = stanza.merged_depends()?;
    record.trusted = options.trusted;
    record.upsert(conn)?;

    summary.candidates += 1;
    summary.provides += import_provides(conn, stanza)?;
    Ok(())
}

fn import_provides(conn: &Connection, stanza: &ControlStanza) -> Result<usize> {
    let mut count = 0;
    for group in stanza.provides()? {
        for alt in group.alternatives() {
            ProvideEntry::new(&stanza.package, &alt.name, alt.version.clone())
                .insert_or_ignore(conn)?;
            count += 1;
        }
    }
    Ok(count)
}

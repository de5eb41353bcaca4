// src/db/staging.rs

//! Staging logic shared by the database backends
//!
//! Marking a package stages it together with whatever its own dependencies
//! need, picking the first installable alternative of each unmet group.
//! Groups with no installable alternative are left unmet and show up in
//! `broken_count`. A package marked for removal counts as absent.

use crate::db::models::PackageRecord;
use crate::error::{Error, Result};
use crate::packages::OrGroup;
use tracing::debug;

/// Storage primitives a backend provides to the staging logic
pub(crate) trait Catalog {
    fn record(&self, name: &str) -> Result<Option<PackageRecord>>;

    /// Names of packages providing `capability`
    fn provider_names(&self, capability: &str) -> Result<Vec<String>>;

    fn staged_names(&self) -> Result<Vec<String>>;

    fn is_staged_name(&self, name: &str) -> Result<bool>;

    fn push_staged(&mut self, name: &str) -> Result<()>;

    fn is_removal_name(&self, name: &str) -> Result<bool>;

    fn push_removal(&mut self, name: &str) -> Result<()>;
}

/// Version a package will have once staged marks are committed
fn effective_version<C: Catalog>(catalog: &C, record: &PackageRecord) -> Result<Option<String>> {
    if catalog.is_staged_name(&record.name)? {
        return Ok(record.candidate_version.clone());
    }
    if catalog.is_removal_name(&record.name)? {
        return Ok(None);
    }
    Ok(record.installed_version.clone())
}

/// Whether installed or staged packages satisfy the group
fn group_met<C: Catalog>(catalog: &C, group: &OrGroup) -> Result<bool> {
    for alt in group.alternatives() {
        if let Some(record) = catalog.record(&alt.name)? {
            if let Some(version) = effective_version(catalog, &record)?
                && alt.accepts(&version)
            {
                return Ok(true);
            }
            continue;
        }

        for provider in catalog.provider_names(&alt.name)? {
            if let Some(record) = catalog.record(&provider)?
                && effective_version(catalog, &record)?.is_some()
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// First alternative that could be staged to meet the group
fn pick_alternative<C: Catalog>(catalog: &C, group: &OrGroup) -> Result<Option<String>> {
    for alt in group.alternatives() {
        let name = match catalog.record(&alt.name)? {
            Some(_) => alt.name.clone(),
            None => {
                let providers = catalog.provider_names(&alt.name)?;
                if providers.len() != 1 {
                    continue;
                }
                providers[0].clone()
            }
        };

        let Some(record) = catalog.record(&name)? else {
            continue;
        };
        if record.held {
            continue;
        }
        if let Some(candidate) = &record.candidate_version
            && alt.accepts(candidate)
        {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// Stage `name` and auto-install its unmet dependencies
pub(crate) fn mark_for_install<C: Catalog>(catalog: &mut C, name: &str) -> Result<()> {
    let record = catalog
        .record(name)?
        .ok_or_else(|| Error::StagingFailed(name.to_string()))?;

    if record.held {
        debug!("{} is held, refusing to stage it", name);
        return Err(Error::StagingFailed(name.to_string()));
    }
    let Some(candidate) = record.candidate_version.as_deref() else {
        debug!("{} has no installation candidate", name);
        return Err(Error::StagingFailed(name.to_string()));
    };
    if catalog.is_staged_name(name)? || record.installed_version.as_deref() == Some(candidate) {
        return Ok(());
    }

    catalog.push_staged(name)?;
    debug!("Staged {} {}", name, candidate);

    for group in &record.depends {
        if group_met(catalog, group)? {
            continue;
        }
        match pick_alternative(catalog, group)? {
            Some(dep) => match mark_for_install(catalog, &dep) {
                Ok(()) => {}
                Err(Error::StagingFailed(failed)) => {
                    debug!("{} left with unmet dependency on {}", name, failed);
                }
                Err(e) => return Err(e),
            },
            None => debug!("{} left with unmet dependency {}", name, group),
        }
    }

    Ok(())
}

/// Mark an installed package for removal
pub(crate) fn mark_for_removal<C: Catalog>(catalog: &mut C, name: &str) -> Result<()> {
    let Some(record) = catalog.record(name)?.filter(PackageRecord::is_installed) else {
        debug!("{} is not installed, nothing to remove", name);
        return Err(Error::StagingFailed(name.to_string()));
    };
    if record.held {
        debug!("{} is held, refusing to remove it", name);
        return Err(Error::StagingFailed(name.to_string()));
    }

    catalog.push_removal(name)?;
    debug!("Marked {} for removal", name);
    Ok(())
}

/// Count staged packages with at least one unmet dependency group
pub(crate) fn broken_count<C: Catalog>(catalog: &C) -> Result<usize> {
    let mut broken = 0;
    for name in catalog.staged_names()? {
        let Some(record) = catalog.record(&name)? else {
            broken += 1;
            continue;
        };
        for group in &record.depends {
            if !group_met(catalog, group)? {
                debug!("Staged package {} is broken: needs {}", name, group);
                broken += 1;
                break;
            }
        }
    }
    Ok(broken)
}

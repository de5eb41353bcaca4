// src/resolver/depends.rs

//! Dependency resolution against the package database
//!
//! Each OR-group is either already met by an installed package or resolved
//! to the first alternative whose repository candidate satisfies it. There
//! is no backtracking: the first group that cannot be met ends resolution.

use super::ResolutionState;
use crate::db::PackageDatabase;
use crate::error::{Error, Result};
use crate::packages::{Alternative, Candidate, OrGroup};
use tracing::{debug, warn};

pub struct DependencyResolver<'a, D: PackageDatabase + ?Sized> {
    db: &'a mut D,
    candidate: &'a Candidate,
}

impl<'a, D: PackageDatabase + ?Sized> DependencyResolver<'a, D> {
    pub fn new(db: &'a mut D, candidate: &'a Candidate) -> Self {
        Self { db, candidate }
    }

    /// Installed version of `name`, unless it is marked for removal
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        if self.db.is_marked_for_removal(name)? {
            return Ok(None);
        }
        self.db.installed_version(name)
    }

    /// Whether an installed package already meets one of the alternatives
    pub fn is_or_group_satisfied(&self, group: &OrGroup) -> Result<bool> {
        for alt in group.alternatives() {
            if !self.db.has_package(&alt.name)? {
                if self.db.is_virtual_package(&alt.name)? {
                    for provider in self.db.providers(&alt.name)? {
                        if self.installed_version(&provider.name)?.is_some() {
                            debug!("{} is provided by installed {}", alt.name, provider.name);
                            return Ok(true);
                        }
                    }
                }
                continue;
            }

            if let Some(installed) = self.installed_version(&alt.name)?
                && alt.accepts(&installed)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Concrete package an alternative resolves to
    ///
    /// Virtual names resolve only when exactly one package provides them.
    fn resolve_name(&self, alt: &Alternative) -> Result<Option<String>> {
        if self.db.has_package(&alt.name)? || alt.name == self.candidate.name {
            return Ok(Some(alt.name.clone()));
        }
        if !self.db.is_virtual_package(&alt.name)? {
            return Ok(None);
        }

        let mut providers = self.db.providers(&alt.name)?;
        if providers.len() != 1 {
            debug!(
                "Skipping virtual {}: {} providers",
                alt.name,
                providers.len()
            );
            return Ok(None);
        }
        Ok(providers.pop().map(|provider| provider.name))
    }

    /// Whether the candidate itself meets an alternative naming it
    fn candidate_meets(&self, alt: &Alternative) -> bool {
        if alt.name == self.candidate.name {
            return alt.accepts(&self.candidate.version);
        }
        self.candidate
            .provides
            .iter()
            .flat_map(|group| group.alternatives())
            .any(|provided| provided.name == alt.name)
    }

    /// Pick the first alternative the repositories can satisfy
    ///
    /// The chosen package is added to `state.need_packages`. On failure the
    /// group's names are recorded in `state`.
    pub fn satisfy_or_group(&self, group: &OrGroup, state: &mut ResolutionState) -> Result<bool> {
        for alt in group.alternatives() {
            let Some(name) = self.resolve_name(alt)? else {
                continue;
            };

            if name == self.candidate.name {
                if self.candidate_meets(alt) {
                    debug!("{} is met by the candidate itself", alt);
                    return Ok(true);
                }
                continue;
            }

            let Some(candidate_version) = self.db.candidate_version(&name)? else {
                continue;
            };
            if !alt.accepts(&candidate_version) {
                continue;
            }

            debug!("Need to get: {} {}", name, candidate_version);
            state.need(&name);
            return Ok(true);
        }

        let names = group.names();
        state.fail(format!("Dependency is not satisfiable: {}", names));
        state.unsatisfied = Some(names);
        Ok(false)
    }

    /// Resolve every dependency group in order, staging what is needed
    ///
    /// Stops at the first group that cannot be satisfied or package that
    /// cannot be staged. The caller is responsible for clearing the
    /// database's staged marks when this returns `false`.
    pub fn satisfy_dependencies(
        &mut self,
        groups: &[OrGroup],
        state: &mut ResolutionState,
    ) -> Result<bool> {
        for group in groups {
            state.resolving = Some(group.names());
            if self.is_or_group_satisfied(group)? {
                continue;
            }

            let before = state.need_packages.len();
            if !self.satisfy_or_group(group, state)? {
                return Ok(false);
            }

            for name in state.need_packages[before..].to_vec() {
                if let Err(e) = self.db.mark_for_install(&name) {
                    if !matches!(e, Error::StagingFailed(_)) {
                        warn!("Staging {} failed: {}", name, e);
                    }
                    state.fail(format!("Cannot install '{}'", name));
                    state.staging_failure = Some(name);
                    return Ok(false);
                }
            }
        }
        state.resolving = None;
        Ok(true)
    }
}

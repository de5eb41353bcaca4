// src/resolver/conflict.rs

//! Conflicts between the candidate and installed or needed packages

use super::ResolutionState;
use crate::db::PackageDatabase;
use crate::error::Result;
use crate::packages::{Candidate, OrGroup};
use crate::version::VersionOperator;
use tracing::debug;

/// Checks a candidate's Conflicts field against the database
pub struct ConflictChecker<'a, D: PackageDatabase + ?Sized> {
    db: &'a D,
    candidate: &'a Candidate,
}

impl<'a, D: PackageDatabase + ?Sized> ConflictChecker<'a, D> {
    pub fn new(db: &'a D, candidate: &'a Candidate) -> Self {
        Self { db, candidate }
    }

    /// Version `name` has on the system once needed and staged packages are
    /// installed and removal marks are applied
    fn effective_version(&self, name: &str, state: &ResolutionState) -> Result<Option<String>> {
        if let Some(installed) = self.db.installed_version(name)? {
            if self.db.is_marked_for_removal(name)? {
                return Ok(None);
            }
            return Ok(Some(installed));
        }
        // Staged covers what the database pulled in for the needed packages
        if state.is_needed(name) || self.db.is_staged(name)? {
            return self.db.candidate_version(name);
        }
        Ok(None)
    }

    /// Whether the candidate replaces `name` at `version`
    fn replaces(&self, name: &str, version: &str) -> bool {
        self.candidate
            .replaces
            .iter()
            .flat_map(|group| group.alternatives())
            .any(|alt| alt.name == name && alt.accepts(version))
    }

    /// Whether real package `name` is present at a version matching
    /// `operator version` and is not replaced by the candidate
    pub fn check_single_conflict(
        &self,
        name: &str,
        operator: VersionOperator,
        version: Option<&str>,
        state: &mut ResolutionState,
    ) -> Result<bool> {
        let Some(present) = self.effective_version(name, state)? else {
            return Ok(false);
        };

        if !operator.satisfied_by(&present, version) {
            return Ok(false);
        }
        if self.replaces(name, &present) {
            debug!("{} replaces {} {}, ignoring conflict", self.candidate.name, name, present);
            return Ok(false);
        }

        state.fail(format!("Conflicts with the installed package '{}'", name));
        Ok(true)
    }

    /// Check every alternative of a Conflicts group
    ///
    /// Virtual names expand to all of their providers. Every hit is
    /// recorded; returns whether any conflict is known so far.
    pub fn check_conflicts_or_group(
        &self,
        group: &OrGroup,
        state: &mut ResolutionState,
    ) -> Result<bool> {
        for alt in group.alternatives() {
            if self.db.has_package(&alt.name)? {
                if self.check_single_conflict(&alt.name, alt.operator, alt.version.as_deref(), state)? {
                    state.add_conflict(&alt.name);
                }
                continue;
            }

            if !self.db.is_virtual_package(&alt.name)? {
                continue;
            }
            for provider in self.db.providers(&alt.name)? {
                // Provides and Conflicts on the same virtual name
                if provider.name == self.candidate.name {
                    debug!("Ignoring conflict of {} with itself", provider.name);
                    continue;
                }
                if self.check_single_conflict(
                    &provider.name,
                    alt.operator,
                    alt.version.as_deref(),
                    state,
                )? {
                    state.add_conflict(&provider.name);
                }
            }
        }
        Ok(!state.conflicting_installed.is_empty())
    }

    /// Check the whole Conflicts field
    ///
    /// Returns `true` when no conflict was found.
    pub fn check_all_conflicts(&self, state: &mut ResolutionState) -> Result<bool> {
        for group in &self.candidate.conflicts {
            self.check_conflicts_or_group(group, state)?;
        }
        Ok(state.conflicting_installed.is_empty())
    }
}

// src/resolver/mod.rs

//! Installability analysis for local packages
//!
//! The engine runs a fixed pipeline over a candidate package: architecture,
//! version, conflicts against installed packages, dependency resolution,
//! conflicts again with the newly needed packages, and finally a consistency
//! check of the database's staging area. Dependencies are resolved greedily:
//! the first installable alternative of each OR-group wins and an
//! unsatisfiable group ends the attempt.
//!
//! Source packages go through a shorter pipeline: installed packages hit by
//! Build-Conflicts are marked for removal, then Build-Depends are resolved
//! like Depends.

pub mod arch;
mod conflict;
mod depends;
mod engine;
mod verdict;

pub use conflict::ConflictChecker;
pub use depends::DependencyResolver;
pub use engine::{EngineConfig, InstallabilityEngine};
pub use verdict::{RejectReason, RequiredChanges, Verdict};

use std::collections::BTreeSet;

/// Working state of one resolution attempt
///
/// Created fresh by the engine for every `check` and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionState {
    /// Packages that must be installed alongside the candidate, in the
    /// order they were chosen
    pub need_packages: Vec<String>,
    /// Installed packages marked for removal
    pub remove_packages: Vec<String>,
    /// Installed or needed packages the candidate conflicts with
    pub conflicting_installed: BTreeSet<String>,
    pub failure_messages: Vec<String>,
    /// Names of the OR-group being resolved
    pub resolving: Option<String>,
    /// Names of the OR-group that could not be satisfied
    pub unsatisfied: Option<String>,
    /// Package the database refused to stage
    pub staging_failure: Option<String>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` to the needed packages
    ///
    /// Returns `false` if it was already there.
    pub fn need(&mut self, name: &str) -> bool {
        if self.is_needed(name) {
            return false;
        }
        self.need_packages.push(name.to_string());
        true
    }

    pub fn is_needed(&self, name: &str) -> bool {
        self.need_packages.iter().any(|needed| needed == name)
    }

    pub fn add_conflict(&mut self, name: &str) {
        self.conflicting_installed.insert(name.to_string());
    }

    pub fn fail(&mut self, message: String) {
        self.failure_messages.push(message);
    }
}

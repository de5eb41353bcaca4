// src/resolver/engine.rs

//! Installability engine
//!
//! Runs the checks of a local package in a fixed order. Each stage either
//! passes or rejects the candidate; stages that mark packages in the
//! database clear every mark when they reject.

use super::arch;
use super::conflict::ConflictChecker;
use super::depends::DependencyResolver;
use super::verdict::{RejectReason, RequiredChanges, Verdict};
use super::ResolutionState;
use crate::db::PackageDatabase;
use crate::error::{Error, Result};
use crate::packages::{Candidate, SourcePackage};
use crate::version::{self, VersionStatus};
use std::fmt;
use tracing::{debug, info, warn};

/// Settings for an installability engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Debian architecture name of the target system, e.g. `amd64`
    pub system_architecture: String,
}

impl EngineConfig {
    pub fn new(system_architecture: &str) -> Self {
        Self {
            system_architecture: system_architecture.to_string(),
        }
    }

    /// Configuration for the machine this binary runs on
    pub fn host() -> Self {
        Self::new(arch::host_architecture())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::host()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ArchCheck,
    VersionCheck,
    PreConflictCheck,
    RemoveConflicts,
    DependencyResolution,
    PostConflictCheck,
    ConsistencyCheck,
}

impl Stage {
    /// Stages for a binary package
    const PIPELINE: [Stage; 6] = [
        Stage::ArchCheck,
        Stage::VersionCheck,
        Stage::PreConflictCheck,
        Stage::DependencyResolution,
        Stage::PostConflictCheck,
        Stage::ConsistencyCheck,
    ];

    /// Stages for the build relations of a source package
    const SOURCE_PIPELINE: [Stage; 4] = [
        Stage::RemoveConflicts,
        Stage::DependencyResolution,
        Stage::PostConflictCheck,
        Stage::ConsistencyCheck,
    ];

    /// Whether the database may hold marks from this check when the stage
    /// fails
    fn stages_packages(self) -> bool {
        matches!(
            self,
            Stage::RemoveConflicts
                | Stage::DependencyResolution
                | Stage::PostConflictCheck
                | Stage::ConsistencyCheck
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ArchCheck => "architecture check",
            Stage::VersionCheck => "version check",
            Stage::PreConflictCheck => "conflict check",
            Stage::RemoveConflicts => "removal of conflicting packages",
            Stage::DependencyResolution => "dependency resolution",
            Stage::PostConflictCheck => "conflict check with needed packages",
            Stage::ConsistencyCheck => "consistency check",
        };
        f.write_str(name)
    }
}

/// Decides whether local packages can be installed
///
/// The engine borrows the database mutably for its whole lifetime, so two
/// checks can never interleave staged marks on the same database.
pub struct InstallabilityEngine<'a, D: PackageDatabase + ?Sized> {
    db: &'a mut D,
    config: EngineConfig,
}

impl<'a, D: PackageDatabase + ?Sized> InstallabilityEngine<'a, D> {
    pub fn new(db: &'a mut D, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Check whether `candidate` can be installed
    ///
    /// On acceptance the needed packages stay staged in the database for the
    /// caller to commit or clear. On rejection after staging began, the
    /// staged marks are cleared.
    pub fn check(&mut self, candidate: &Candidate) -> Verdict {
        self.run(&Stage::PIPELINE, candidate)
    }

    /// Check whether the build dependencies of `source` can be installed
    ///
    /// Installed packages hit by Build-Conflicts are marked for removal
    /// unless one of them is essential. Architecture and version are not
    /// checked.
    pub fn check_source(&mut self, source: &SourcePackage) -> Verdict {
        self.run(&Stage::SOURCE_PIPELINE, &source.to_candidate())
    }

    fn run(&mut self, stages: &[Stage], candidate: &Candidate) -> Verdict {
        let mut state = ResolutionState::new();

        for &stage in stages {
            debug!("{}: {}", candidate.name, stage);

            let outcome = match self.run_stage(stage, candidate, &mut state) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Database error during {} of {}: {}", stage, candidate.name, e);
                    Err(Self::database_failure(stage, e, &mut state))
                }
            };

            if let Err(reason) = outcome {
                if stage.stages_packages() {
                    self.rollback();
                }
                info!("{} {} rejected: {}", candidate.name, candidate.version, reason);
                return Verdict::rejected(reason, state);
            }
        }

        info!(
            "{} {} can be installed ({} additional package(s), {} removal(s))",
            candidate.name,
            candidate.version,
            state.need_packages.len(),
            state.remove_packages.len()
        );
        Verdict::accepted(state)
    }

    fn run_stage(
        &mut self,
        stage: Stage,
        candidate: &Candidate,
        state: &mut ResolutionState,
    ) -> Result<std::result::Result<(), RejectReason>> {
        match stage {
            Stage::ArchCheck => {
                if !arch::check(&candidate.architecture, &self.config.system_architecture) {
                    let reason = RejectReason::ArchitectureMismatch(candidate.architecture.clone());
                    state.fail(reason.to_string());
                    return Ok(Err(reason));
                }
            }
            Stage::VersionCheck => {
                if self.compare_to_version_in_cache(candidate, true)? == VersionStatus::Outdated {
                    let reason = RejectReason::VersionOutdated;
                    state.fail(reason.to_string());
                    return Ok(Err(reason));
                }
            }
            Stage::PreConflictCheck | Stage::PostConflictCheck => {
                let checker = ConflictChecker::new(&*self.db, candidate);
                if !checker.check_all_conflicts(state)? {
                    let names = state.conflicting_installed.iter().cloned().collect();
                    return Ok(Err(RejectReason::ConflictDetected(names)));
                }
            }
            Stage::RemoveConflicts => return self.remove_conflicts(candidate, state),
            Stage::DependencyResolution => {
                let mut resolver = DependencyResolver::new(&mut *self.db, candidate);
                if !resolver.satisfy_dependencies(&candidate.depends, state)? {
                    let reason = match state.staging_failure.clone() {
                        Some(name) => RejectReason::StagingFailed(name),
                        None => RejectReason::DependencyUnsatisfiable(
                            state.unsatisfied.clone().unwrap_or_default(),
                        ),
                    };
                    return Ok(Err(reason));
                }
            }
            Stage::ConsistencyCheck => {
                let broken = self.db.broken_count()?;
                if broken > 0 {
                    debug!("{} staged package(s) have unmet dependencies", broken);
                    let reason = RejectReason::BrokenConsistency;
                    state.fail(reason.to_string());
                    return Ok(Err(reason));
                }
            }
        }
        Ok(Ok(()))
    }

    /// Mark every installed package the candidate conflicts with for removal
    fn remove_conflicts(
        &mut self,
        candidate: &Candidate,
        state: &mut ResolutionState,
    ) -> Result<std::result::Result<(), RejectReason>> {
        let mut found = ResolutionState::new();
        if ConflictChecker::new(&*self.db, candidate).check_all_conflicts(&mut found)? {
            return Ok(Ok(()));
        }

        for name in found.conflicting_installed.iter() {
            if self.db.is_essential(name)? {
                let reason = RejectReason::EssentialRemoval(name.clone());
                state.conflicting_installed = found.conflicting_installed.clone();
                state.failure_messages.append(&mut found.failure_messages);
                state.fail(reason.to_string());
                return Ok(Err(reason));
            }

            match self.db.mark_for_removal(name) {
                Ok(()) => state.remove_packages.push(name.clone()),
                Err(Error::StagingFailed(name)) => {
                    let reason = RejectReason::RemovalFailed(name);
                    state.fail(reason.to_string());
                    return Ok(Err(reason));
                }
                Err(e) => return Err(e),
            }
        }
        debug!("Marked {} conflicting package(s) for removal", state.remove_packages.len());
        Ok(Ok(()))
    }

    /// Map a database error to the reason reported for `stage`
    fn database_failure(stage: Stage, error: Error, state: &mut ResolutionState) -> RejectReason {
        let reason = match (stage, error) {
            (_, Error::StagingFailed(name)) => RejectReason::StagingFailed(name),
            (Stage::DependencyResolution, _) => {
                RejectReason::StagingFailed(state.resolving.clone().unwrap_or_default())
            }
            _ => RejectReason::BrokenConsistency,
        };
        state.fail(reason.to_string());
        reason
    }

    fn rollback(&mut self) {
        if let Err(e) = self.db.clear() {
            warn!("Failed to clear staged packages: {}", e);
        }
    }

    /// Compare the candidate with the installed version, or with the
    /// repository candidate version when `use_installed` is false
    pub fn compare_to_version_in_cache(
        &self,
        candidate: &Candidate,
        use_installed: bool,
    ) -> Result<VersionStatus> {
        if !self.db.has_package(&candidate.name)? {
            return Ok(VersionStatus::None);
        }
        let reference = if use_installed {
            self.db.installed_version(&candidate.name)?
        } else {
            self.db.candidate_version(&candidate.name)?
        };
        Ok(version::classify(&candidate.version, reference.as_deref()))
    }

    /// Packages currently staged or marked for removal, and which of the
    /// staged ones lack a trusted origin
    pub fn required_changes(&self) -> Result<RequiredChanges> {
        let mut changes = RequiredChanges {
            remove: self.db.removals()?,
            ..Default::default()
        };
        for name in self.db.staged()? {
            if !self.db.is_trusted(&name)? {
                changes.unauthenticated.push(name.clone());
            }
            changes.install.push(name);
        }
        Ok(changes)
    }

    /// Like `required_changes`, but clears every mark when the changes
    /// cannot be read
    pub fn required_changes_or_clear(&mut self) -> Result<RequiredChanges> {
        match self.required_changes() {
            Ok(changes) => Ok(changes),
            Err(e) => {
                warn!("Cannot read the required changes, clearing marks: {}", e);
                self.rollback();
                Err(e)
            }
        }
    }
}

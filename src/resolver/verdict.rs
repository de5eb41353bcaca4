// src/resolver/verdict.rs

//! Result types of an installability check

use super::ResolutionState;
use serde::Serialize;
use std::collections::BTreeSet;

/// Why a candidate cannot be installed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("Wrong architecture '{0}'")]
    ArchitectureMismatch(String),

    #[error("A later version is already installed")]
    VersionOutdated,

    #[error("Conflicts with the installed packages: {}", .0.join(", "))]
    ConflictDetected(Vec<String>),

    #[error("Dependency is not satisfiable: {0}")]
    DependencyUnsatisfiable(String),

    #[error("Cannot install '{0}'")]
    StagingFailed(String),

    #[error("Failed to satisfy all dependencies (broken cache)")]
    BrokenConsistency,

    #[error("An essential package would be removed: '{0}'")]
    EssentialRemoval(String),

    #[error("Cannot remove '{0}'")]
    RemovalFailed(String),
}

/// Outcome of `InstallabilityEngine::check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    /// Packages to install alongside the candidate
    pub need_packages: Vec<String>,
    /// Installed packages marked for removal to make room for the candidate
    pub remove_packages: Vec<String>,
    pub conflicting_installed: BTreeSet<String>,
    pub failure_reason: Option<RejectReason>,
    /// Every message collected while checking, in order
    pub failure_messages: Vec<String>,
}

impl Verdict {
    pub(crate) fn accepted(state: ResolutionState) -> Self {
        Self {
            accepted: true,
            need_packages: state.need_packages,
            remove_packages: state.remove_packages,
            conflicting_installed: BTreeSet::new(),
            failure_reason: None,
            failure_messages: Vec::new(),
        }
    }

    pub(crate) fn rejected(reason: RejectReason, state: ResolutionState) -> Self {
        Self {
            accepted: false,
            need_packages: state.need_packages,
            remove_packages: state.remove_packages,
            conflicting_installed: state.conflicting_installed,
            failure_reason: Some(reason),
            failure_messages: state.failure_messages,
        }
    }
}

/// Changes the caller has to apply to commit an accepted check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredChanges {
    /// Every staged package, in staging order
    pub install: Vec<String>,
    /// Installed packages marked for removal
    pub remove: Vec<String>,
    /// Staged packages without a trusted origin
    pub unauthenticated: Vec<String>,
}

impl RequiredChanges {
    pub fn is_authenticated(&self) -> bool {
        self.unauthenticated.is_empty()
    }
}

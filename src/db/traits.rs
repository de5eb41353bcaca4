// src/db/traits.rs

//! The package database contract consumed by the resolver

use crate::error::Result;
use crate::packages::PackageRef;

/// Queryable package database with a discardable staging area
///
/// Every backend (SQLite, in-memory, or an adapter over a native package
/// manager) implements this trait; the resolver is written against it only.
/// Callers must not interleave two resolutions on the same handle, which the
/// `&mut self` receivers on the staging methods enforce.
pub trait PackageDatabase {
    /// Whether `name` is a concrete (non-virtual) package
    fn has_package(&self, name: &str) -> Result<bool>;

    /// Whether `name` exists only as something other packages provide
    fn is_virtual_package(&self, name: &str) -> Result<bool>;

    /// Concrete packages providing `virtual_name`, in a stable order
    fn providers(&self, virtual_name: &str) -> Result<Vec<PackageRef>>;

    fn installed_version(&self, name: &str) -> Result<Option<String>>;

    /// Version that would be installed from the repositories
    fn candidate_version(&self, name: &str) -> Result<Option<String>>;

    /// Stage `name` for installation
    ///
    /// Fails with `Error::StagingFailed` when the package cannot be staged.
    fn mark_for_install(&mut self, name: &str) -> Result<()>;

    /// Mark the installed package `name` for removal
    ///
    /// Fails with `Error::StagingFailed` when `name` is not installed or is
    /// held.
    fn mark_for_removal(&mut self, name: &str) -> Result<()>;

    /// Discard every staged and removal mark. Safe to call when nothing is
    /// marked.
    fn clear(&mut self) -> Result<()>;

    /// Number of staged packages with unmet dependencies
    fn broken_count(&self) -> Result<usize>;

    /// Names currently staged, in staging order
    fn staged(&self) -> Result<Vec<String>>;

    fn is_staged(&self, name: &str) -> Result<bool> {
        Ok(self.staged()?.iter().any(|staged| staged == name))
    }

    /// Names marked for removal, in marking order
    fn removals(&self) -> Result<Vec<String>>;

    fn is_marked_for_removal(&self, name: &str) -> Result<bool> {
        Ok(self.removals()?.iter().any(|removed| removed == name))
    }

    /// Whether dpkg must never remove the package
    fn is_essential(&self, name: &str) -> Result<bool>;

    /// Whether the package comes from an authenticated origin
    fn is_trusted(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }
}

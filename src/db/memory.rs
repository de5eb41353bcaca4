// src/db/memory.rs

//! In-memory package database
//!
//! Holds the whole catalog in hash maps. Useful for embedding the resolver
//! in another tool that already has its package list in memory, and for tests.

use crate::db::models::PackageRecord;
use crate::db::staging::{self, Catalog};
use crate::db::traits::PackageDatabase;
use crate::error::Result;
use crate::packages::{OrGroup, PackageRef};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct MemoryDatabase {
    packages: HashMap<String, PackageRecord>,
    /// capability -> providers, sorted for a stable provider order
    provides: HashMap<String, BTreeSet<String>>,
    staged: Vec<String>,
    removals: Vec<String>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut PackageRecord {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| PackageRecord::new(name))
    }

    /// Record `name` as installed at `version`
    pub fn add_installed(&mut self, name: &str, version: &str) -> &mut Self {
        self.entry(name).installed_version = Some(version.to_string());
        self
    }

    /// Record `name` as available from the repositories at `version`
    pub fn add_available(&mut self, name: &str, version: &str) -> &mut Self {
        self.entry(name).candidate_version = Some(version.to_string());
        self
    }

    /// Record that `provider` provides `capability`
    pub fn add_provides(&mut self, provider: &str, capability: &str) -> &mut Self {
        self.entry(provider);
        self.provides
            .entry(capability.to_string())
            .or_default()
            .insert(provider.to_string());
        self
    }

    /// Dependencies of the candidate version of `name`
    pub fn set_depends(&mut self, name: &str, depends: Vec<OrGroup>) -> &mut Self {
        self.entry(name).depends = depends;
        self
    }

    /// Refuse to stage `name`
    pub fn hold(&mut self, name: &str) -> &mut Self {
        self.entry(name).held = true;
        self
    }

    pub fn set_untrusted(&mut self, name: &str) -> &mut Self {
        self.entry(name).trusted = false;
        self
    }

    pub fn set_essential(&mut self, name: &str) -> &mut Self {
        self.entry(name).essential = true;
        self
    }
}

impl Catalog for MemoryDatabase {
    fn record(&self, name: &str) -> Result<Option<PackageRecord>> {
        Ok(self.packages.get(name).cloned())
    }

    fn provider_names(&self, capability: &str) -> Result<Vec<String>> {
        Ok(self
            .provides
            .get(capability)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn staged_names(&self) -> Result<Vec<String>> {
        Ok(self.staged.clone())
    }

    fn is_staged_name(&self, name: &str) -> Result<bool> {
        Ok(self.staged.iter().any(|staged| staged == name))
    }

    fn push_staged(&mut self, name: &str) -> Result<()> {
        if !self.staged.iter().any(|staged| staged == name) {
            self.staged.push(name.to_string());
        }
        Ok(())
    }

    fn is_removal_name(&self, name: &str) -> Result<bool> {
        Ok(self.removals.iter().any(|removed| removed == name))
    }

    fn push_removal(&mut self, name: &str) -> Result<()> {
        if !self.removals.iter().any(|removed| removed == name) {
            self.removals.push(name.to_string());
        }
        Ok(())
    }
}

impl PackageDatabase for MemoryDatabase {
    fn has_package(&self, name: &str) -> Result<bool> {
        Ok(self.packages.contains_key(name))
    }

    fn is_virtual_package(&self, name: &str) -> Result<bool> {
        Ok(!self.packages.contains_key(name)
            && self.provides.get(name).is_some_and(|set| !set.is_empty()))
    }

    fn providers(&self, virtual_name: &str) -> Result<Vec<PackageRef>> {
        let refs = self
            .provider_names(virtual_name)?
            .iter()
            .filter_map(|name| self.packages.get(name))
            .map(|record| PackageRef {
                name: record.name.clone(),
                version: record
                    .installed_version
                    .clone()
                    .or_else(|| record.candidate_version.clone()),
                architecture: record.architecture.clone(),
            })
            .collect();
        Ok(refs)
    }

    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .packages
            .get(name)
            .and_then(|record| record.installed_version.clone()))
    }

    fn candidate_version(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .packages
            .get(name)
            .and_then(|record| record.candidate_version.clone()))
    }

    fn mark_for_install(&mut self, name: &str) -> Result<()> {
        staging::mark_for_install(self, name)
    }

    fn mark_for_removal(&mut self, name: &str) -> Result<()> {
        staging::mark_for_removal(self, name)
    }

    fn clear(&mut self) -> Result<()> {
        self.staged.clear();
        self.removals.clear();
        Ok(())
    }

    fn broken_count(&self) -> Result<usize> {
        staging::broken_count(self)
    }

    fn staged(&self) -> Result<Vec<String>> {
        Ok(self.staged.clone())
    }

    fn removals(&self) -> Result<Vec<String>> {
        Ok(self.removals.clone())
    }

    fn is_essential(&self, name: &str) -> Result<bool> {
        Ok(self.packages.get(name).is_some_and(|record| record.essential))
    }

    fn is_trusted(&self, name: &str) -> Result<bool> {
        Ok(self.packages.get(name).is_none_or(|record| record.trusted))
    }
}

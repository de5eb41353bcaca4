// src/db/models.rs

//! Data models for the debcheck database
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

use crate::error::Result;
use crate::packages::OrGroup;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A package known to the catalog, installed and/or available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub architecture: Option<String>,
    pub installed_version: Option<String>,
    pub candidate_version: Option<String>,
    /// Pre-Depends and Depends of the candidate version
    pub depends: Vec<OrGroup>,
    pub essential: bool,
    /// Whether the candidate comes from an authenticated origin
    pub trusted: bool,
    /// Held packages are never staged
    pub held: bool,
}

impl PackageRecord {
    /// Create a new record with no versions
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            architecture: None,
            installed_version: None,
            candidate_version: None,
            depends: Vec::new(),
            essential: false,
            trusted: true,
            held: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// Insert this record, replacing any existing row of the same name
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        let depends = serde_json::to_string(&self.depends)?;
        conn.execute(
            "INSERT INTO packages (name, architecture, installed_version, candidate_version, depends, essential, trusted, held)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(name) DO UPDATE SET
                architecture = excluded.architecture,
                installed_version = excluded.installed_version,
                candidate_version = excluded.candidate_version,
                depends = excluded.depends,
                essential = excluded.essential,
                trusted = excluded.trusted,
                held = excluded.held",
            params![
                &self.name,
                &self.architecture,
                &self.installed_version,
                &self.candidate_version,
                depends,
                self.essential,
                self.trusted,
                self.held,
            ],
        )?;
        Ok(())
    }

    /// Find a record by package name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, architecture, installed_version, candidate_version, depends, essential, trusted, held
             FROM packages WHERE name = ?1",
        )?;

        let record = stmt.query_row([name], Self::from_row).optional()?;

        Ok(record)
    }

    /// List all records ordered by name
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, architecture, installed_version, candidate_version, depends, essential, trusted, held
             FROM packages ORDER BY name",
        )?;

        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Records whose name contains `pattern`
    pub fn search(conn: &Connection, pattern: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, architecture, installed_version, candidate_version, depends, essential, trusted, held
             FROM packages WHERE name LIKE ?1 ORDER BY name",
        )?;

        let records = stmt
            .query_map([format!("%{}%", pattern)], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Set the held flag of an existing record
    pub fn set_held(conn: &Connection, name: &str, held: bool) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE packages SET held = ?1 WHERE name = ?2",
            params![held, name],
        )?;
        Ok(changed > 0)
    }

    /// Convert a database row to a PackageRecord
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let depends_json: String = row.get(4)?;
        let depends = serde_json::from_str(&depends_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            name: row.get(0)?,
            architecture: row.get(1)?,
            installed_version: row.get(2)?,
            candidate_version: row.get(3)?,
            depends,
            essential: row.get(5)?,
            trusted: row.get(6)?,
            held: row.get(7)?,
        })
    }
}

/// A virtual name offered by a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvideEntry {
    pub id: Option<i64>,
    pub provider: String,
    pub capability: String,
    pub version: Option<String>,
}

impl ProvideEntry {
    /// Create a new ProvideEntry
    pub fn new(provider: &str, capability: &str, version: Option<String>) -> Self {
        Self {
            id: None,
            provider: provider.to_string(),
            capability: capability.to_string(),
            version,
        }
    }

    /// Insert or ignore if already exists (for idempotent imports)
    pub fn insert_or_ignore(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT OR IGNORE INTO provides (provider, capability, version)
             VALUES (?1, ?2, ?3)",
            params![&self.provider, &self.capability, &self.version],
        )?;

        let id = conn.query_row(
            "SELECT id FROM provides WHERE provider = ?1 AND capability = ?2",
            params![&self.provider, &self.capability],
            |row| row.get(0),
        )?;

        self.id = Some(id);
        Ok(id)
    }

    /// Find every provider of a capability, ordered by provider name
    pub fn find_providers(conn: &Connection, capability: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, provider, capability, version FROM provides
             WHERE capability = ?1 ORDER BY provider",
        )?;

        let entries = stmt
            .query_map([capability], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            provider: row.get(1)?,
            capability: row.get(2)?,
            version: row.get(3)?,
        })
    }
}

/// Rows of the staging area
pub struct StagedEntry;

impl StagedEntry {
    /// Stage a package; staging twice keeps the original position
    pub fn insert(conn: &Connection, name: &str) -> Result<()> {
        conn.execute("INSERT OR IGNORE INTO staged (name) VALUES (?1)", [name])?;
        Ok(())
    }

    /// Staged names in staging order
    pub fn list(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM staged ORDER BY seq")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn contains(conn: &Connection, name: &str) -> Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM staged WHERE name = ?1", [name], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Discard every staged mark in one statement
    pub fn clear(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM staged", [])?)
    }
}

/// Rows of the removal marks, the installed packages a plan takes away
pub struct RemovalEntry;

impl RemovalEntry {
    pub fn insert(conn: &Connection, name: &str) -> Result<()> {
        conn.execute("INSERT OR IGNORE INTO removals (name) VALUES (?1)", [name])?;
        Ok(())
    }

    /// Names marked for removal, in marking order
    pub fn list(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM removals ORDER BY seq")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn contains(conn: &Connection, name: &str) -> Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM removals WHERE name = ?1", [name], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn clear(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM removals", [])?)
    }
}

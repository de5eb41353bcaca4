// src/db/schema.rs

//! Database schema definitions and migrations for debcheck
//!
//! This module defines the SQLite schema for the package catalog and the
//! staging area, plus a migration system to evolve the schema over time.

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!(
        "Schema migration complete. Now at version {}",
        SCHEMA_VERSION
    );
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        3 => migrate_v3(conn),
        _ => Err(Error::InitError(format!(
            "Unknown migration version: {}",
            version
        ))),
    }
}

/// Initial schema - Version 1
///
/// - packages: one row per package name with installed/candidate versions
/// - provides: virtual names each package provides
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE packages (
            name TEXT PRIMARY KEY,
            architecture TEXT,
            installed_version TEXT,
            candidate_version TEXT,
            depends TEXT NOT NULL DEFAULT '[]',
            essential INTEGER NOT NULL DEFAULT 0,
            trusted INTEGER NOT NULL DEFAULT 1,
            held INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE provides (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            capability TEXT NOT NULL,
            version TEXT,
            UNIQUE(provider, capability),
            FOREIGN KEY (provider) REFERENCES packages(name) ON DELETE CASCADE
        );

        CREATE INDEX idx_provides_capability ON provides(capability);
        ",
    )?;

    Ok(())
}

/// Staging area - Version 2
///
/// `seq` keeps the staging order stable for install plans.
fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 2");

    conn.execute_batch(
        "
        CREATE TABLE staged (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            staged_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (name) REFERENCES packages(name) ON DELETE CASCADE
        );
        ",
    )?;

    Ok(())
}

/// Removal marks - Version 3
fn migrate_v3(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 3");

    conn.execute_batch(
        "
        CREATE TABLE removals (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            marked_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (name) REFERENCES packages(name) ON DELETE CASCADE
        );
        ",
    )?;

    Ok(())
}

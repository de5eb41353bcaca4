// src/db/mod.rs

//! Database layer for debcheck
//!
//! This module holds the `PackageDatabase` contract the resolver runs
//! against, plus two implementations:
//! - `SqliteDatabase`: persistent catalog and staging area in SQLite
//! - `MemoryDatabase`: hash-map catalog for embedding and tests

pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;
mod staging;
pub mod traits;

pub use memory::MemoryDatabase;
pub use sqlite::SqliteDatabase;
pub use traits::PackageDatabase;

use crate::error::{Error, Result};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// Initialize a new debcheck database at the specified path
///
/// Creates the database file and applies the schema.
/// This is idempotent - calling it on an existing database is safe.
pub fn init(db_path: &str) -> Result<()> {
    debug!("Initializing database at: {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::InitError(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

/// Open an existing debcheck database
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::DatabaseNotFound(db_path.to_string()));
    }

    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(conn)
}

/// Run `f` inside a transaction, committing only if it succeeds
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

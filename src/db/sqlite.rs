// src/db/sqlite.rs

//! SQLite-backed package database
//!
//! The catalog lives in the `packages` and `provides` tables; staged marks
//! live in `staged`, removal marks in `removals`, and both survive process
//! restarts until cleared.

use crate::db::models::{PackageRecord, ProvideEntry, RemovalEntry, StagedEntry};
use crate::db::staging::{self, Catalog};
use crate::db::traits::PackageDatabase;
use crate::error::Result;
use crate::packages::PackageRef;
use rusqlite::Connection;
use tracing::debug;

pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Wrap an open connection whose schema is already migrated
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open an existing database file
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = super::open(db_path)?;
        super::schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Catalog for SqliteDatabase {
    fn record(&self, name: &str) -> Result<Option<PackageRecord>> {
        PackageRecord::find_by_name(&self.conn, name)
    }

    fn provider_names(&self, capability: &str) -> Result<Vec<String>> {
        Ok(ProvideEntry::find_providers(&self.conn, capability)?
            .into_iter()
            .map(|entry| entry.provider)
            .collect())
    }

    fn staged_names(&self) -> Result<Vec<String>> {
        StagedEntry::list(&self.conn)
    }

    fn is_staged_name(&self, name: &str) -> Result<bool> {
        StagedEntry::contains(&self.conn, name)
    }

    fn push_staged(&mut self, name: &str) -> Result<()> {
        StagedEntry::insert(&self.conn, name)
    }

    fn is_removal_name(&self, name: &str) -> Result<bool> {
        RemovalEntry::contains(&self.conn, name)
    }

    fn push_removal(&mut self, name: &str) -> Result<()> {
        RemovalEntry::insert(&self.conn, name)
    }
}

impl PackageDatabase for SqliteDatabase {
    fn has_package(&self, name: &str) -> Result<bool> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.is_some())
    }

    fn is_virtual_package(&self, name: &str) -> Result<bool> {
        if self.has_package(name)? {
            return Ok(false);
        }
        Ok(!ProvideEntry::find_providers(&self.conn, name)?.is_empty())
    }

    fn providers(&self, virtual_name: &str) -> Result<Vec<PackageRef>> {
        let mut refs = Vec::new();
        for entry in ProvideEntry::find_providers(&self.conn, virtual_name)? {
            if let Some(record) = PackageRecord::find_by_name(&self.conn, &entry.provider)? {
                refs.push(PackageRef {
                    version: record.installed_version.or(record.candidate_version),
                    architecture: record.architecture,
                    name: record.name,
                });
            }
        }
        Ok(refs)
    }

    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.and_then(|r| r.installed_version))
    }

    fn candidate_version(&self, name: &str) -> Result<Option<String>> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.and_then(|r| r.candidate_version))
    }

    fn mark_for_install(&mut self, name: &str) -> Result<()> {
        staging::mark_for_install(self, name)
    }

    fn mark_for_removal(&mut self, name: &str) -> Result<()> {
        staging::mark_for_removal(self, name)
    }

    fn clear(&mut self) -> Result<()> {
        let (staged, removals) = super::transaction(&mut self.conn, |tx| {
            Ok((StagedEntry::clear(tx)?, RemovalEntry::clear(tx)?))
        })?;
        debug!(
            "Cleared {} staged package(s) and {} removal(s)",
            staged, removals
        );
        Ok(())
    }

    fn broken_count(&self) -> Result<usize> {
        staging::broken_count(self)
    }

    fn staged(&self) -> Result<Vec<String>> {
        StagedEntry::list(&self.conn)
    }

    fn is_staged(&self, name: &str) -> Result<bool> {
        StagedEntry::contains(&self.conn, name)
    }

    fn removals(&self) -> Result<Vec<String>> {
        RemovalEntry::list(&self.conn)
    }

    fn is_marked_for_removal(&self, name: &str) -> Result<bool> {
        RemovalEntry::contains(&self.conn, name)
    }

    fn is_essential(&self, name: &str) -> Result<bool> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.is_some_and(|r| r.essential))
    }

    fn is_trusted(&self, name: &str) -> Result<bool> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.is_none_or(|r| r.trusted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::error::Error;
    use crate::packages::parse_relations;

    fn create_test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    fn add(db: &SqliteDatabase, name: &str, installed: Option<&str>, candidate: Option<&str>) {
        let mut record = PackageRecord::new(name);
        record.installed_version = installed.map(str::to_string);
        record.candidate_version = candidate.map(str::to_string);
        record.upsert(db.connection()).unwrap();
    }

    #[test]
    fn test_lookups() {
        let db = create_test_db();
        add(&db, "bar", Some("1.0"), Some("1.2"));
        add(&db, "exim4", None, Some("4.96"));
        ProvideEntry::new("exim4", "mail-transport-agent", None)
            .insert_or_ignore(db.connection())
            .unwrap();

        assert!(db.has_package("bar").unwrap());
        assert_eq!(db.installed_version("bar").unwrap().as_deref(), Some("1.0"));
        assert_eq!(db.candidate_version("bar").unwrap().as_deref(), Some("1.2"));
        assert_eq!(db.installed_version("nope").unwrap(), None);

        assert!(db.is_virtual_package("mail-transport-agent").unwrap());
        assert!(!db.is_virtual_package("exim4").unwrap());
        let providers = db.providers("mail-transport-agent").unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "exim4");
        assert_eq!(providers[0].version.as_deref(), Some("4.96"));
    }

    #[test]
    fn test_staging_roundtrip() {
        let mut db = create_test_db();
        add(&db, "app", None, Some("1.0"));
        add(&db, "libapp", None, Some("1.0"));
        let mut app = PackageRecord::find_by_name(db.connection(), "app").unwrap().unwrap();
        app.depends = parse_relations("libapp").unwrap();
        app.upsert(db.connection()).unwrap();

        db.mark_for_install("app").unwrap();
        assert_eq!(db.staged().unwrap(), vec!["app", "libapp"]);
        assert!(db.is_staged("libapp").unwrap());
        assert_eq!(db.broken_count().unwrap(), 0);

        db.clear().unwrap();
        db.clear().unwrap();
        assert!(db.staged().unwrap().is_empty());
    }

    #[test]
    fn test_removal_marks_cleared_with_staging() {
        let mut db = create_test_db();
        add(&db, "pseudo", Some("1.0"), Some("1.0"));
        add(&db, "app", None, Some("1.0"));

        db.mark_for_removal("pseudo").unwrap();
        db.mark_for_install("app").unwrap();
        assert_eq!(db.removals().unwrap(), vec!["pseudo"]);
        assert!(db.is_marked_for_removal("pseudo").unwrap());
        assert!(matches!(
            db.mark_for_removal("app"),
            Err(Error::StagingFailed(_))
        ));

        db.clear().unwrap();
        assert!(db.removals().unwrap().is_empty());
        assert!(db.staged().unwrap().is_empty());
    }

    #[test]
    fn test_essential_from_record() {
        let db = create_test_db();
        let mut dpkg = PackageRecord::new("dpkg");
        dpkg.installed_version = Some("1.21.22".to_string());
        dpkg.essential = true;
        dpkg.upsert(db.connection()).unwrap();

        assert!(db.is_essential("dpkg").unwrap());
        assert!(!db.is_essential("missing").unwrap());
    }

    #[test]
    fn test_staging_failure() {
        let mut db = create_test_db();
        add(&db, "pinned", None, Some("1.0"));
        PackageRecord::set_held(db.connection(), "pinned", true).unwrap();

        assert!(matches!(
            db.mark_for_install("pinned"),
            Err(Error::StagingFailed(_))
        ));
        assert!(db.staged().unwrap().is_empty());
    }
}

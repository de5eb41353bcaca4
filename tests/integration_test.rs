// tests/integration_test.rs

//! Integration tests for debcheck
//!
//! These tests verify end-to-end functionality across modules: importing
//! indices into SQLite, reading a .deb, and checking it with the engine.

use debcheck::db::{self, MemoryDatabase, PackageDatabase, SqliteDatabase};
use debcheck::packages::{Candidate, SourcePackage, deb, parse_relations};
use debcheck::repository::{self, ImportOptions, IndexKind};
use debcheck::resolver::{EngineConfig, InstallabilityEngine, RejectReason};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const STATUS: &str = "Package: libc6
Status: install ok installed
Version: 2.36-9
Architecture: amd64
Essential: yes

Package: baz
Status: install ok installed
Version: 1.0
Architecture: amd64

Package: postfix
Status: deinstall ok config-files
Version: 3.7.6-0
Architecture: amd64
";

const PACKAGES: &str = "Package: bar
Version: 1.2
Architecture: amd64
Depends: libc6 (>= 2.34), libbar (= 1.2)

Package: libbar
Version: 1.2
Architecture: amd64

Package: postfix
Version: 3.7.6-0
Architecture: amd64
Provides: mail-transport-agent

Package: exim4
Version: 4.96-15
Architecture: amd64
Provides: mail-transport-agent
";

/// Create an initialized database with STATUS and PACKAGES imported
fn catalog() -> (TempDir, SqliteDatabase) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("debcheck.db");
    let db_path = db_path.to_str().unwrap();
    db::init(db_path).unwrap();

    let mut database = SqliteDatabase::open(db_path).unwrap();
    let conn = database.connection_mut();
    repository::import_index(conn, STATUS, IndexKind::Status, ImportOptions::default()).unwrap();
    repository::import_index(conn, PACKAGES, IndexKind::Packages, ImportOptions::default())
        .unwrap();
    (dir, database)
}

fn amd64() -> EngineConfig {
    EngineConfig::new("amd64")
}

fn gz_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, path, *data).unwrap();
    }
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&tar.into_inner().unwrap()).unwrap();
    gz.finish().unwrap()
}

fn write_deb_with_data(control: &str, files: &[(&str, &[u8])]) -> NamedTempFile {
    let file = NamedTempFile::with_suffix(".deb").unwrap();
    let mut ar = ar::Builder::new(File::create(file.path()).unwrap());
    for (name, data) in [
        ("debian-binary", b"2.0\n".to_vec()),
        ("control.tar.gz", gz_tar(&[("./control", control.as_bytes())])),
        ("data.tar.gz", gz_tar(files)),
    ] {
        let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
        ar.append(&header, data.as_slice()).unwrap();
    }
    file
}

fn write_deb(control: &str) -> NamedTempFile {
    write_deb_with_data(control, &[])
}

#[test]
fn test_database_lifecycle() {
    // Create a temporary database
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    // Remove the temp file so init can create it
    drop(temp_file);

    db::init(&db_path).unwrap();
    assert!(std::path::Path::new(&db_path).exists());

    let conn = db::open(&db_path).unwrap();
    let result: Result<i32, _> = conn.query_row("SELECT 1", [], |row| row.get(0));
    assert_eq!(result.unwrap(), 1, "Should be able to execute queries");
}

#[test]
fn test_database_init_creates_parent_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("nested/path/to/debcheck.db")
        .to_str()
        .unwrap()
        .to_string();

    assert!(db::init(&db_path).is_ok(), "Should create parent directories");
    assert!(std::path::Path::new(&db_path).exists());
}

#[test]
fn test_deb_accepted_with_needed_packages() {
    let (_dir, mut database) = catalog();
    let deb = write_deb(
        "Package: foo
Version: 2.0
Architecture: all
Depends: bar (>= 1.0)
",
    );
    let candidate = Candidate::from_deb(deb.path()).unwrap();

    let mut engine = InstallabilityEngine::new(&mut database, amd64());
    let verdict = engine.check(&candidate);
    assert!(verdict.accepted, "{:?}", verdict);
    assert_eq!(verdict.need_packages, vec!["bar"]);

    let changes = engine.required_changes().unwrap();
    assert_eq!(changes.install, vec!["bar", "libbar"]);
    assert!(changes.is_authenticated());
    assert_eq!(database.broken_count().unwrap(), 0);
}

#[test]
fn test_staged_marks_persist_across_connections() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("debcheck.db");
    let db_path = db_path.to_str().unwrap();
    db::init(db_path).unwrap();
    {
        let mut database = SqliteDatabase::open(db_path).unwrap();
        repository::import_index(
            database.connection_mut(),
            PACKAGES,
            IndexKind::Packages,
            ImportOptions::default(),
        )
        .unwrap();
        let candidate = Candidate::new("foo", "1.0", "all")
            .with_depends(parse_relations("libbar").unwrap());
        assert!(InstallabilityEngine::new(&mut database, amd64()).check(&candidate).accepted);
    }

    let mut reopened = SqliteDatabase::open(db_path).unwrap();
    assert_eq!(reopened.staged().unwrap(), vec!["libbar"]);
    reopened.clear().unwrap();
    assert!(reopened.staged().unwrap().is_empty());
}

#[test]
fn test_installed_conflict_rejected() {
    let (_dir, mut database) = catalog();
    let candidate = Candidate::from_control(
        "Package: foo
Version: 2.0
Architecture: amd64
Conflicts: baz
",
    )
    .unwrap();

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert!(!verdict.accepted);
    assert!(verdict.conflicting_installed.contains("baz"));
    assert_eq!(
        verdict.failure_messages,
        vec!["Conflicts with the installed package 'baz'"]
    );
}

#[test]
fn test_replaces_allows_upgrade_over_conflict() {
    let (_dir, mut database) = catalog();
    let candidate = Candidate::from_control(
        "Package: foo
Version: 2.0
Architecture: amd64
Conflicts: baz (<< 2.0)
Replaces: baz (<< 2.0)
",
    )
    .unwrap();

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert!(verdict.accepted);
}

#[test]
fn test_ambiguous_virtual_dependency_rejected() {
    let (_dir, mut database) = catalog();
    let candidate = Candidate::new("mailer", "1.0", "amd64")
        .with_depends(parse_relations("bar, mail-transport-agent").unwrap());

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert_eq!(
        verdict.failure_reason,
        Some(RejectReason::DependencyUnsatisfiable(
            "mail-transport-agent".to_string()
        ))
    );
    assert_eq!(verdict.need_packages, vec!["bar"]);
    assert!(
        database.staged().unwrap().is_empty(),
        "Failed resolution must leave nothing staged"
    );
}

#[test]
fn test_wrong_architecture_rejected() {
    let (_dir, mut database) = catalog();
    let candidate = Candidate::new("foo", "1.0", "i386")
        .with_depends(parse_relations("bar").unwrap());

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert_eq!(
        verdict.failure_reason,
        Some(RejectReason::ArchitectureMismatch("i386".to_string()))
    );
    assert!(database.staged().unwrap().is_empty());
}

#[test]
fn test_outdated_and_reinstall() {
    let (_dir, mut database) = catalog();
    let mut engine = InstallabilityEngine::new(&mut database, amd64());

    let older = Candidate::new("baz", "0.9", "amd64");
    assert_eq!(
        engine.check(&older).failure_reason,
        Some(RejectReason::VersionOutdated)
    );

    let same = Candidate::new("baz", "1.0", "amd64");
    assert!(engine.check(&same).accepted);
}

#[test]
fn test_held_dependency_fails_staging() {
    let (_dir, mut database) = catalog();
    db::models::PackageRecord::set_held(database.connection(), "bar", true).unwrap();
    let candidate = Candidate::new("foo", "1.0", "amd64")
        .with_depends(parse_relations("bar").unwrap());

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert_eq!(
        verdict.failure_reason,
        Some(RejectReason::StagingFailed("bar".to_string()))
    );
    assert!(database.staged().unwrap().is_empty());
}

#[test]
fn test_untrusted_index_reported() {
    let (_dir, mut database) = catalog();
    repository::import_index(
        database.connection_mut(),
        "Package: shady\nVersion: 1.0\nArchitecture: amd64\n",
        IndexKind::Packages,
        ImportOptions { trusted: false },
    )
    .unwrap();
    let candidate = Candidate::new("foo", "1.0", "amd64")
        .with_depends(parse_relations("shady").unwrap());

    let mut engine = InstallabilityEngine::new(&mut database, amd64());
    assert!(engine.check(&candidate).accepted);
    let changes = engine.required_changes().unwrap();
    assert_eq!(changes.unauthenticated, vec!["shady"]);
}

#[test]
fn test_backends_agree() {
    let (_dir, mut sqlite) = catalog();

    let mut memory = MemoryDatabase::new();
    memory
        .add_installed("libc6", "2.36-9")
        .add_available("libc6", "2.36-9")
        .add_installed("baz", "1.0")
        .add_available("baz", "1.0")
        .add_available("bar", "1.2")
        .set_depends("bar", parse_relations("libc6 (>= 2.34), libbar (= 1.2)").unwrap())
        .add_available("libbar", "1.2")
        .add_available("postfix", "3.7.6-0")
        .add_provides("postfix", "mail-transport-agent")
        .add_available("exim4", "4.96-15")
        .add_provides("exim4", "mail-transport-agent");

    let candidates = [
        Candidate::new("foo", "1.0", "all").with_depends(parse_relations("bar").unwrap()),
        Candidate::new("foo", "1.0", "all")
            .with_depends(parse_relations("mail-transport-agent | bar").unwrap()),
        Candidate::new("foo", "1.0", "all").with_conflicts(parse_relations("baz").unwrap()),
    ];

    for candidate in &candidates {
        let from_sqlite = InstallabilityEngine::new(&mut sqlite, amd64()).check(candidate);
        let from_memory = InstallabilityEngine::new(&mut memory, amd64()).check(candidate);
        assert_eq!(from_sqlite, from_memory, "{}", candidate.name);
        sqlite.clear().unwrap();
        memory.clear().unwrap();
    }
}

#[test]
fn test_rejects_conflict_with_indirect_dependency() {
    let (_dir, mut database) = catalog();
    // bar pulls in libbar, which foo conflicts with
    let candidate = Candidate::new("foo", "1.0", "amd64")
        .with_depends(parse_relations("bar").unwrap())
        .with_conflicts(parse_relations("libbar").unwrap());

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check(&candidate);
    assert_eq!(
        verdict.failure_reason,
        Some(RejectReason::ConflictDetected(vec!["libbar".to_string()]))
    );
    assert!(database.staged().unwrap().is_empty());
}

#[test]
fn test_build_dependencies_from_dsc() {
    let (_dir, mut database) = catalog();
    let dsc = NamedTempFile::with_suffix(".dsc").unwrap();
    std::fs::write(
        dsc.path(),
        "Format: 3.0 (quilt)
Source: foo
Binary: foo
Version: 2.0-1
Build-Depends: bar (>= 1.0)
Build-Conflicts: baz
",
    )
    .unwrap();
    let source = SourcePackage::from_path(dsc.path()).unwrap();

    let mut engine = InstallabilityEngine::new(&mut database, amd64());
    let verdict = engine.check_source(&source);
    assert!(verdict.accepted, "{:?}", verdict);
    assert_eq!(verdict.need_packages, vec!["bar"]);
    assert_eq!(verdict.remove_packages, vec!["baz"]);

    let changes = engine.required_changes().unwrap();
    assert_eq!(changes.install, vec!["bar", "libbar"]);
    assert_eq!(changes.remove, vec!["baz"]);

    assert!(database.is_marked_for_removal("baz").unwrap());
    database.clear().unwrap();
    assert!(database.removals().unwrap().is_empty());
    assert!(database.staged().unwrap().is_empty());
}

#[test]
fn test_build_conflict_with_essential_package() {
    let (_dir, mut database) = catalog();
    let source = SourcePackage::from_dsc("Source: foo\nVersion: 1.0\nBuild-Conflicts: libc6\n")
        .unwrap();

    let verdict = InstallabilityEngine::new(&mut database, amd64()).check_source(&source);
    assert_eq!(
        verdict.failure_reason,
        Some(RejectReason::EssentialRemoval("libc6".to_string()))
    );
    assert!(database.removals().unwrap().is_empty());
}

#[test]
fn test_file_list_from_deb() {
    let deb = write_deb_with_data(
        "Package: foo\nVersion: 1.0\nArchitecture: all\n",
        &[
            ("./usr/bin/foo", b"#!/bin/sh\n"),
            ("./usr/share/doc/foo/copyright", b"GPL\n"),
        ],
    );

    let files = deb::read_file_list(deb.path()).unwrap();
    assert_eq!(
        files,
        vec!["/usr/bin/foo", "/usr/share/doc/foo/copyright"]
    );
}

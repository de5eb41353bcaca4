// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use debcheck::db::models::PackageRecord;
use debcheck::db::{PackageDatabase, SqliteDatabase};
use debcheck::packages::{Candidate, SourcePackage, deb};
use debcheck::repository::{self, ImportOptions, IndexKind};
use debcheck::resolver::{EngineConfig, InstallabilityEngine, RequiredChanges, Verdict};
use debcheck::version::VersionStatus;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "debcheck")]
#[command(author, version, about = "Check whether local .deb packages can be installed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the debcheck database
    Init {
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// Import a dpkg status file or an APT Packages index
    Import {
        /// Path to the index file (.gz, .xz and .zst are decompressed)
        index_path: String,
        /// Kind of index
        #[arg(short, long, value_enum, default_value = "packages")]
        kind: IndexArg,
        /// Mark imported candidates as coming from an unauthenticated origin
        #[arg(long)]
        untrusted: bool,
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// Check whether local packages can be installed together
    Check {
        /// Paths to .deb archives or plain control files
        #[arg(required = true)]
        package_paths: Vec<String>,
        /// Target architecture (default: this machine's architecture)
        #[arg(short, long)]
        arch: Option<String>,
        /// Leave the needed packages staged after an accepted check
        #[arg(long)]
        keep_staged: bool,
        /// Reject the package if any needed package is unauthenticated
        #[arg(long)]
        only_trusted: bool,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// Check whether the build dependencies of a source package can be installed
    BuildDep {
        /// Path to a .dsc file
        dsc_path: String,
        /// Leave the marks in place after an accepted check
        #[arg(long)]
        keep_staged: bool,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// List the files a .deb archive installs
    Files {
        /// Path to a .deb archive
        package_path: String,
    },
    /// Query packages in the catalog
    Query {
        /// Package name pattern (optional, shows all if omitted)
        pattern: Option<String>,
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// Hold a package so it is never staged
    Hold {
        /// Package name
        package_name: String,
        /// Release the hold instead
        #[arg(long)]
        release: bool,
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// List packages currently staged for installation or removal
    Staged {
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
    /// Discard every staged package and removal mark
    Clear {
        /// Database path (default: /var/lib/debcheck/debcheck.db)
        #[arg(short, long, default_value = "/var/lib/debcheck/debcheck.db")]
        db_path: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexArg {
    Status,
    Packages,
}

impl From<IndexArg> for IndexKind {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Status => IndexKind::Status,
            IndexArg::Packages => IndexKind::Packages,
        }
    }
}

/// Load a candidate from a .deb archive or a plain control file
fn load_candidate(path: &str) -> Result<Candidate> {
    let mut magic = [0u8; 7];
    let is_deb = match File::open(path)?.read_exact(&mut magic) {
        Ok(()) => magic == *b"!<arch>",
        Err(_) => false,
    };

    if is_deb || path.ends_with(".deb") {
        Ok(Candidate::from_deb(Path::new(path))?)
    } else {
        Ok(Candidate::from_control(&fs::read_to_string(path)?)?)
    }
}

fn print_verdict(label: &str, verdict: &Verdict) {
    if verdict.accepted {
        println!("{} can be installed", label);
        if verdict.need_packages.is_empty() {
            println!("  No additional packages needed");
        } else {
            println!("  Additional packages needed:");
            for name in &verdict.need_packages {
                println!("    {}", name);
            }
        }
        if !verdict.remove_packages.is_empty() {
            println!("  Packages to remove:");
            for name in &verdict.remove_packages {
                println!("    {}", name);
            }
        }
        return;
    }

    println!("{} cannot be installed", label);
    if let Some(reason) = &verdict.failure_reason {
        println!("  Reason: {}", reason);
    }
    for message in &verdict.failure_messages {
        println!("  {}", message);
    }
    if !verdict.conflicting_installed.is_empty() {
        println!("  Conflicting packages:");
        for name in &verdict.conflicting_installed {
            println!("    {}", name);
        }
    }
}

fn print_changes(changes: &RequiredChanges) {
    if !changes.install.is_empty() {
        println!("Install: {}", changes.install.join(" "));
    }
    if !changes.remove.is_empty() {
        println!("Remove: {}", changes.remove.join(" "));
    }
    if !changes.is_authenticated() {
        println!("Unauthenticated: {}", changes.unauthenticated.join(" "));
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { db_path }) => {
            info!("Initializing debcheck database at: {}", db_path);
            debcheck::db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path);
            Ok(())
        }
        Some(Commands::Import {
            index_path,
            kind,
            untrusted,
            db_path,
        }) => {
            info!("Importing {} from: {}", IndexKind::from(kind).as_str(), index_path);
            let content = repository::read_index(Path::new(&index_path))?;
            let mut db = SqliteDatabase::open(&db_path)?;
            let summary = repository::import_index(
                db.connection_mut(),
                &content,
                kind.into(),
                ImportOptions { trusted: !untrusted },
            )?;

            println!("Imported {} stanza(s) from {}", summary.stanzas, index_path);
            println!("  Installed: {}", summary.installed);
            println!("  Candidates: {}", summary.candidates);
            println!("  Provides: {}", summary.provides);
            println!("  Skipped: {}", summary.skipped);
            Ok(())
        }
        Some(Commands::Check {
            package_paths,
            arch,
            keep_staged,
            only_trusted,
            json,
            db_path,
        }) => {
            let candidates = package_paths
                .iter()
                .map(|path| load_candidate(path))
                .collect::<Result<Vec<_>>>()?;
            let mut db = SqliteDatabase::open(&db_path)?;

            let config = arch.as_deref().map(EngineConfig::new).unwrap_or_default();
            let mut engine = InstallabilityEngine::new(&mut db, config);

            let mut reports = Vec::new();
            let mut rejected = None;
            for candidate in &candidates {
                info!("Checking package: {} {}", candidate.name, candidate.version);
                match engine.compare_to_version_in_cache(candidate, false) {
                    Ok(VersionStatus::Outdated) => warn!(
                        "A later version of {} is available in the repositories",
                        candidate.name
                    ),
                    Ok(_) => {}
                    Err(e) => warn!("Cannot compare {} with the repositories: {}", candidate.name, e),
                }

                // Marks of earlier packages stay staged, so later ones see them
                let verdict = engine.check(candidate);
                if !json {
                    print_verdict(
                        &format!("{} {}", candidate.name, candidate.version),
                        &verdict,
                    );
                }
                let accepted = verdict.accepted;
                reports.push(serde_json::json!({
                    "package": candidate.package_ref(),
                    "verdict": verdict,
                }));
                if !accepted {
                    rejected = Some(candidate.name.clone());
                    break;
                }
            }

            let changes = match rejected {
                None => Some(engine.required_changes_or_clear()?),
                Some(_) => None,
            };
            let untrusted_rejected = only_trusted
                && changes
                    .as_ref()
                    .is_some_and(|changes| !changes.is_authenticated());
            let removal_rejected = changes
                .as_ref()
                .is_some_and(|changes| !changes.remove.is_empty());

            if json {
                let report = serde_json::json!({
                    "packages": reports,
                    "changes": changes,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if let Some(changes) = &changes {
                print_changes(changes);
            }

            if rejected.is_none() && (!keep_staged || untrusted_rejected || removal_rejected) {
                db.clear()?;
            }

            if let Some(name) = rejected {
                return Err(anyhow::anyhow!("{} cannot be installed", name));
            }
            if let Some(changes) = changes.as_ref().filter(|_| removal_rejected) {
                return Err(anyhow::anyhow!(
                    "Remove the following packages before: {}",
                    changes.remove.join(", ")
                ));
            }
            if untrusted_rejected {
                return Err(anyhow::anyhow!(
                    "Packages from unauthenticated origins are needed"
                ));
            }
            Ok(())
        }
        Some(Commands::BuildDep {
            dsc_path,
            keep_staged,
            json,
            db_path,
        }) => {
            info!("Checking build dependencies of: {}", dsc_path);
            let source = SourcePackage::from_path(Path::new(&dsc_path))?;
            let mut db = SqliteDatabase::open(&db_path)?;
            let mut engine = InstallabilityEngine::new(&mut db, EngineConfig::default());

            let verdict = engine.check_source(&source);
            let changes = if verdict.accepted {
                Some(engine.required_changes_or_clear()?)
            } else {
                None
            };

            if json {
                let report = serde_json::json!({
                    "source": source.name,
                    "version": source.version,
                    "binaries": source.binaries,
                    "verdict": verdict,
                    "changes": changes,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if !source.binaries.is_empty() {
                    println!("{} builds {}", source.name, source.binaries.join(", "));
                }
                print_verdict(
                    &format!("Build dependencies of {} {}", source.name, source.version),
                    &verdict,
                );
                if let Some(changes) = &changes {
                    print_changes(changes);
                }
            }

            if verdict.accepted && !keep_staged {
                db.clear()?;
            }
            if !verdict.accepted {
                return Err(anyhow::anyhow!(
                    "Build dependencies of {} cannot be installed",
                    source.name
                ));
            }
            Ok(())
        }
        Some(Commands::Files { package_path }) => {
            for file in deb::read_file_list(Path::new(&package_path))? {
                println!("{}", file);
            }
            Ok(())
        }
        Some(Commands::Query { pattern, db_path }) => {
            let db = SqliteDatabase::open(&db_path)?;

            let records = match pattern {
                Some(pattern) => PackageRecord::search(db.connection(), &pattern)?,
                None => PackageRecord::list_all(db.connection())?,
            };

            if records.is_empty() {
                println!("No packages found.");
            } else {
                for record in &records {
                    print!("  {}", record.name);
                    if let Some(installed) = &record.installed_version {
                        print!(" installed: {}", installed);
                    }
                    if let Some(candidate) = &record.candidate_version {
                        print!(" candidate: {}", candidate);
                    }
                    if let Some(arch) = &record.architecture {
                        print!(" [{}]", arch);
                    }
                    if record.held {
                        print!(" (held)");
                    }
                    println!();
                }
                println!("\nTotal: {} package(s)", records.len());
            }

            Ok(())
        }
        Some(Commands::Hold {
            package_name,
            release,
            db_path,
        }) => {
            let db = SqliteDatabase::open(&db_path)?;
            if !PackageRecord::set_held(db.connection(), &package_name, !release)? {
                return Err(anyhow::anyhow!("Package not found: {}", package_name));
            }
            if release {
                println!("Released hold on {}", package_name);
            } else {
                println!("Holding {}", package_name);
            }
            Ok(())
        }
        Some(Commands::Staged { db_path }) => {
            let db = SqliteDatabase::open(&db_path)?;
            let staged = db.staged()?;
            let removals = db.removals()?;

            if staged.is_empty() && removals.is_empty() {
                println!("No packages staged.");
                return Ok(());
            }
            if !staged.is_empty() {
                println!("Staged packages:");
                for name in &staged {
                    println!("  {}", name);
                }
            }
            if !removals.is_empty() {
                println!("Marked for removal:");
                for name in &removals {
                    println!("  {}", name);
                }
            }
            println!("\nBroken: {}", db.broken_count()?);
            Ok(())
        }
        Some(Commands::Clear { db_path }) => {
            let mut db = SqliteDatabase::open(&db_path)?;
            let staged = db.staged()?.len();
            let removals = db.removals()?.len();
            db.clear()?;
            println!(
                "Cleared {} staged package(s) and {} removal mark(s)",
                staged, removals
            );
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("debcheck local package installability checker");
            println!("Run 'debcheck --help' for usage information");
            Ok(())
        }
    }
}

// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "/var/lib/debcheck/debcheck.db";

fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value(DEFAULT_DB_PATH)
        .help("Database path")
}

fn build_cli() -> Command {
    Command::new("debcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .author("debcheck Contributors")
        .about("Check whether local .deb packages can be installed")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the debcheck database")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Import a dpkg status file or an APT Packages index")
                .arg(Arg::new("index_path").required(true).help("Path to the index file"))
                .arg(
                    Arg::new("kind")
                        .short('k')
                        .long("kind")
                        .value_parser(["status", "packages"])
                        .default_value("packages")
                        .help("Kind of index"),
                )
                .arg(
                    Arg::new("untrusted")
                        .long("untrusted")
                        .action(ArgAction::SetTrue)
                        .help("Mark imported candidates as unauthenticated"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Check whether local packages can be installed together")
                .arg(
                    Arg::new("package_paths")
                        .required(true)
                        .num_args(1..)
                        .help("Paths to .deb archives or control files"),
                )
                .arg(
                    Arg::new("arch")
                        .short('a')
                        .long("arch")
                        .help("Target architecture (default: this machine's)"),
                )
                .arg(
                    Arg::new("keep_staged")
                        .long("keep-staged")
                        .action(ArgAction::SetTrue)
                        .help("Leave needed packages staged after an accepted check"),
                )
                .arg(
                    Arg::new("only_trusted")
                        .long("only-trusted")
                        .action(ArgAction::SetTrue)
                        .help("Reject if any needed package is unauthenticated"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the verdict as JSON"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("build-dep")
                .about("Check whether the build dependencies of a source package can be installed")
                .arg(Arg::new("dsc_path").required(true).help("Path to a .dsc file"))
                .arg(
                    Arg::new("keep_staged")
                        .long("keep-staged")
                        .action(ArgAction::SetTrue)
                        .help("Leave the marks in place after an accepted check"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the verdict as JSON"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("files")
                .about("List the files a .deb archive installs")
                .arg(Arg::new("package_path").required(true).help("Path to a .deb archive")),
        )
        .subcommand(
            Command::new("query")
                .about("Query packages in the catalog")
                .arg(Arg::new("pattern").help("Package name pattern (optional)"))
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("hold")
                .about("Hold a package so it is never staged")
                .arg(Arg::new("package_name").required(true).help("Package name"))
                .arg(
                    Arg::new("release")
                        .long("release")
                        .action(ArgAction::SetTrue)
                        .help("Release the hold instead"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("staged")
                .about("List packages currently staged for installation or removal")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("clear")
                .about("Discard every staged package and removal mark")
                .arg(db_path_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("debcheck.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}

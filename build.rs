// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Options shared by `update` and the `archive` subcommands
fn sync_args() -> Vec<Arg> {
    vec![
        Arg::new("db_path")
            .short('d')
            .long("db-path")
            .value_name("PATH")
            .help("Database path"),
        Arg::new("dry_run")
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .help("Show what would change without touching the store or the database"),
        Arg::new("pass")
            .short('p')
            .long("pass")
            .value_name("PASS")
            .action(ArgAction::Append)
            .help("Only run these passes: db, fs, hooks, hooks.db, hooks.fs (or none)"),
        Arg::new("stage")
            .short('s')
            .long("stage")
            .value_name("STAGE")
            .action(ArgAction::Append)
            .help("Only run these stages: extract, suites, gc"),
        Arg::new("single_transaction")
            .long("single-transaction")
            .value_name("yes|no")
            .help("Hold the whole run in one transaction or commit per package"),
        Arg::new("trigger")
            .short('t')
            .long("trigger")
            .value_name("EVENT/HOOK")
            .action(ArgAction::Append)
            .help("Re-run a hook on every package"),
        Arg::new("expire_days")
            .long("expire-days")
            .value_name("DAYS")
            .help("Minimum age in days before a gone package is removed"),
    ]
}

fn build_cli() -> Command {
    Command::new("srcmirror")
        .version(env!("CARGO_PKG_VERSION"))
        .author("srcmirror Contributors")
        .about("Keep an extracted copy of a Debian source mirror")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file (default: /etc/srcmirror/config.toml if present)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity; RUST_LOG wins if set"),
        )
        .subcommand(
            Command::new("init")
                .about("Initialize the database and the store directories")
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .value_name("PATH")
                        .help("Database path"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Extract new packages, refresh suite mappings, collect gone packages")
                .args(sync_args()),
        )
        .subcommand(
            Command::new("archive")
                .about("Sticky suites kept after they leave the live mirror")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List suites of the archive mirror and which of them are sticky")
                        .args(sync_args()),
                )
                .subcommand(
                    Command::new("add")
                        .about("Make a suite of the archive mirror sticky")
                        .arg(Arg::new("suite").required(true).help("Suite name"))
                        .args(sync_args()),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Drop a sticky suite, removing versions no other suite needs")
                        .arg(Arg::new("suite").required(true).help("Suite name"))
                        .args(sync_args()),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("srcmirror.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}

#![allow(clippy::multiple_crate_versions)]

//! Terrapaper - desktop background renderer.
//!
//! This binary serves as both the daemon and the CLI:
//! - When called with no arguments or with `run`: runs the daemon
//! - When called with subcommands (e.g., `terrapaper cache list`): runs CLI commands

fn main() {
    if let Err(err) = terrapaper_lib::cli::run() {
        eprintln!("terrapaper: {err}");
        std::process::exit(1);
    }
}

//! CLI surface: a top-level `clap::Parser` with one subcommand per
//! operation, `indicatif`/`console` for progress display.

mod commands;

pub use commands::{run, Cli};

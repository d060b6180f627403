//! # tasklib-cli
//!
//! The `tasklib` binary: `init`, `worker`, and `submit-task` subcommands.
//! Thin wrappers around `tasklib-core`/`tasklib-postgres`/`tasklib-worker`
//! plus the config/arg-parsing glue that's specific to a command line.

pub mod args;
pub mod config;
pub mod error;
pub mod modules;

pub use error::CliError;

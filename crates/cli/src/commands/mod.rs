//! Subcommand implementations
//!
//! Each command returns an [`ExitCode`](crate::exit_code::ExitCode) and
//! prints through the shared formatter.

pub mod alias;
pub mod get;

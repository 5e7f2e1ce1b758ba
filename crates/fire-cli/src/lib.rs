//! # fire-cli
//!
//! Command-line front end for `fire-wireguard`.
//!
//! Provides commands for:
//! - Generating a hub-and-spoke mesh (`generate`)
//! - Key handling (`genkey`, `pubkey`, `genpsk`)
//! - Converting between JSON and `wg-quick` configs (`render`, `parse`)
//!
//! Generation output goes to stdout as JSON; logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands, GenerateArgs};
pub use error::CliError;

//! Subcommands.

pub mod check_zip;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod file;
pub mod metadata;
pub mod migrate;

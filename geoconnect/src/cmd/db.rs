//! `db` subcommand for interaction with the database.

use geoconnect_common::prelude::*;
use std::process;
use structopt::StructOpt;

/// Commands for interacting with the database.
#[derive(Debug, StructOpt)]
pub enum Opt {
    /// Access the database console.
    #[structopt(name = "console")]
    Console,
    /// Print out a URL for connecting to the database.
    #[structopt(name = "url")]
    Url,
}

/// Run the `db` subcommand.
pub fn run(settings: &Settings, opt: &Opt) -> Result<()> {
    match opt {
        Opt::Console => run_console(settings),
        Opt::Url => run_url(settings),
    }
}

/// Connect to the database console.
fn run_console(settings: &Settings) -> Result<()> {
    let status = process::Command::new("psql")
        .arg(&settings.database_url)
        .status()
        .context("error starting psql")?;
    if !status.success() {
        return Err(format_err!("psql exited with {}", status));
    }
    Ok(())
}

/// Print out the database URL, password included.
fn run_url(settings: &Settings) -> Result<()> {
    println!("{}", settings.database_url);
    Ok(())
}

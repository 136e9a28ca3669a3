//! The `migrate` subcommand.

use geoconnect_common::{
    db::{self, ConnectVia},
    prelude::*,
};

/// Run the `migrate` subcommand.
pub fn run(settings: &Settings) -> Result<()> {
    let conn = db::connect(settings, ConnectVia::Cli)?;
    db::run_pending_migrations(&conn)
}

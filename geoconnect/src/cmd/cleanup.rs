//! The `cleanup` subcommand.

use geoconnect_common::{
    db::{self, ConnectVia},
    humantime_serde::re::humantime,
    prelude::*,
    services::cleanup,
};

/// Run the `cleanup` subcommand.
pub fn run(settings: &Settings, dry_run: bool) -> Result<()> {
    let conn = db::connect(settings, ConnectVia::Cli)?;
    let report = cleanup(settings, Utc::now().naive_utc(), dry_run, &conn)?;

    let verb = if dry_run { "would remove" } else { "removed" };
    for md5 in &report.removed {
        println!("{} {}", verb, md5);
    }
    println!(
        "{} {} files older than {}",
        verb,
        report.removed.len(),
        humantime::format_duration(settings.file_retention),
    );
    if !report.failed.is_empty() {
        return Err(format_err!(
            "could not remove {} files: {}",
            report.failed.len(),
            report.failed.join(", "),
        ));
    }
    Ok(())
}

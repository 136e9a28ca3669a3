//! A background thread which deletes old uploads.
//!
//! All state lives in PostgreSQL and on disk, so it's fine if more than one
//! server runs a janitor. Each pass only deletes files which are already past
//! the retention window.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    process, thread,
};

use geoconnect_common::prelude::{error, warn};
use geoconnect_common::{
    db, errors::DisplayCausesAndBacktraceExt, prelude::*, services::cleanup,
};

use crate::util::SharedServices;

/// Spawn a thread and run the janitor in it. This runs until the process
/// exits.
#[instrument(level = "trace", skip_all)]
pub fn start_janitor(
    services: SharedServices,
    pool: db::Pool,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("janitor".to_owned())
        .spawn(move || run_janitor_wrapper(&services.settings, &pool))
        .context("could not create janitor thread")
}

/// Run the janitor, and abort the whole server if it panics.
fn run_janitor_wrapper(settings: &Settings, pool: &db::Pool) {
    if let Err(err) = catch_unwind(AssertUnwindSafe(|| run_janitor(settings, pool))) {
        let msg = if let Some(msg) = err.downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = err.downcast_ref::<String>() {
            msg
        } else {
            "an unknown panic occurred"
        };
        error!("JANITOR PANIC, aborting: {}", msg);
        eprintln!("JANITOR PANIC, aborting: {}", msg);
        process::abort();
    }
}

fn run_janitor(settings: &Settings, pool: &db::Pool) {
    loop {
        // Errors are retried on the next pass.
        if let Err(err) = clean_once(settings, pool) {
            error!(
                "error cleaning up old files (will retry later): {}",
                err.display_causes_and_backtrace()
            );
        }
        thread::sleep(settings.cleanup_interval);
    }
}

#[instrument(level = "debug", skip_all)]
fn clean_once(settings: &Settings, pool: &db::Pool) -> Result<()> {
    let conn = pool.get().context("could not get database connection")?;
    let report = cleanup(settings, Utc::now().naive_utc(), false, &conn)?;
    if !report.failed.is_empty() {
        warn!("could not remove {} old files", report.failed.len());
    }
    Ok(())
}

//! Routes for resetting a test server. They do nothing unless
//! `GEOCONNECT_DEBUG` is on.

use geoconnect_common::prelude::*;
use geoconnect_common::prelude::warn;
use geoconnect_common::services::cleanup::delete_all_files;
use rocket::State;

use crate::util::{DbConn, GeoconnectdResult, SharedServices, User};

/// Returned when debug mode is off.
pub const ONLY_FOR_TESTING: &str = "only for testing!";

/// Delete every uploaded file, with everything that belongs to it.
#[post("/admin/delete-files")]
pub async fn delete_files(
    _user: User,
    state: &State<SharedServices>,
    db: DbConn,
) -> GeoconnectdResult<String> {
    if !state.settings.debug {
        return Ok(ONLY_FOR_TESTING.to_owned());
    }
    let settings = state.settings.clone();
    db.run(move |conn| {
        let shapefiles = delete_all_files(FileKind::Shapefile, &settings, conn)?;
        let tables = delete_all_files(FileKind::Tabular, &settings, conn)?;
        warn!("deleted {} shapefiles and {} tables", shapefiles, tables);
        Ok(format!(
            "Deleted {} shapefiles and {} tabular files.",
            shapefiles, tables
        ))
    })
    .await
}

/// Delete every import attempt.
#[post("/admin/delete-import-attempts")]
pub async fn delete_import_attempts(
    _user: User,
    state: &State<SharedServices>,
    db: DbConn,
) -> GeoconnectdResult<String> {
    if !state.settings.debug {
        return Ok(ONLY_FOR_TESTING.to_owned());
    }
    db.run(|conn| {
        let count = WorldMapImportAttempt::delete_all(conn)?;
        warn!("deleted {} import attempts", count);
        Ok(format!("Deleted {} import attempts.", count))
    })
    .await
}

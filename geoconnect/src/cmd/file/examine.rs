//! The `file examine` subcommand.

use geoconnect_common::{
    prelude::*,
    serde_json,
    services::{examine_shapefile, ingest_tabular, ViewMode},
};

use super::find_file;

/// The `file examine` subcommand. Shapefiles are checked the way the
/// shapefile page checks them. Tables are summarized if they haven't been
/// already.
pub fn run(md5: &str, settings: &Settings, conn: &PgConnection) -> Result<()> {
    let mut file = find_file(md5, conn)?;
    let json = match file.file_kind {
        FileKind::Shapefile => {
            let exam = examine_shapefile(&mut file, ViewMode::Normal, settings, conn)?;
            serde_json::to_string_pretty(&exam)?
        }
        FileKind::Tabular => {
            let info = ingest_tabular(&file, settings, conn)?;
            serde_json::to_string_pretty(&info)?
        }
    };
    println!("{}", json);
    Ok(())
}

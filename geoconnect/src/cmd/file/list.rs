//! The `file list` subcommand.

use geoconnect_common::prelude::*;
use prettytable::{format::consts::FORMAT_CLEAN, row, Table};

/// The `file list` subcommand.
pub fn run(kind: Option<FileKind>, conn: &PgConnection) -> Result<()> {
    let files = GisDataFile::list(kind, conn)?;

    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.add_row(row!["MD5", "KIND", "LABEL", "DATASET", "UPDATED_AT"]);
    for file in files {
        table.add_row(row![
            &file.md5,
            file.file_kind,
            &file.datafile_label,
            &file.dataset_name,
            file.updated_at,
        ]);
    }

    table.printstd();
    Ok(())
}

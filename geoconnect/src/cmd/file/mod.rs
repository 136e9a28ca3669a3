//! The `file` subcommand.

use geoconnect_common::{
    db::{self, ConnectVia},
    prelude::*,
};
use structopt::StructOpt;

mod describe;
mod examine;
mod list;

/// Commands for inspecting uploaded files.
#[derive(Debug, StructOpt)]
pub enum Opt {
    /// Describe a file, its checks, and its layers.
    #[structopt(name = "describe")]
    Describe {
        /// The file's MD5 identifier, as shown by `file list`.
        md5: String,
    },

    /// Check a file now, as the web pages would, and print the result as
    /// JSON.
    #[structopt(name = "examine")]
    Examine {
        /// The file's MD5 identifier.
        md5: String,
    },

    /// List uploaded files, newest first.
    #[structopt(name = "list")]
    List {
        /// Only list files of this kind (`shapefile` or `tabular`).
        #[structopt(long = "kind")]
        kind: Option<FileKind>,
    },
}

/// Run the `file` subcommand.
pub fn run(settings: &Settings, opt: &Opt) -> Result<()> {
    let conn = db::connect(settings, ConnectVia::Cli)?;
    match opt {
        Opt::Describe { md5 } => describe::run(md5, &conn),
        Opt::Examine { md5 } => examine::run(md5, settings, &conn),
        Opt::List { kind } => list::run(*kind, &conn),
    }
}

/// Look up a file by MD5, failing if it doesn't exist.
fn find_file(md5: &str, conn: &PgConnection) -> Result<GisDataFile> {
    GisDataFile::find_by_md5(md5, conn)?.ok_or_else(|| format_err!("no file with MD5 {}", md5))
}

//! Command-line tool for administering a GeoConnect installation.

use geoconnect_common::{prelude::*, quick_main, tracing_support::initialize_tracing};
use structopt::StructOpt;

mod cmd;

/// Command-line options, parsed using `structopt`.
#[derive(Debug, StructOpt)]
#[structopt(about = "Administer GeoConnect, which maps Dataverse files using WorldMap.")]
enum Opt {
    /// Check a zip file for a single complete shapefile set.
    #[structopt(name = "check-zip")]
    CheckZip {
        /// Path to the zip file.
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },

    /// Remove data files which haven't been touched recently.
    #[structopt(name = "cleanup")]
    Cleanup {
        /// Only list what would be removed.
        #[structopt(long = "dry-run")]
        dry_run: bool,
    },

    /// Configuration commands.
    #[structopt(name = "config")]
    Config {
        #[structopt(subcommand)]
        cmd: cmd::config::Opt,
    },

    /// Commands for accessing the database.
    #[structopt(name = "db")]
    Db {
        #[structopt(subcommand)]
        cmd: cmd::db::Opt,
    },

    /// Commands for inspecting uploaded files.
    #[structopt(name = "file")]
    File {
        #[structopt(subcommand)]
        cmd: cmd::file::Opt,
    },

    /// Commands for the layer metadata we store in Dataverse.
    #[structopt(name = "metadata")]
    Metadata {
        #[structopt(subcommand)]
        cmd: cmd::metadata::Opt,
    },

    /// Migrate GeoConnect's database schema to the latest version.
    #[structopt(name = "migrate")]
    Migrate,
}

fn run() -> Result<()> {
    openssl_probe::init_ssl_cert_env_vars();
    initialize_tracing();
    let opt = Opt::from_args();
    debug!("Args: {:?}", opt);

    match opt {
        // Works without any configuration.
        Opt::CheckZip { ref path } => cmd::check_zip::run(path),
        opt => {
            let settings = Settings::from_env()?;
            run_configured(&settings, &opt)
        }
    }
}

fn run_configured(settings: &Settings, opt: &Opt) -> Result<()> {
    match opt {
        Opt::CheckZip { path } => cmd::check_zip::run(path),
        Opt::Cleanup { dry_run } => cmd::cleanup::run(settings, *dry_run),
        Opt::Config { cmd } => cmd::config::run(settings, cmd),
        Opt::Db { cmd } => cmd::db::run(settings, cmd),
        Opt::File { cmd } => cmd::file::run(settings, cmd),
        Opt::Metadata { cmd } => cmd::metadata::run(settings, cmd),
        Opt::Migrate => cmd::migrate::run(settings),
    }
}

quick_main!(run);

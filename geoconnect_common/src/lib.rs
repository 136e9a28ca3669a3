//! Code shared between the GeoConnect web application and its admin CLI.
//!
//! GeoConnect takes GIS files belonging to a Dataverse installation, checks
//! them, sends them to WorldMap to be turned into map layers, and reports the
//! resulting layer metadata back to Dataverse.

#![warn(missing_docs)]

#[macro_use]
pub extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub use cast;
pub use chrono;
pub use humantime_serde;
pub use semver;
pub use serde_json;
pub use tracing;
pub use url;

pub mod config;
pub mod dataverse;
pub mod db;
pub mod errors;
pub mod forms;
pub mod message;
pub mod models;
pub mod remote;
pub mod render;
#[allow(missing_docs, unused_imports)]
mod schema;
pub mod scratch;
pub mod services;
pub mod shapefile;
pub mod signing;
pub mod tabular;
pub mod tracing_support;
pub mod worldmap;

/// Common imports used by many modules.
pub mod prelude {
    pub use anyhow::{format_err, Context as _};
    pub use chrono::{NaiveDateTime, Utc};
    pub use diesel::{self, prelude::*, PgConnection};
    pub use serde::{Deserialize, Serialize};
    pub use std::{
        collections::{BTreeMap, HashMap},
        fmt,
        fs::{self, File},
        io::{self, Read, Write},
        path::{Path, PathBuf},
    };
    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use super::config::Settings;
    pub use super::models::*;
    pub use super::{Error, Result};
}

/// Error type for this crate's functions.
pub use anyhow::Error;

/// Result type for this crate's functions.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// The version of `geoconnect_common` linked into this binary. The server
/// reports this from `/version`.
pub fn geoconnect_common_version() -> semver::Version {
    semver::Version::parse(env!("CARGO_PKG_VERSION"))
        .expect("could not parse built-in version")
}

#[test]
fn version_matches_cargo() {
    assert_eq!(
        geoconnect_common_version().to_string(),
        env!("CARGO_PKG_VERSION")
    );
}

//! Workflows which combine our database, our files, and the remote APIs.
//!
//! Everything here blocks, so async callers must run it on a blocking
//! thread.

use crate::dataverse::MetadataUpdater;
use crate::prelude::*;
use crate::worldmap::WorldMapClient;

pub mod cleanup;
pub mod maps;
pub mod shapefile;
pub mod tabular;

pub use self::cleanup::{cleanup, CleanupReport};
pub use self::maps::delete_map;
pub use self::shapefile::{
    classify_layer, examine_shapefile, visualize_shapefile, Examination, ExamineProblem, Step,
    ViewMode, VisualizeOutcome,
};
pub use self::tabular::{
    choose_join_target, ingest_tabular, join_targets, map_lat_lng, map_table_join,
};

/// Clients for the servers we talk to.
pub struct Remotes {
    /// The WorldMap server.
    pub worldmap: WorldMapClient,
    /// The Dataverse server.
    pub dataverse: MetadataUpdater,
}

impl Remotes {
    /// Create clients using our settings.
    pub fn from_settings(settings: &Settings) -> Result<Remotes> {
        Ok(Remotes {
            worldmap: WorldMapClient::new(settings)?,
            dataverse: MetadataUpdater::new(settings)?,
        })
    }
}

/// Send `layer`'s metadata to Dataverse and record whether it worked.
pub fn push_metadata(
    layer: &mut WorldMapLayerInfo,
    file: &GisDataFile,
    dataverse: &MetadataUpdater,
    conn: &PgConnection,
) -> Result<()> {
    match dataverse.send_info_to_dataverse(layer, file) {
        Ok(_) => layer.mark_dv_metadata_updated(true, conn),
        Err(err) => {
            layer.mark_dv_metadata_updated(false, conn)?;
            Err(err.context(format!(
                "could not send metadata for {} to Dataverse",
                layer.layer_name
            )))
        }
    }
}

/// Like `push_metadata`, but a failure is only logged. The layer exists on
/// WorldMap either way, and `geoconnect metadata push` can retry.
fn push_metadata_or_warn(
    layer: &mut WorldMapLayerInfo,
    file: &GisDataFile,
    dataverse: &MetadataUpdater,
    conn: &PgConnection,
) {
    if let Err(err) = push_metadata(layer, file, dataverse, conn) {
        warn!("{:#}", err);
    }
}

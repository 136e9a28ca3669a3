//! The `metadata` subcommand, for repairing the layer metadata we keep in
//! Dataverse.

use geoconnect_common::{
    dataverse::MetadataUpdater,
    db::{self, ConnectVia},
    prelude::*,
    services::push_metadata,
};
use structopt::StructOpt;

/// Commands for the layer metadata we store in Dataverse.
#[derive(Debug, StructOpt)]
pub enum Opt {
    /// Send a layer's metadata to Dataverse again.
    #[structopt(name = "push")]
    Push {
        /// The layer's MD5 identifier.
        layer_md5: String,
    },

    /// Remove a layer's metadata from Dataverse. The WorldMap layer is left
    /// alone.
    #[structopt(name = "delete")]
    Delete {
        /// The layer's MD5 identifier.
        layer_md5: String,
    },
}

/// Run the `metadata` subcommand.
pub fn run(settings: &Settings, opt: &Opt) -> Result<()> {
    let conn = db::connect(settings, ConnectVia::Cli)?;
    let dataverse = MetadataUpdater::new(settings)?;
    match opt {
        Opt::Push { layer_md5 } => {
            let (file, mut layer) = find_layer(layer_md5, &conn)?;
            push_metadata(&mut layer, &file, &dataverse, &conn)?;
            println!("sent metadata for {} to Dataverse", layer.layer_name);
        }
        Opt::Delete { layer_md5 } => {
            let (file, mut layer) = find_layer(layer_md5, &conn)?;
            dataverse.delete_metadata_from_dataverse(&file)?;
            layer.mark_dv_metadata_updated(false, &conn)?;
            println!("removed metadata for {} from Dataverse", layer.layer_name);
        }
    }
    Ok(())
}

/// Look up a layer and the file it was made from.
fn find_layer(md5: &str, conn: &PgConnection) -> Result<(GisDataFile, WorldMapLayerInfo)> {
    let layer = WorldMapLayerInfo::find_by_md5(md5, conn)?
        .ok_or_else(|| format_err!("no map layer with MD5 {}", md5))?;
    let file = GisDataFile::find(layer.gis_data_file_id, conn)?;
    Ok((file, layer))
}

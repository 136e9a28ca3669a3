//! Deleting map layers.

use crate::forms::DataverseInfo;
use crate::prelude::*;

use super::Remotes;

/// Delete a layer from WorldMap, remove its metadata from Dataverse, and
/// then forget about it locally. Any remote failure stops the deletion, so
/// the local record survives for another try.
#[instrument(level = "info", skip_all, fields(layer = %layer.layer_name))]
pub fn delete_map(
    file: &GisDataFile,
    layer: &WorldMapLayerInfo,
    remotes: &Remotes,
    conn: &PgConnection,
) -> Result<()> {
    match layer.layer_kind {
        LayerKind::Shapefile => remotes
            .worldmap
            .delete_layer(&layer.layer_name, &DataverseInfo::from(file))?,
        LayerKind::TabularJoin => {
            let id = layer
                .tablejoin_id()
                .ok_or_else(|| format_err!("layer {} has no tablejoin_id", layer.md5))?;
            remotes.worldmap.delete_tablejoin(id)?
        }
        LayerKind::TabularLatLng => {
            let id = layer
                .datatable_id()
                .ok_or_else(|| format_err!("layer {} has no datatable_id", layer.md5))?;
            remotes.worldmap.delete_datatable(id)?
        }
    }
    info!("deleted {} from WorldMap", layer.layer_name);

    remotes.dataverse.delete_metadata_from_dataverse(file)?;
    layer.delete(conn)
}

use serde_json::{json, Value};

use crate::prelude::*;
use crate::schema::*;
use crate::worldmap::{LatLngResult, MapLayerMetadata, TableJoinResult};

/// A WorldMap layer made from one of our files.
#[derive(Associations, Clone, Debug, Identifiable, Queryable, Serialize)]
#[belongs_to(GisDataFile, foreign_key = "gis_data_file_id")]
#[table_name = "worldmap_layer_infos"]
pub struct WorldMapLayerInfo {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// When this record was last updated.
    pub updated_at: NaiveDateTime,
    /// Our public identifier, used in URLs.
    pub md5: String,
    /// The file the layer was made from.
    pub gis_data_file_id: i32,
    /// The import attempt which made this layer, for shapefiles.
    pub import_attempt_id: Option<i32>,
    /// How the layer was made.
    pub layer_kind: LayerKind,
    /// WorldMap's name for the layer.
    pub layer_name: String,
    /// Link to the layer's page.
    pub layer_link: String,
    /// Link to an embeddable map.
    pub embed_map_link: String,
    /// Link to a map thumbnail.
    pub map_image_link: String,
    /// The WorldMap account owning the layer.
    pub worldmap_username: String,
    /// Attribute names and types.
    pub attribute_info: Value,
    /// Download links by format.
    pub download_links: Value,
    /// For tabular layers, a summary of the join or mapping.
    pub join_description: String,
    /// Everything WorldMap sent us.
    pub core_data: Value,
    /// Has Dataverse accepted our latest metadata?
    pub dv_metadata_updated: bool,
}

impl WorldMapLayerInfo {
    /// Find a layer by its public identifier.
    pub fn find_by_md5(md5: &str, conn: &PgConnection) -> Result<Option<WorldMapLayerInfo>> {
        worldmap_layer_infos::table
            .filter(worldmap_layer_infos::md5.eq(md5))
            .first(conn)
            .optional()
            .with_context(|| format!("could not look up layer {}", md5))
    }

    /// The newest layer for `file`, if any.
    pub fn latest_for_file(
        file: &GisDataFile,
        conn: &PgConnection,
    ) -> Result<Option<WorldMapLayerInfo>> {
        WorldMapLayerInfo::belonging_to(file)
            .order_by((
                worldmap_layer_infos::updated_at.desc(),
                worldmap_layer_infos::id.desc(),
            ))
            .first(conn)
            .optional()
            .with_context(|| format!("could not load layers for {}", file.md5))
    }

    /// The layer made by `attempt`, if it succeeded.
    pub fn for_attempt(
        attempt: &WorldMapImportAttempt,
        conn: &PgConnection,
    ) -> Result<Option<WorldMapLayerInfo>> {
        worldmap_layer_infos::table
            .filter(worldmap_layer_infos::import_attempt_id.eq(attempt.id))
            .order_by(worldmap_layer_infos::id.desc())
            .first(conn)
            .optional()
            .context("could not load layer for import attempt")
    }

    /// Every layer for `file`.
    pub fn all_for_file(file: &GisDataFile, conn: &PgConnection) -> Result<Vec<WorldMapLayerInfo>> {
        WorldMapLayerInfo::belonging_to(file)
            .order_by(worldmap_layer_infos::updated_at.desc())
            .load(conn)
            .with_context(|| format!("could not load layers for {}", file.md5))
    }

    /// Record whether Dataverse accepted our metadata.
    pub fn mark_dv_metadata_updated(&mut self, updated: bool, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(
            worldmap_layer_infos::table.filter(worldmap_layer_infos::id.eq(self.id)),
        )
        .set(worldmap_layer_infos::dv_metadata_updated.eq(updated))
        .get_result(conn)
        .context("could not record Dataverse metadata status")?;
        Ok(())
    }

    /// Replace our metadata with fresh metadata from WorldMap, such as after
    /// restyling the layer.
    pub fn update_from_metadata(
        &mut self,
        metadata: &MapLayerMetadata,
        conn: &PgConnection,
    ) -> Result<()> {
        let core_data = serde_json::to_value(metadata).context("could not serialize metadata")?;
        *self = diesel::update(
            worldmap_layer_infos::table.filter(worldmap_layer_infos::id.eq(self.id)),
        )
        .set((
            worldmap_layer_infos::layer_link.eq(&metadata.layer_link),
            worldmap_layer_infos::embed_map_link.eq(&metadata.embed_map_link),
            worldmap_layer_infos::map_image_link.eq(&metadata.map_image_link),
            worldmap_layer_infos::attribute_info.eq(&metadata.attribute_info),
            worldmap_layer_infos::download_links.eq(&metadata.download_links),
            worldmap_layer_infos::core_data.eq(core_data),
            worldmap_layer_infos::dv_metadata_updated.eq(false),
        ))
        .get_result(conn)
        .context("could not update layer metadata")?;
        Ok(())
    }

    /// Delete this record.
    pub fn delete(&self, conn: &PgConnection) -> Result<()> {
        diesel::delete(worldmap_layer_infos::table.filter(worldmap_layer_infos::id.eq(self.id)))
            .execute(conn)
            .with_context(|| format!("could not delete layer {}", self.md5))?;
        Ok(())
    }

    /// The uploaded table's ID, for tabular layers.
    pub fn datatable_id(&self) -> Option<i64> {
        let key = match self.layer_kind {
            LayerKind::TabularJoin => "table_id",
            LayerKind::TabularLatLng => "datatable_id",
            LayerKind::Shapefile => return None,
        };
        self.core_data.get(key).and_then(|v| v.as_i64())
    }

    /// The table join's ID, for joined layers.
    pub fn tablejoin_id(&self) -> Option<i64> {
        match self.layer_kind {
            LayerKind::TabularJoin => self.core_data.get("tablejoin_id").and_then(|v| v.as_i64()),
            _ => None,
        }
    }

    /// Generate a sample value for testing.
    pub fn factory(file: &GisDataFile, layer_kind: LayerKind) -> Self {
        let now = Utc::now().naive_utc();
        let layer_name = "geonode:boston_income_01".to_owned();
        WorldMapLayerInfo {
            id: 1,
            created_at: now,
            updated_at: now,
            md5: record_md5(1, &layer_name),
            gis_data_file_id: file.id,
            import_attempt_id: None,
            layer_kind,
            layer_link: format!("https://worldmap.example.edu/data/{}", layer_name),
            embed_map_link: format!(
                "https://worldmap.example.edu/maps/embed/?layer={}",
                layer_name
            ),
            map_image_link: "https://worldmap.example.edu/download/wms/1/png".to_owned(),
            worldmap_username: "mapper".to_owned(),
            attribute_info: json!([
                {"name": "TRACT", "type": "xsd:string"},
                {"name": "INCOME", "type": "xsd:int"},
            ]),
            download_links: json!({
                "png": "https://worldmap.example.edu/download/wms/1/png",
                "zip": "https://worldmap.example.edu/download/wfs/1/zip",
            }),
            join_description: String::new(),
            core_data: json!({"table_id": 12, "tablejoin_id": 34, "datatable_id": 12}),
            dv_metadata_updated: true,
            layer_name,
        }
    }
}

/// Data required to create a new `WorldMapLayerInfo`.
#[derive(Debug, Insertable)]
#[table_name = "worldmap_layer_infos"]
pub struct NewWorldMapLayerInfo {
    /// The file the layer was made from.
    pub gis_data_file_id: i32,
    /// The import attempt which made this layer.
    pub import_attempt_id: Option<i32>,
    /// How the layer was made.
    pub layer_kind: LayerKind,
    /// WorldMap's name for the layer.
    pub layer_name: String,
    /// Link to the layer's page.
    pub layer_link: String,
    /// Link to an embeddable map.
    pub embed_map_link: String,
    /// Link to a map thumbnail.
    pub map_image_link: String,
    /// The WorldMap account owning the layer.
    pub worldmap_username: String,
    /// Attribute names and types.
    pub attribute_info: Value,
    /// Download links by format.
    pub download_links: Value,
    /// A summary of the join or mapping.
    pub join_description: String,
    /// Everything WorldMap sent us.
    pub core_data: Value,
}

impl NewWorldMapLayerInfo {
    fn from_layer(
        file: &GisDataFile,
        layer_kind: LayerKind,
        layer: &MapLayerMetadata,
        core_data: Value,
    ) -> NewWorldMapLayerInfo {
        NewWorldMapLayerInfo {
            gis_data_file_id: file.id,
            import_attempt_id: None,
            layer_kind,
            layer_name: layer.layer_name.clone(),
            layer_link: layer.layer_link.clone(),
            embed_map_link: layer.embed_map_link.clone(),
            map_image_link: layer.map_image_link.clone(),
            worldmap_username: layer.worldmap_username.clone(),
            attribute_info: layer.attribute_info.clone(),
            download_links: layer.download_links.clone(),
            join_description: layer.join_description.clone(),
            core_data,
        }
    }

    /// A layer imported from a shapefile.
    pub fn from_shapefile_import(
        file: &GisDataFile,
        attempt: &WorldMapImportAttempt,
        metadata: &MapLayerMetadata,
    ) -> Result<NewWorldMapLayerInfo> {
        let core_data = serde_json::to_value(metadata).context("could not serialize metadata")?;
        let mut new = Self::from_layer(file, LayerKind::Shapefile, metadata, core_data);
        new.import_attempt_id = Some(attempt.id);
        Ok(new)
    }

    /// A layer made by joining a table.
    pub fn from_table_join(
        file: &GisDataFile,
        result: &TableJoinResult,
    ) -> Result<NewWorldMapLayerInfo> {
        let core_data = serde_json::to_value(result).context("could not serialize join result")?;
        let mut new = Self::from_layer(file, LayerKind::TabularJoin, &result.layer, core_data);
        if new.join_description.is_empty() {
            new.join_description = format!(
                "{} of {} records matched",
                result.matched_records_count,
                result.matched_records_count + result.unmatched_records_count,
            );
        }
        Ok(new)
    }

    /// A layer made by mapping latitude and longitude columns.
    pub fn from_lat_lng(file: &GisDataFile, result: &LatLngResult) -> Result<NewWorldMapLayerInfo> {
        let core_data = serde_json::to_value(result).context("could not serialize lat/lng result")?;
        let mut new = Self::from_layer(file, LayerKind::TabularLatLng, &result.layer, core_data);
        if new.join_description.is_empty() {
            new.join_description = format!(
                "{} of {} records mapped",
                result.mapped_record_count,
                result.mapped_record_count + result.unmapped_record_count,
            );
        }
        Ok(new)
    }

    /// Insert a new layer, then fill in its `md5` now that we know its ID.
    pub fn insert(&self, conn: &PgConnection) -> Result<WorldMapLayerInfo> {
        conn.transaction::<_, Error, _>(|| {
            let layer: WorldMapLayerInfo = diesel::insert_into(worldmap_layer_infos::table)
                .values(self)
                .get_result(conn)
                .context("error inserting layer info")?;
            let md5 = record_md5(layer.id, &layer.layer_name);
            Ok(diesel::update(
                worldmap_layer_infos::table.filter(worldmap_layer_infos::id.eq(layer.id)),
            )
            .set(worldmap_layer_infos::md5.eq(&md5))
            .get_result(conn)
            .context("error setting layer md5")?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_ids_come_from_core_data() {
        let file = GisDataFile::factory(FileKind::Tabular);
        let join = WorldMapLayerInfo::factory(&file, LayerKind::TabularJoin);
        assert_eq!(join.datatable_id(), Some(12));
        assert_eq!(join.tablejoin_id(), Some(34));
        let shp = WorldMapLayerInfo::factory(&file, LayerKind::Shapefile);
        assert_eq!(shp.datatable_id(), None);
        assert_eq!(shp.tablejoin_id(), None);
    }

    #[test]
    fn join_descriptions_are_filled_in() {
        let file = GisDataFile::factory(FileKind::Tabular);
        let result: TableJoinResult = serde_json::from_value(json!({
            "table_id": 12,
            "tablejoin_id": 34,
            "matched_records_count": 170,
            "unmatched_records_count": 10,
            "layer_name": "geonode:join_income",
            "layer_link": "https://worldmap.example.edu/data/geonode:join_income",
            "embed_map_link": "https://worldmap.example.edu/maps/embed/?layer=geonode:join_income",
            "worldmap_username": "mapper",
        }))
        .unwrap();
        let new = NewWorldMapLayerInfo::from_table_join(&file, &result).unwrap();
        assert_eq!(new.layer_kind, LayerKind::TabularJoin);
        assert_eq!(new.join_description, "170 of 180 records matched");
        assert_eq!(new.core_data["tablejoin_id"], 34);
    }
}

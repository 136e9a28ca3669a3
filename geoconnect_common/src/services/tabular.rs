//! Mapping tabular files, either by joining them to an existing WorldMap
//! layer or by plotting latitude and longitude columns.

use crate::forms::{ChooseSingleColumn, FormErrors, LatLngColumns};
use crate::prelude::*;
use crate::tabular::summarize;
use crate::worldmap::{JoinTarget, LatLngRequest, TableJoinRequest};

use super::{push_metadata_or_warn, Remotes};

/// Read the header of a newly uploaded table and record what we found.
/// Files we can't read are recorded too, so we only try once.
#[instrument(level = "debug", skip_all, fields(file = %file.md5))]
pub fn ingest_tabular(
    file: &GisDataFile,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<TabularFileInfo> {
    if let Some(info) = TabularFileInfo::find_for_file(file, conn)? {
        return Ok(info);
    }
    let summary = file
        .dv_file_fullpath(settings)
        .ok_or_else(|| format_err!("{} has no stored file", file.md5))
        .and_then(|path| summarize(&path));
    let new = match summary {
        Ok(summary) => {
            debug!(
                "{} has {} columns and {} rows",
                file.md5, summary.num_columns, summary.num_rows
            );
            NewTabularFileInfo::from_summary(file, &summary)
        }
        Err(err) => {
            warn!("could not read table {}: {:#}", file.md5, err);
            NewTabularFileInfo::unreadable(file)
        }
    };
    new.insert(conn)
}

/// Layers a table can be joined to.
pub fn join_targets(remotes: &Remotes, geocode_type: Option<&str>) -> Result<Vec<JoinTarget>> {
    remotes.worldmap.join_targets(geocode_type)
}

fn layer_title(file: &GisDataFile) -> String {
    file.display_name()
}

fn layer_abstract(file: &GisDataFile) -> String {
    if file.dataset_citation.trim().is_empty() {
        format!("Data from {}", file.dataset_name)
    } else {
        file.dataset_citation.clone()
    }
}

fn readable_table(
    info: &TabularFileInfo,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<(GisDataFile, PathBuf)> {
    if !info.is_file_readable {
        return Err(format_err!("tabular file {} could not be read", info.id));
    }
    let file = info.gis_data_file(conn)?;
    let path = file
        .dv_file_fullpath(settings)
        .ok_or_else(|| format_err!("{} has no stored file", file.md5))?;
    Ok((file, path))
}

/// Make a point layer from a table's latitude and longitude columns.
#[instrument(level = "info", skip_all, fields(tabular_file_info = info.id))]
pub fn map_lat_lng(
    info: &TabularFileInfo,
    columns: &LatLngColumns,
    remotes: &Remotes,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<WorldMapLayerInfo> {
    let (file, path) = readable_table(info, settings, conn)?;
    let request = LatLngRequest {
        title: layer_title(&file),
        abstract_text: layer_abstract(&file),
        delimiter: info.delimiter.clone(),
        lat_attribute: columns.latitude.clone(),
        lng_attribute: columns.longitude.clone(),
    };
    let result = remotes.worldmap.upload_lat_lng_table(&request, &path)?;
    info!(
        "mapped {} of {} rows",
        result.mapped_record_count,
        result.mapped_record_count + result.unmapped_record_count
    );
    let mut layer = NewWorldMapLayerInfo::from_lat_lng(&file, &result)?.insert(conn)?;
    push_metadata_or_warn(&mut layer, &file, &remotes.dataverse, conn);
    Ok(layer)
}

/// Find the join target chosen in `choice`. An ID WorldMap doesn't offer is
/// reported against the `chosen_layer` field.
pub fn choose_join_target(
    targets: Vec<JoinTarget>,
    choice: &ChooseSingleColumn,
) -> Result<JoinTarget, FormErrors> {
    let id = i64::from(choice.chosen_layer);
    targets.into_iter().find(|t| t.id == id).ok_or_else(|| {
        warn!("WorldMap has no join target {}", id);
        let mut errors = FormErrors::default();
        errors.add("chosen_layer", "Please choose a layer from the list.");
        errors
    })
}

/// Join a table to one of WorldMap's join targets.
#[instrument(level = "info", skip_all, fields(tabular_file_info = info.id))]
pub fn map_table_join(
    info: &TabularFileInfo,
    choice: &ChooseSingleColumn,
    target: &JoinTarget,
    remotes: &Remotes,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<WorldMapLayerInfo> {
    let (file, path) = readable_table(info, settings, conn)?;
    let request = TableJoinRequest {
        title: layer_title(&file),
        abstract_text: layer_abstract(&file),
        delimiter: info.delimiter.clone(),
        table_attribute: choice.chosen_column.clone(),
        layer_typename: target.layer.clone(),
        layer_attribute: target.attribute.attribute.clone(),
    };
    let result = remotes.worldmap.upload_and_join_table(&request, &path)?;
    info!(
        "joined to {}: {} matched, {} unmatched",
        target.layer, result.matched_records_count, result.unmatched_records_count
    );
    let mut layer = NewWorldMapLayerInfo::from_table_join(&file, &result)?.insert(conn)?;
    push_metadata_or_warn(&mut layer, &file, &remotes.dataverse, conn);
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldmap::JoinTargetAttribute;

    fn target(id: i64, layer: &str) -> JoinTarget {
        JoinTarget {
            id,
            title: format!("Target {}", id),
            layer: layer.to_owned(),
            attribute: JoinTargetAttribute {
                attribute: "TRACT".to_owned(),
                attribute_type: "xsd:string".to_owned(),
            },
            geocode_type: "US Census Tract".to_owned(),
            geocode_type_slug: "us-census-tract".to_owned(),
            year: None,
        }
    }

    fn choice(chosen_layer: i32) -> ChooseSingleColumn {
        ChooseSingleColumn {
            tabular_file_info_id: 1,
            chosen_layer,
            chosen_column: "tract".to_owned(),
        }
    }

    #[test]
    fn join_targets_are_found_by_id() {
        let targets = vec![target(3, "geonode:tracts_2000"), target(7, "geonode:tracts_2010")];
        assert_eq!(
            choose_join_target(targets, &choice(7)).unwrap().layer,
            "geonode:tracts_2010"
        );
    }

    #[test]
    fn unknown_join_targets_are_form_errors() {
        let targets = vec![target(3, "geonode:tracts_2000"), target(7, "geonode:tracts_2010")];
        let errors = choose_join_target(targets, &choice(8)).unwrap_err();
        assert_eq!(errors.get("chosen_layer"), ["Please choose a layer from the list."]);
        assert!(choose_join_target(vec![], &choice(3)).is_err());
    }

    #[test]
    fn abstracts_fall_back_to_dataset_name() {
        let mut file = GisDataFile::factory(FileKind::Tabular);
        file.dataset_citation = "".to_owned();
        assert_eq!(layer_abstract(&file), "Data from Boston Income");
        file.dataset_citation = "Smith, 2024".to_owned();
        assert_eq!(layer_abstract(&file), "Smith, 2024");
    }
}

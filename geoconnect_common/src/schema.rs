use diesel::sql_types::*;
use crate::models::sql_types::{AttemptStatus, FileKind, LayerKind};

table! {
    use super::*;

    gis_data_files (id) {
        id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        md5 -> Text,
        file_kind -> FileKind,
        dv_user_id -> Int4,
        dv_username -> Text,
        dv_user_email -> Text,
        dv_id -> Int4,
        dv_name -> Text,
        dataset_id -> Int4,
        dataset_name -> Text,
        dataset_citation -> Text,
        datafile_id -> Int4,
        datafile_version -> Nullable<Int8>,
        datafile_label -> Text,
        datafile_description -> Text,
        datafile_type -> Text,
        datafile_expected_md5_checksum -> Text,
        datafile_is_restricted -> Bool,
        dataverse_installation_name -> Text,
        return_to_dataverse_url -> Text,
        dv_session_token -> Text,
        dv_file_path -> Nullable<Text>,
        gis_scratch_work_directory -> Text,
    }
}

table! {
    use super::*;

    shapefile_infos (id) {
        id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        gis_data_file_id -> Int4,
        zipfile_checked -> Bool,
        has_shapefile -> Bool,
        name -> Text,
        shape_type -> Nullable<Int4>,
        number_of_features -> Nullable<Int4>,
        bounding_box -> Nullable<Jsonb>,
        column_names -> Jsonb,
        column_info -> Jsonb,
    }
}

table! {
    use super::*;

    tabular_file_infos (id) {
        id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        gis_data_file_id -> Int4,
        delimiter -> Text,
        is_file_readable -> Bool,
        num_rows -> Int4,
        num_columns -> Int4,
        column_names -> Jsonb,
    }
}

table! {
    use super::*;

    worldmap_import_attempts (id) {
        id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        gis_data_file_id -> Int4,
        title -> Text,
        abstract_text -> Text,
        shapefile_name -> Text,
        import_status -> AttemptStatus,
    }
}

table! {
    use super::*;

    worldmap_import_fails (id) {
        id -> Int4,
        created_at -> Timestamp,
        import_attempt_id -> Int4,
        msg -> Text,
        orig_response -> Text,
    }
}

table! {
    use super::*;

    worldmap_layer_infos (id) {
        id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        md5 -> Text,
        gis_data_file_id -> Int4,
        import_attempt_id -> Nullable<Int4>,
        layer_kind -> LayerKind,
        layer_name -> Text,
        layer_link -> Text,
        embed_map_link -> Text,
        map_image_link -> Text,
        worldmap_username -> Text,
        attribute_info -> Jsonb,
        download_links -> Jsonb,
        join_description -> Text,
        core_data -> Jsonb,
        dv_metadata_updated -> Bool,
    }
}

joinable!(shapefile_infos -> gis_data_files (gis_data_file_id));
joinable!(tabular_file_infos -> gis_data_files (gis_data_file_id));
joinable!(worldmap_import_attempts -> gis_data_files (gis_data_file_id));
joinable!(worldmap_import_fails -> worldmap_import_attempts (import_attempt_id));
joinable!(worldmap_layer_infos -> gis_data_files (gis_data_file_id));

allow_tables_to_appear_in_same_query!(
    gis_data_files,
    shapefile_infos,
    tabular_file_infos,
    worldmap_import_attempts,
    worldmap_import_fails,
    worldmap_layer_infos,
);

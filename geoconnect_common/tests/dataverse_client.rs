use geoconnect_common::{
    config::Settings,
    dataverse::{MetadataUpdater, DELETE_METADATA_PATH, UPDATE_METADATA_PATH},
    models::{FileKind, GisDataFile, LayerKind, WorldMapLayerInfo},
    remote::{find_remote_error, RemoteError},
};
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

fn updater_for(server: &MockServer) -> MetadataUpdater {
    updater_at(server.base_url())
}

fn updater_at(base: String) -> MetadataUpdater {
    let settings = Settings::from_lookup(move |key| {
        let value = match key {
            "DATABASE_URL" => "postgres://localhost/geoconnect_test".to_owned(),
            "DATAVERSE_SERVER_URL" | "WORLDMAP_SERVER_URL" => base.clone(),
            "WORLDMAP_SIGNATURE_KEY" => "shared-key".to_owned(),
            _ => return None,
        };
        Some(value)
    })
    .unwrap();
    MetadataUpdater::new(&settings).unwrap()
}

fn sample() -> (GisDataFile, WorldMapLayerInfo) {
    let file = GisDataFile::factory(FileKind::Shapefile);
    let layer = WorldMapLayerInfo::factory(&file, LayerKind::Shapefile);
    (file, layer)
}

#[test]
fn successful_update_returns_remaining_fields() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(UPDATE_METADATA_PATH)
            .json_body_partial(r#"{"GEOCONNECT_TOKEN": "token", "datafileID": 42}"#);
        then.status(200)
            .json_body(json!({"status": "OK", "data": {"mapLayerMetadataId": 5}}));
    });

    let (file, layer) = sample();
    let response = updater_for(&server)
        .send_info_to_dataverse(&layer, &file)
        .unwrap();
    mock.assert();
    assert!(response.get("status").is_none());
    assert_eq!(response["data"]["mapLayerMetadataId"], 5);
}

#[test]
fn non_200_update_is_a_failed_update() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(UPDATE_METADATA_PATH);
        then.status(401).body("Not authorized");
    });

    let (file, layer) = sample();
    let err = updater_for(&server)
        .send_info_to_dataverse(&layer, &file)
        .unwrap_err();
    assert_eq!(err.to_string(), "Sorry! The update failed.");
    assert_eq!(
        find_remote_error(&err).map(|e| e.original_response()),
        Some("Not authorized".to_owned())
    );
}

#[test]
fn error_status_uses_dataverse_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(UPDATE_METADATA_PATH);
        then.status(200)
            .json_body(json!({"status": "ERROR", "message": "Token expired"}));
    });

    let (file, layer) = sample();
    let err = updater_for(&server)
        .send_info_to_dataverse(&layer, &file)
        .unwrap_err();
    assert_eq!(err.to_string(), "Token expired");
}

#[test]
fn error_status_without_message_is_unknown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(UPDATE_METADATA_PATH);
        then.status(200).json_body(json!({"status": "ERROR"}));
    });

    let (file, layer) = sample();
    let err = updater_for(&server)
        .send_info_to_dataverse(&layer, &file)
        .unwrap_err();
    assert!(matches!(find_remote_error(&err), Some(RemoteError::Unknown)));
}

#[test]
fn delete_handles_missing_api() {
    let server = MockServer::start();
    let mut ok = server.mock(|when, then| {
        when.method(POST).path(DELETE_METADATA_PATH);
        then.status(200).json_body(json!({"status": "OK"}));
    });
    let (file, _) = sample();
    let updater = updater_for(&server);
    updater.delete_metadata_from_dataverse(&file).unwrap();
    ok.assert();
    ok.delete();

    server.mock(|when, then| {
        when.method(POST).path(DELETE_METADATA_PATH);
        then.status(404);
    });
    let err = updater.delete_metadata_from_dataverse(&file).unwrap_err();
    assert!(matches!(
        find_remote_error(&err),
        Some(RemoteError::DeleteApiUnavailable)
    ));
    assert_eq!(err.to_string(), "The Dataverse delete API was not available");
}

#[test]
fn other_delete_statuses_are_failed_updates() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(DELETE_METADATA_PATH)
            .json_body_partial(r#"{"GEOCONNECT_TOKEN": "token", "datafileID": 42}"#);
        then.status(500).body("Internal Server Error");
    });

    let (file, _) = sample();
    let err = updater_for(&server)
        .delete_metadata_from_dataverse(&file)
        .unwrap_err();
    mock.assert();
    match find_remote_error(&err) {
        Some(RemoteError::UpdateFailed { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.to_string(), "Sorry! The update failed.");
}

#[test]
fn unreachable_dataverse_names_the_server() {
    // Nothing listens on port 1.
    let updater = updater_at("http://127.0.0.1:1".to_owned());

    let (file, layer) = sample();
    let err = updater.send_info_to_dataverse(&layer, &file).unwrap_err();
    assert!(
        err.to_string()
            .starts_with("Could not contact the Dataverse server: "),
        "{}",
        err
    );
}

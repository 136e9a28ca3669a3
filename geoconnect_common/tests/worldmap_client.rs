use geoconnect_common::{
    config::Settings,
    forms::{
        ClassifyLayer, DataverseInfo, FormData, ShapefileImportData, CLASSIFY_METHODS,
        COLOR_RAMPS,
    },
    models::{FileKind, GisDataFile},
    remote::{find_remote_error, RemoteError},
    signing,
    worldmap::{
        LatLngRequest, TableJoinRequest, WorldMapClient, CLASSIFY_LAYER_PATH, DELETE_LAYER_PATH,
        IMPORT_SHAPEFILE_PATH, JOIN_TARGETS_PATH, UPLOAD_AND_JOIN_PATH, UPLOAD_LAT_LNG_PATH,
    },
};
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

fn settings_for(server: &MockServer, timeout: &str) -> Settings {
    settings_at(server.base_url(), timeout)
}

fn settings_at(base: String, timeout: &str) -> Settings {
    let timeout = timeout.to_owned();
    Settings::from_lookup(move |key| {
        let value = match key {
            "DATABASE_URL" => "postgres://localhost/geoconnect_test".to_owned(),
            "DATAVERSE_SERVER_URL" | "WORLDMAP_SERVER_URL" => base.clone(),
            "WORLDMAP_ACCOUNT_USERNAME" => "mapper".to_owned(),
            "WORLDMAP_ACCOUNT_PASSWORD" => "secret".to_owned(),
            "WORLDMAP_SIGNATURE_KEY" => "shared-key".to_owned(),
            "GEOCONNECT_HTTP_TIMEOUT" => timeout.clone(),
            _ => return None,
        };
        Some(value)
    })
    .unwrap()
}

fn layer_data(name: &str) -> serde_json::Value {
    json!({
        "layer_name": name,
        "layer_link": format!("https://worldmap.example.edu/data/{}", name),
        "embed_map_link": format!("https://worldmap.example.edu/maps/embed/?layer={}", name),
        "worldmap_username": "mapper",
        "map_image_link": "https://worldmap.example.edu/thumb.png",
        "attribute_info": "[{\"name\": \"INCOME\", \"type\": \"xsd:int\"}]",
    })
}

fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

#[test]
fn import_shapefile_returns_layer_metadata() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(IMPORT_SHAPEFILE_PATH)
            .body_contains("signature_key")
            .body_contains("shapefile_name");
        then.status(200).json_body(json!({
            "success": true,
            "message": "layer created",
            "data": layer_data("geonode:income"),
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let file = GisDataFile::factory(FileKind::Shapefile);
    let import = ShapefileImportData::for_file(&file, "income");
    let zip = temp_file(b"PK\x05\x06");
    let md = client
        .import_shapefile(&import, &DataverseInfo::from(&file), zip.path())
        .unwrap();
    mock.assert();
    assert_eq!(md.layer_name, "geonode:income");
    assert_eq!(md.attribute_info[0]["name"], "INCOME");
}

#[test]
fn rejections_carry_worldmap_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(DELETE_LAYER_PATH);
        then.status(400).json_body(json!({
            "success": false,
            "message": "Layer not found",
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let file = GisDataFile::factory(FileKind::Shapefile);
    let err = client
        .delete_layer("geonode:gone", &DataverseInfo::from(&file))
        .unwrap_err();
    match find_remote_error(&err) {
        Some(RemoteError::Rejected {
            status, message, ..
        }) => {
            assert_eq!(*status, 400);
            assert_eq!(message, "Layer not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn failures_without_a_message_are_unknown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(DELETE_LAYER_PATH);
        then.status(200).json_body(json!({"success": false}));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let file = GisDataFile::factory(FileKind::Shapefile);
    let err = client
        .delete_layer("geonode:gone", &DataverseInfo::from(&file))
        .unwrap_err();
    assert_eq!(err.to_string(), "The import failed for an unknown reason");
}

#[test]
fn html_responses_are_invalid() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(JOIN_TARGETS_PATH);
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let err = client.join_targets(None).unwrap_err();
    match find_remote_error(&err) {
        Some(RemoteError::InvalidResponse { status, body, .. }) => {
            assert_eq!(*status, 502);
            assert!(body.contains("Bad Gateway"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn slow_servers_time_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(JOIN_TARGETS_PATH);
        then.status(200)
            .delay(std::time::Duration::from_secs(3))
            .json_body(json!({"success": true, "data": []}));
    });

    let client = WorldMapClient::new(&settings_for(&server, "1s")).unwrap();
    let err = client.join_targets(None).unwrap_err();
    assert!(
        matches!(find_remote_error(&err), Some(RemoteError::Timeout { .. })),
        "{:?}",
        err
    );
    assert!(err.to_string().starts_with("This request timed out."));
}

#[test]
fn join_targets_are_filtered_by_type() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path(JOIN_TARGETS_PATH)
            .query_param("type", "census-tract")
            .header_exists("authorization");
        then.status(200).json_body(json!({
            "success": true,
            "data": [{
                "id": 7,
                "title": "Boston Census Tracts, 2010",
                "layer": "geonode:tracts_2010",
                "attribute": {"attribute": "TRACT", "type": "xsd:string"},
                "geocode_type": "Census Tract",
                "geocode_type_slug": "census-tract",
                "year": 2010,
            }],
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let targets = client.join_targets(Some("census-tract")).unwrap();
    mock.assert();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].attribute.attribute, "TRACT");
}

#[test]
fn table_join_result_includes_layer() {
    let server = MockServer::start();
    let mut data = layer_data("geonode:joined");
    data["table_id"] = json!(12);
    data["tablejoin_id"] = json!(34);
    data["matched_records_count"] = json!(180);
    data["unmatched_records_count"] = json!(1);
    server.mock(|when, then| {
        when.method(POST)
            .path(UPLOAD_AND_JOIN_PATH)
            .body_contains("uploaded_file")
            .body_contains("geonode:tracts_2010");
        then.status(200).json_body(json!({"success": true, "data": data}));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let table = temp_file(b"TRACT\tINCOME\n250250001\t52000\n");
    let request = TableJoinRequest {
        title: "Boston Income".to_owned(),
        abstract_text: "Median income".to_owned(),
        delimiter: "\t".to_owned(),
        table_attribute: "TRACT".to_owned(),
        layer_typename: "geonode:tracts_2010".to_owned(),
        layer_attribute: "TRACT".to_owned(),
    };
    let result = client.upload_and_join_table(&request, table.path()).unwrap();
    assert_eq!(result.tablejoin_id, 34);
    assert_eq!(result.layer.layer_name, "geonode:joined");
}

#[test]
fn lat_lng_result_needs_layer_links() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(UPLOAD_LAT_LNG_PATH);
        then.status(200).json_body(json!({
            "success": true,
            "data": {"datatable_id": 9, "layer_name": "geonode:points"},
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let table = temp_file(b"lat,lng\n42.36,-71.06\n");
    let request = LatLngRequest {
        title: "Stations".to_owned(),
        abstract_text: "Stations".to_owned(),
        delimiter: ",".to_owned(),
        lat_attribute: "lat".to_owned(),
        lng_attribute: "lng".to_owned(),
    };
    let err = client.upload_lat_lng_table(&request, table.path()).unwrap_err();
    assert!(matches!(
        find_remote_error(&err),
        Some(RemoteError::InvalidResponse { .. })
    ));
}

#[test]
fn signed_params_verify_with_shared_key() {
    let mut params = FormData::new();
    params.insert("datafile_id".to_owned(), "42".to_owned());
    params.insert("layer_name".to_owned(), "geonode:income".to_owned());
    let signed = signing::with_signature(&params, "shared-key");
    assert!(signing::verify(&signed, "shared-key"));
    assert!(!signing::verify(&signed, "other-key"));
}

#[test]
fn delete_layer_sends_signed_dataverse_info() {
    let server = MockServer::start();
    let file = GisDataFile::factory(FileKind::Shapefile);
    let dv_info = DataverseInfo::from(&file);
    let mut expected = dv_info.to_params();
    expected.insert("layer_name".to_owned(), "geonode:income".to_owned());
    let signature = signing::sign_params(&expected, "shared-key");

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(DELETE_LAYER_PATH)
            .x_www_form_urlencoded_tuple("layer_name", "geonode:income")
            .x_www_form_urlencoded_tuple("datafile_id", "42")
            .x_www_form_urlencoded_tuple("signature_key", &signature);
        then.status(200)
            .json_body(json!({"success": true, "message": "deleted"}));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    client.delete_layer("geonode:income", &dv_info).unwrap();
    mock.assert();
}

#[test]
fn classify_layer_sends_signed_style() {
    let server = MockServer::start();
    let file = GisDataFile::factory(FileKind::Shapefile);
    let dv_info = DataverseInfo::from(&file);
    let classify = ClassifyLayer {
        layer_name: "geonode:income".to_owned(),
        attribute: "INCOME".to_owned(),
        attribute_type: "xsd:int".to_owned(),
        method: CLASSIFY_METHODS[0],
        intervals: 5,
        ramp: COLOR_RAMPS[0],
        reverse: false,
    };
    let mut expected = classify.to_params();
    expected.insert("datafile_id".to_owned(), "42".to_owned());
    expected.insert(
        "dataverse_installation_name".to_owned(),
        "Harvard Dataverse".to_owned(),
    );
    let signature = signing::sign_params(&expected, "shared-key");

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(CLASSIFY_LAYER_PATH)
            .x_www_form_urlencoded_tuple("attribute", "INCOME")
            .x_www_form_urlencoded_tuple("method", "equal")
            .x_www_form_urlencoded_tuple("intervals", "5")
            .x_www_form_urlencoded_tuple("ramp", "Blue")
            .x_www_form_urlencoded_tuple("datafile_id", "42")
            .x_www_form_urlencoded_tuple("signature_key", &signature);
        then.status(200).json_body(json!({
            "success": true,
            "data": layer_data("geonode:income"),
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let md = client.classify_layer(&classify, &dv_info).unwrap();
    mock.assert();
    assert_eq!(md.layer_name, "geonode:income");
}

#[test]
fn delete_datatable_uses_its_id() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/datatables/api/12/remove")
            .header_exists("authorization");
        then.status(200).json_body(json!({"success": true}));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    client.delete_datatable(12).unwrap();
    mock.assert();
}

#[test]
fn delete_tablejoin_reports_rejection() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/datatables/api/join/34/remove")
            .header_exists("authorization");
        then.status(404).json_body(json!({
            "success": false,
            "message": "TableJoin not found",
        }));
    });

    let client = WorldMapClient::new(&settings_for(&server, "30s")).unwrap();
    let err = client.delete_tablejoin(34).unwrap_err();
    mock.assert();
    match find_remote_error(&err) {
        Some(RemoteError::Rejected {
            status, message, ..
        }) => {
            assert_eq!(*status, 404);
            assert_eq!(message, "TableJoin not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn truncated_bodies_are_unreadable() {
    // Promise 100 bytes and hang up early.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                  Content-Length: 100\r\n\r\n{\"success\": tr",
            )
            .unwrap();
    });

    let client = WorldMapClient::new(&settings_at(base, "30s")).unwrap();
    let err = client.join_targets(None).unwrap_err();
    server.join().unwrap();
    assert!(
        matches!(
            find_remote_error(&err),
            Some(RemoteError::UnreadableResponse { service: "WorldMap", .. })
        ),
        "{:?}",
        err
    );
    assert_eq!(
        err.to_string(),
        "Sorry! The WorldMap server sent a response we could not read."
    );
}

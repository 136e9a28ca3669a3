//! Reporting map layer metadata back to Dataverse.

use reqwest::{blocking::Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use crate::prelude::*;
use crate::remote::RemoteError;

/// Used in error messages.
const SERVICE: &str = "Dataverse";

/// Add or update the map metadata for a file.
pub const UPDATE_METADATA_PATH: &str = "/api/worldmap/update-layer-metadata/";

/// Remove the map metadata for a file.
pub const DELETE_METADATA_PATH: &str = "/api/worldmap/delete-layer-metadata/";

/// Parameters Dataverse needs to update its copy of our layer metadata.
pub fn update_params(layer: &WorldMapLayerInfo, file: &GisDataFile) -> Value {
    let mut params = json!({
        "GEOCONNECT_TOKEN": file.dv_session_token,
        "datafileID": file.datafile_id,
        "layerName": layer.layer_name,
        "layerLink": layer.layer_link,
        "embedMapLink": layer.embed_map_link,
        "worldmapUsername": layer.worldmap_username,
        "mapImageLink": layer.map_image_link,
    });
    if layer.layer_kind.is_tabular() && !layer.join_description.is_empty() {
        params["joinDescription"] = json!(layer.join_description);
    }
    if layer.download_links.is_object() {
        params["mapLayerLinks"] = layer.download_links.clone();
    }
    params
}

/// Parameters Dataverse needs to delete our layer metadata.
pub fn delete_params(file: &GisDataFile) -> Value {
    json!({
        "GEOCONNECT_TOKEN": file.dv_session_token,
        "datafileID": file.datafile_id,
    })
}

/// Sends metadata updates to a Dataverse server.
pub struct MetadataUpdater {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl MetadataUpdater {
    /// Create an updater using our settings.
    pub fn new(settings: &Settings) -> Result<MetadataUpdater> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .context("could not build HTTP client")?;
        Ok(MetadataUpdater {
            client,
            base_url: settings.dataverse_server_url.clone(),
            timeout: settings.http_timeout,
        })
    }

    fn post(&self, path: &str, params: &Value) -> Result<(StatusCode, String)> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("could not build Dataverse URL for {}", path))?;
        debug!("POST {}", url);
        let resp = self
            .client
            .post(url.clone())
            .json(params)
            .send()
            .map_err(|err| RemoteError::from_transport(err, SERVICE, url.as_str(), self.timeout))
            .map_err(|err| {
                if let RemoteError::Connection { url, .. } = &err {
                    error!("Could not contact the Dataverse server: {}", url);
                }
                err
            })?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| RemoteError::from_transport(err, SERVICE, url.as_str(), self.timeout))?;
        Ok((status, body))
    }

    /// Send a layer's metadata to Dataverse. On success, returns whatever
    /// Dataverse sent back, minus its `status` field.
    #[instrument(level = "info", skip(self, layer, file), fields(layer = %layer.layer_name))]
    pub fn send_info_to_dataverse(
        &self,
        layer: &WorldMapLayerInfo,
        file: &GisDataFile,
    ) -> Result<Map<String, Value>> {
        let (status, body) = self.post(UPDATE_METADATA_PATH, &update_params(layer, file))?;
        if status != StatusCode::OK {
            error!(
                "Metadata update failed.  Status code: {}\nResponse:{}",
                status.as_u16(),
                body
            );
            return Err(RemoteError::UpdateFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let mut response: Map<String, Value> = serde_json::from_str(&body)
            .map_err(|_| RemoteError::invalid_response(SERVICE, status, body.clone()))?;
        match response.get("status").and_then(|s| s.as_str()) {
            Some("OK") | Some("success") => {
                response.remove("status");
                Ok(response)
            }
            _ => match response.get("message").and_then(|m| m.as_str()) {
                Some(message) => Err(RemoteError::Rejected {
                    status: status.as_u16(),
                    message: message.to_owned(),
                    data: None,
                }
                .into()),
                None => Err(RemoteError::Unknown.into()),
            },
        }
    }

    /// Remove a layer's metadata from Dataverse.
    #[instrument(level = "info", skip(self, file), fields(file = %file.md5))]
    pub fn delete_metadata_from_dataverse(&self, file: &GisDataFile) -> Result<()> {
        let (status, body) = self.post(DELETE_METADATA_PATH, &delete_params(file))?;
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(RemoteError::DeleteApiUnavailable.into()),
            _ => {
                error!(
                    "Metadata delete failed.  Status code: {}\nResponse:{}",
                    status.as_u16(),
                    body
                );
                Err(RemoteError::UpdateFailed {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }
}

#[test]
fn update_params_use_dataverse_names() {
    let file = GisDataFile::factory(FileKind::Tabular);
    let mut layer = WorldMapLayerInfo::factory(&file, LayerKind::TabularJoin);
    layer.join_description = "Matched 180 of 181 rows".to_owned();
    let params = update_params(&layer, &file);
    assert_eq!(params["GEOCONNECT_TOKEN"], "token");
    assert_eq!(params["datafileID"], 42);
    assert_eq!(params["layerName"], layer.layer_name.as_str());
    assert_eq!(params["joinDescription"], "Matched 180 of 181 rows");
    assert!(params["mapLayerLinks"].is_object());

    let shp_file = GisDataFile::factory(FileKind::Shapefile);
    let shp_layer = WorldMapLayerInfo::factory(&shp_file, LayerKind::Shapefile);
    assert!(update_params(&shp_layer, &shp_file).get("joinDescription").is_none());
    assert_eq!(delete_params(&shp_file)["datafileID"], 42);
}

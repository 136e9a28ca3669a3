//! A client for the WorldMap APIs.
//!
//! The `/dataverse/` endpoints authenticate with signed parameters. The
//! `/datatables/` endpoints use HTTP Basic auth with a WorldMap account.

use reqwest::{
    blocking::{multipart, Client, RequestBuilder},
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserializer};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::forms::{ClassifyLayer, DataverseInfo, FormData, ShapefileImportData};
use crate::message::JsonMessage;
use crate::prelude::*;
use crate::remote::RemoteError;
use crate::signing;

/// Used in error messages.
const SERVICE: &str = "WorldMap";

/// Import a zipped shapefile as a new layer.
pub const IMPORT_SHAPEFILE_PATH: &str = "/dataverse/import-shapefile/";
/// Delete a layer.
pub const DELETE_LAYER_PATH: &str = "/dataverse/delete-map-layer/";
/// Restyle a layer.
pub const CLASSIFY_LAYER_PATH: &str = "/dataverse/classify-layer/";
/// Upload a table and join it to an existing layer.
pub const UPLOAD_AND_JOIN_PATH: &str = "/datatables/api/upload_and_join";
/// Upload a table and map its latitude and longitude columns.
pub const UPLOAD_LAT_LNG_PATH: &str = "/datatables/api/upload_lat_lon";
/// List the layers a table can be joined to.
pub const JOIN_TARGETS_PATH: &str = "/datatables/api/jointargets";

/// Metadata describing a WorldMap layer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MapLayerMetadata {
    /// The layer's type name, such as `geonode:boston_income`.
    pub layer_name: String,
    /// Link to the layer's page.
    pub layer_link: String,
    /// Link to an embeddable map.
    pub embed_map_link: String,
    /// The WorldMap account owning the layer.
    pub worldmap_username: String,
    /// Link to a map thumbnail.
    #[serde(default)]
    pub map_image_link: String,
    /// Attribute names and types. WorldMap sometimes sends this as a string
    /// containing JSON.
    #[serde(default, deserialize_with = "json_or_embedded_json")]
    pub attribute_info: Value,
    /// Download links by format. May also be a JSON string.
    #[serde(default, deserialize_with = "json_or_embedded_json")]
    pub download_links: Value,
    /// For joined layers, a summary of the join.
    #[serde(default)]
    pub join_description: String,
}

impl MapLayerMetadata {
    /// Parse and check layer metadata from a response's `data`.
    pub fn from_data(data: &Value) -> Result<MapLayerMetadata, RemoteError> {
        let metadata: MapLayerMetadata = serde_json::from_value(data.clone())
            .map_err(|_| RemoteError::invalid_response(SERVICE, StatusCode::OK, data.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    fn validate(&self) -> Result<(), RemoteError> {
        let required = [
            &self.layer_name,
            &self.layer_link,
            &self.embed_map_link,
            &self.worldmap_username,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(RemoteError::invalid_response(
                SERVICE,
                StatusCode::OK,
                serde_json::to_string(self).unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

/// Accept either a JSON value or a string containing JSON.
fn json_or_embedded_json<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            Ok(serde_json::from_str(&s).unwrap_or(Value::String(s)))
        }
        Value::String(_) => Ok(Value::Null),
        other => Ok(other),
    }
}

/// The result of joining a table to a layer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableJoinResult {
    /// The uploaded table.
    pub table_id: i64,
    /// The join itself. Needed to delete it later.
    pub tablejoin_id: i64,
    /// Rows which matched a feature.
    #[serde(default)]
    pub matched_records_count: i64,
    /// Rows which didn't.
    #[serde(default)]
    pub unmatched_records_count: i64,
    /// Values which didn't match, for display.
    #[serde(default, deserialize_with = "json_or_embedded_json")]
    pub unmatched_records_list: Value,
    /// The new layer.
    #[serde(flatten)]
    pub layer: MapLayerMetadata,
}

/// The result of mapping a table by latitude and longitude.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LatLngResult {
    /// The uploaded table.
    pub datatable_id: i64,
    /// Rows we could place on the map.
    #[serde(default)]
    pub mapped_record_count: i64,
    /// Rows with unusable coordinates.
    #[serde(default)]
    pub unmapped_record_count: i64,
    /// Those rows, for display.
    #[serde(default, deserialize_with = "json_or_embedded_json")]
    pub unmapped_records_list: Value,
    /// The new layer.
    #[serde(flatten)]
    pub layer: MapLayerMetadata,
}

/// The attribute of a join target layer which tables join against.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JoinTargetAttribute {
    /// Attribute name.
    pub attribute: String,
    /// Attribute type.
    #[serde(rename = "type", default)]
    pub attribute_type: String,
}

/// A layer which tables can be joined to.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JoinTarget {
    /// Join target ID.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// The layer's type name.
    pub layer: String,
    /// What to join on.
    pub attribute: JoinTargetAttribute,
    /// Kind of geography, such as "US Census Tract".
    #[serde(default)]
    pub geocode_type: String,
    /// Slug for `geocode_type`.
    #[serde(default)]
    pub geocode_type_slug: String,
    /// Year of the geography.
    #[serde(default)]
    pub year: Option<Value>,
}

/// Parameters for joining a table to a layer.
#[derive(Clone, Debug, Serialize)]
pub struct TableJoinRequest {
    /// Title for the new layer.
    pub title: String,
    /// Abstract for the new layer.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Field delimiter of the uploaded table.
    pub delimiter: String,
    /// Column in our table.
    pub table_attribute: String,
    /// Target layer.
    pub layer_typename: String,
    /// Attribute in the target layer.
    pub layer_attribute: String,
}

/// Parameters for mapping a table by latitude and longitude.
#[derive(Clone, Debug, Serialize)]
pub struct LatLngRequest {
    /// Title for the new layer.
    pub title: String,
    /// Abstract for the new layer.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Field delimiter of the uploaded table.
    pub delimiter: String,
    /// Latitude column.
    pub lat_attribute: String,
    /// Longitude column.
    pub lng_attribute: String,
}

/// Turn a flat `Serialize` struct into form fields.
fn to_form_data<T: Serialize>(value: &T) -> Result<FormData> {
    let value = serde_json::to_value(value).context("could not serialize request")?;
    let obj = value
        .as_object()
        .ok_or_else(|| format_err!("request parameters should be an object"))?;
    Ok(obj
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect())
}

/// Talks to a WorldMap server.
pub struct WorldMapClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    signature_key: String,
    timeout: Duration,
}

impl WorldMapClient {
    /// Create a client using our settings.
    pub fn new(settings: &Settings) -> Result<WorldMapClient> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .context("could not build HTTP client")?;
        Ok(WorldMapClient {
            client,
            base_url: settings.worldmap_server_url.clone(),
            username: settings.worldmap_username.clone(),
            password: settings.worldmap_password.clone(),
            signature_key: settings.worldmap_signature_key.clone(),
            timeout: settings.http_timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("could not build WorldMap URL for {}", path))
    }

    fn signed(&self, params: &FormData) -> FormData {
        signing::with_signature(params, &self.signature_key)
    }

    fn basic_auth(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }

    /// Send a request and unwrap WorldMap's response envelope.
    fn send(&self, req: RequestBuilder, url: &Url) -> Result<Value, RemoteError> {
        let resp = req
            .send()
            .map_err(|err| RemoteError::from_transport(err, SERVICE, url.as_str(), self.timeout))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| RemoteError::from_transport(err, SERVICE, url.as_str(), self.timeout))?;
        trace!("WorldMap responded {}: {}", status, body);

        let msg = JsonMessage::from_json_str(&body).map_err(|_| {
            error!("WorldMap sent non-JSON response ({}): {}", status, body);
            RemoteError::invalid_response(SERVICE, status, body.clone())
        })?;
        if msg.success {
            Ok(msg.data.unwrap_or(Value::Null))
        } else if msg.message.trim().is_empty() {
            Err(RemoteError::Unknown)
        } else {
            Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: msg.message,
                data: msg.data,
            })
        }
    }

    fn parse_data<T: DeserializeOwned>(data: Value) -> Result<T, RemoteError> {
        serde_json::from_value(data.clone())
            .map_err(|_| RemoteError::invalid_response(SERVICE, StatusCode::OK, data.to_string()))
    }

    /// Send a zipped shapefile to WorldMap.
    #[instrument(level = "info", skip(self, dv_info, zip_path), fields(title = %import.title))]
    pub fn import_shapefile(
        &self,
        import: &ShapefileImportData,
        dv_info: &DataverseInfo,
        zip_path: &Path,
    ) -> Result<MapLayerMetadata> {
        let url = self.url(IMPORT_SHAPEFILE_PATH)?;
        let mut params = dv_info.to_params();
        params.extend(import.to_params());
        let mut form = multipart::Form::new();
        for (k, v) in self.signed(&params) {
            form = form.text(k, v);
        }
        let form = form
            .file("file", zip_path)
            .with_context(|| format!("could not read {}", zip_path.display()))?;
        let data = self.send(self.client.post(url.clone()).multipart(form), &url)?;
        Ok(MapLayerMetadata::from_data(&data)?)
    }

    /// Delete a layer created from Dataverse data.
    #[instrument(level = "info", skip(self, dv_info))]
    pub fn delete_layer(&self, layer_name: &str, dv_info: &DataverseInfo) -> Result<()> {
        let url = self.url(DELETE_LAYER_PATH)?;
        let mut params = dv_info.to_params();
        params.insert("layer_name".to_owned(), layer_name.to_owned());
        self.send(self.client.post(url.clone()).form(&self.signed(&params)), &url)?;
        Ok(())
    }

    /// Restyle a layer, returning its refreshed metadata.
    #[instrument(level = "info", skip(self, classify, dv_info), fields(layer = %classify.layer_name))]
    pub fn classify_layer(
        &self,
        classify: &ClassifyLayer,
        dv_info: &DataverseInfo,
    ) -> Result<MapLayerMetadata> {
        let url = self.url(CLASSIFY_LAYER_PATH)?;
        let mut params = classify.to_params();
        params.insert("datafile_id".to_owned(), dv_info.datafile_id.to_string());
        params.insert(
            "dataverse_installation_name".to_owned(),
            dv_info.dataverse_installation_name.clone(),
        );
        let data = self.send(self.client.post(url.clone()).form(&self.signed(&params)), &url)?;
        Ok(MapLayerMetadata::from_data(&data)?)
    }

    fn upload_table<T: DeserializeOwned>(
        &self,
        path: &str,
        params: FormData,
        table_path: &Path,
    ) -> Result<T> {
        let url = self.url(path)?;
        let mut form = multipart::Form::new();
        for (k, v) in params {
            form = form.text(k, v);
        }
        let form = form
            .file("uploaded_file", table_path)
            .with_context(|| format!("could not read {}", table_path.display()))?;
        let req = self.basic_auth(self.client.post(url.clone()).multipart(form));
        let data = self.send(req, &url)?;
        Ok(Self::parse_data(data)?)
    }

    /// Upload a table and join it to an existing layer.
    #[instrument(level = "info", skip(self, request, table_path))]
    pub fn upload_and_join_table(
        &self,
        request: &TableJoinRequest,
        table_path: &Path,
    ) -> Result<TableJoinResult> {
        let result: TableJoinResult =
            self.upload_table(UPLOAD_AND_JOIN_PATH, to_form_data(request)?, table_path)?;
        result.layer.validate()?;
        Ok(result)
    }

    /// Upload a table and map it using latitude and longitude columns.
    #[instrument(level = "info", skip(self, request, table_path))]
    pub fn upload_lat_lng_table(
        &self,
        request: &LatLngRequest,
        table_path: &Path,
    ) -> Result<LatLngResult> {
        let result: LatLngResult =
            self.upload_table(UPLOAD_LAT_LNG_PATH, to_form_data(request)?, table_path)?;
        result.layer.validate()?;
        Ok(result)
    }

    /// List join targets, optionally only those of one geocode type.
    #[instrument(level = "debug", skip(self))]
    pub fn join_targets(&self, geocode_type: Option<&str>) -> Result<Vec<JoinTarget>> {
        let mut url = self.url(JOIN_TARGETS_PATH)?;
        if let Some(geocode_type) = geocode_type.filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("type", geocode_type);
        }
        let data = self.send(self.basic_auth(self.client.get(url.clone())), &url)?;
        Ok(Self::parse_data(data)?)
    }

    /// Delete an uploaded table.
    #[instrument(level = "info", skip(self))]
    pub fn delete_datatable(&self, datatable_id: i64) -> Result<()> {
        let url = self.url(&format!("/datatables/api/{}/remove", datatable_id))?;
        self.send(self.basic_auth(self.client.get(url.clone())), &url)?;
        Ok(())
    }

    /// Delete a table join.
    #[instrument(level = "info", skip(self))]
    pub fn delete_tablejoin(&self, tablejoin_id: i64) -> Result<()> {
        let url = self.url(&format!("/datatables/api/join/{}/remove", tablejoin_id))?;
        self.send(self.basic_auth(self.client.get(url.clone())), &url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_metadata_accepts_embedded_json() {
        let data = json!({
            "layer_name": "geonode:income",
            "layer_link": "https://worldmap.example.edu/data/geonode:income",
            "embed_map_link": "https://worldmap.example.edu/maps/embed/?layer=geonode:income",
            "worldmap_username": "mapper",
            "attribute_info": "[{\"name\": \"INCOME\", \"type\": \"xsd:int\"}]",
            "download_links": {"png": "https://worldmap.example.edu/income.png"},
        });
        let md = MapLayerMetadata::from_data(&data).unwrap();
        assert_eq!(md.attribute_info[0]["name"], "INCOME");
        assert_eq!(md.download_links["png"], "https://worldmap.example.edu/income.png");
        assert_eq!(md.map_image_link, "");
    }

    #[test]
    fn layer_metadata_requires_links() {
        let data = json!({
            "layer_name": "geonode:income",
            "layer_link": "",
            "embed_map_link": "https://worldmap.example.edu/maps/embed/",
            "worldmap_username": "mapper",
        });
        assert!(MapLayerMetadata::from_data(&data).is_err());
        assert!(MapLayerMetadata::from_data(&json!({"layer_name": "x"})).is_err());
    }

    #[test]
    fn requests_become_form_fields() {
        let req = LatLngRequest {
            title: "Income".to_owned(),
            abstract_text: "By tract".to_owned(),
            delimiter: "\t".to_owned(),
            lat_attribute: "lat".to_owned(),
            lng_attribute: "lng".to_owned(),
        };
        let form = to_form_data(&req).unwrap();
        assert_eq!(form["abstract"], "By tract");
        assert_eq!(form["lng_attribute"], "lng");
    }
}

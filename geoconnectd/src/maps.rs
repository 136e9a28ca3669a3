//! Deleting maps.

use geoconnect_common::prelude::{error};
use geoconnect_common::{
    errors::user_facing_message,
    forms::DeleteMapConfirmation,
    message::JsonMessage,
    prelude::*,
    services,
};
use rocket::{serde::json::Json, State};
use serde_json::json;

use crate::util::{find_file, DbConn, GeoconnectdError, GeoconnectdResult, PostedForm, SharedServices};

/// Delete a map layer from WorldMap, Dataverse, and our database.
#[post("/maps/delete", data = "<form>")]
pub async fn delete_map(
    state: &State<SharedServices>,
    db: DbConn,
    form: PostedForm,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = db
        .run(move |conn| {
            let confirm = match DeleteMapConfirmation::validate(&form.0) {
                Ok(confirm) => confirm,
                Err(errors) => {
                    return Ok(JsonMessage::error_with_data(
                        "Please confirm that you want to delete this map.",
                        json!({ "errors": errors, "errors_html": errors.as_ul() }),
                    ))
                }
            };
            let file = find_file(&confirm.gis_data_file_md5, "File not found.", conn)?;
            let layer = WorldMapLayerInfo::find_by_md5(&confirm.worldmap_layer_info_md5, conn)?
                .filter(|layer| layer.gis_data_file_id == file.id)
                .ok_or_else(|| GeoconnectdError::NotFound("Map not found.".to_owned()))?;
            match services::delete_map(&file, &layer, &state.remotes, conn) {
                Ok(()) => Ok(JsonMessage::success("The map was deleted.", None)),
                Err(err) => {
                    error!("could not delete map {}: {:#}", layer.layer_name, err);
                    Ok(JsonMessage::error(user_facing_message(&err)))
                }
            }
        })
        .await?;
    Ok(Json(msg))
}

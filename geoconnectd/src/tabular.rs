//! Tabular file pages and actions.

use geoconnect_common::prelude::{error, warn};
use geoconnect_common::{
    errors::user_facing_message,
    forms::{ChooseSingleColumn, FormData, FormErrors, LatLngColumns},
    message::JsonMessage,
    prelude::*,
    services,
};
use rocket::{
    form::Form,
    http::Status,
    response::{content::RawHtml, Redirect},
    serde::json::Json,
    State,
};
use serde_json::json;

use crate::uploads::{save_upload, Upload};
use crate::util::{find_file, DbConn, GeoconnectdError, GeoconnectdResult, PostedForm, SharedServices};
use crate::views;

const NOT_FOUND: &str = "Tabular file not found.";

/// Accept a table, read its header, and send the browser to its page.
#[post("/tabular", data = "<upload>")]
pub async fn upload_tabular(
    state: &State<SharedServices>,
    db: DbConn,
    upload: Form<Upload<'_>>,
) -> GeoconnectdResult<Result<Redirect, (Status, RawHtml<String>)>> {
    let state = state.inner().clone();
    match save_upload(upload.into_inner(), FileKind::Tabular, &state, db.clone()).await? {
        Ok(file) => {
            let md5 = file.md5.clone();
            let ingest_state = state.clone();
            db.run(move |conn| Ok(services::ingest_tabular(&file, &ingest_state.settings, conn)?))
                .await?;
            Ok(Ok(Redirect::to(format!("/tabular/{}", md5))))
        }
        Err(errors) => {
            let debug = state.settings.debug;
            let html = db
                .run(move |conn| {
                    let files = GisDataFile::list(None, conn)?;
                    Ok(views::index_page(files, Some(&errors), debug)?)
                })
                .await?;
            Ok(Err((Status::BadRequest, RawHtml(html))))
        }
    }
}

/// Show a table's columns, and its layer if it has one.
#[get("/tabular/<md5>")]
pub async fn view_tabular(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
) -> GeoconnectdResult<RawHtml<String>> {
    let state = state.inner().clone();
    let html = db
        .run(move |conn| {
            let file = find_file(&md5, NOT_FOUND, conn)?;
            if file.file_kind != FileKind::Tabular {
                return Err(GeoconnectdError::NotFound(NOT_FOUND.to_owned()));
            }
            let info = services::ingest_tabular(&file, &state.settings, conn)?;
            let layer = WorldMapLayerInfo::latest_for_file(&file, conn)?;
            Ok(views::tabular_page(&file, &info, layer.as_ref())?)
        })
        .await?;
    Ok(RawHtml(html))
}

/// Find the tabular file a form refers to. A missing or bad ID is left for
/// form validation to report.
fn posted_table(form: &FormData, conn: &PgConnection) -> Result<Option<TabularFileInfo>> {
    match form.get("tabular_file_info_id").and_then(|id| id.trim().parse().ok()) {
        Some(id) => match TabularFileInfo::find(id, conn) {
            Ok(info) => Ok(Some(info)),
            Err(err) => {
                warn!("{:#}", err);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

fn invalid(errors: &FormErrors) -> JsonMessage {
    JsonMessage::error_with_data(
        "Please correct the errors below.",
        json!({ "errors": errors, "errors_html": errors.as_ul() }),
    )
}

fn mapped(layer: &WorldMapLayerInfo) -> JsonMessage {
    JsonMessage::success(
        "Your map was created.",
        Some(json!({
            "layer_md5": layer.md5,
            "layer_link": layer.layer_link,
            "embed_map_link": layer.embed_map_link,
            "join_description": layer.join_description,
        })),
    )
}

/// Map a table using latitude and longitude columns.
#[post("/tabular/lat-lng", data = "<form>")]
pub async fn map_lat_lng(
    state: &State<SharedServices>,
    db: DbConn,
    form: PostedForm,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = db
        .run(move |conn| {
            let info = posted_table(&form.0, conn)?;
            let columns = info.as_ref().map(|i| i.column_name_list()).unwrap_or_default();
            let (choice, info) = match (LatLngColumns::validate(&form.0, &columns), info) {
                (Ok(choice), Some(info)) => (choice, info),
                (Err(errors), _) => return Ok(invalid(&errors)),
                (Ok(_), None) => return Ok(JsonMessage::error(NOT_FOUND)),
            };
            match services::map_lat_lng(&info, &choice, &state.remotes, &state.settings, conn) {
                Ok(layer) => Ok(mapped(&layer)),
                Err(err) => {
                    error!("could not map table {}: {:#}", info.id, err);
                    Ok(JsonMessage::error(user_facing_message(&err)))
                }
            }
        })
        .await?;
    Ok(Json(msg))
}

/// Join a table to a WorldMap join target.
#[post("/tabular/join", data = "<form>")]
pub async fn map_table_join(
    state: &State<SharedServices>,
    db: DbConn,
    form: PostedForm,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = db
        .run(move |conn| {
            let info = posted_table(&form.0, conn)?;
            let columns = info.as_ref().map(|i| i.column_name_list()).unwrap_or_default();
            let (choice, info) = match (ChooseSingleColumn::validate(&form.0, &columns), info) {
                (Ok(choice), Some(info)) => (choice, info),
                (Err(errors), _) => return Ok(invalid(&errors)),
                (Ok(_), None) => return Ok(JsonMessage::error(NOT_FOUND)),
            };
            let targets = match services::join_targets(&state.remotes, None) {
                Ok(targets) => targets,
                Err(err) => {
                    error!("could not list join targets: {:#}", err);
                    return Ok(JsonMessage::error(user_facing_message(&err)));
                }
            };
            let target = match services::choose_join_target(targets, &choice) {
                Ok(target) => target,
                Err(errors) => return Ok(invalid(&errors)),
            };
            let mapped_layer = services::map_table_join(
                &info,
                &choice,
                &target,
                &state.remotes,
                &state.settings,
                conn,
            );
            match mapped_layer {
                Ok(layer) => Ok(mapped(&layer)),
                Err(err) => {
                    error!("could not join table {}: {:#}", info.id, err);
                    Ok(JsonMessage::error(user_facing_message(&err)))
                }
            }
        })
        .await?;
    Ok(Json(msg))
}

/// Join targets as `[[id, title], ...]`, for filling in a `<select>`.
#[get("/tabular/join-targets?<geocode_type>")]
pub async fn join_targets(
    state: &State<SharedServices>,
    geocode_type: Option<String>,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = rocket::tokio::task::spawn_blocking(move || {
        match services::join_targets(&state.remotes, geocode_type.as_deref()) {
            Ok(targets) => {
                let pairs = targets
                    .iter()
                    .map(|t| json!([t.id, t.title]))
                    .collect::<Vec<_>>();
                JsonMessage::success("", Some(json!(pairs)))
            }
            Err(err) => {
                error!("could not list join targets: {:#}", err);
                JsonMessage::error(user_facing_message(&err))
            }
        }
    })
    .await
    .map_err(|err| format_err!("join target task failed: {}", err))?;
    Ok(Json(msg))
}

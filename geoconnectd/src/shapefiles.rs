//! Shapefile pages and actions.

use geoconnect_common::prelude::{error};
use geoconnect_common::{
    errors::user_facing_message,
    forms::{attribute_choices, ClassifyLayer},
    message::JsonMessage,
    prelude::*,
    services::{self, ViewMode, VisualizeOutcome},
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

const NOT_FOUND: &str = "Shapefile not found.";

/// Accept a zipped shapefile and send the browser to its page.
#[post("/shapefiles", data = "<upload>")]
pub async fn upload_shapefile(
    state: &State<SharedServices>,
    db: DbConn,
    upload: Form<Upload<'_>>,
) -> GeoconnectdResult<Result<Redirect, (Status, RawHtml<String>)>> {
    let state = state.inner().clone();
    match save_upload(upload.into_inner(), FileKind::Shapefile, &state, db.clone()).await? {
        Ok(file) => Ok(Ok(Redirect::to(format!("/shapefiles/{}/first-time", file.md5)))),
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

async fn show(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
    mode: ViewMode,
) -> GeoconnectdResult<RawHtml<String>> {
    let state = state.inner().clone();
    let html = db
        .run(move |conn| {
            let mut file = find_file(&md5, NOT_FOUND, conn)?;
            if file.file_kind != FileKind::Shapefile {
                return Err(GeoconnectdError::NotFound(NOT_FOUND.to_owned()));
            }
            let exam = services::examine_shapefile(&mut file, mode, &state.settings, conn)?;
            Ok(views::shapefile_page(&file, &exam)?)
        })
        .await?;
    Ok(RawHtml(html))
}

/// Examine a shapefile, or show its layer.
#[get("/shapefiles/<md5>")]
pub async fn view_shapefile(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
) -> GeoconnectdResult<RawHtml<String>> {
    show(state, db, md5, ViewMode::Normal).await
}

/// The same, just after uploading.
#[get("/shapefiles/<md5>/first-time")]
pub async fn view_shapefile_first_time(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
) -> GeoconnectdResult<RawHtml<String>> {
    show(state, db, md5, ViewMode::FirstTime).await
}

/// The same, just after asking WorldMap for a layer.
#[get("/shapefiles/<md5>/visualize-attempt")]
pub async fn view_shapefile_visualize_attempt(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
) -> GeoconnectdResult<RawHtml<String>> {
    show(state, db, md5, ViewMode::JustVisualized).await
}

/// Ask WorldMap to make a layer from a shapefile.
#[post("/shapefiles/<md5>/visualize")]
pub async fn visualize(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = db
        .run(move |conn| {
            let file = find_file(&md5, NOT_FOUND, conn)?;
            let outcome =
                services::visualize_shapefile(&file, &state.remotes, &state.settings, conn)?;
            Ok(match outcome {
                VisualizeOutcome::Success(layer) => JsonMessage::success(
                    "Your layer was created.",
                    Some(json!({
                        "layer_md5": layer.md5,
                        "redirect": format!("/shapefiles/{}/visualize-attempt", file.md5),
                    })),
                ),
                VisualizeOutcome::Failed(message) => JsonMessage::error(message),
            })
        })
        .await?;
    Ok(Json(msg))
}

/// Restyle a shapefile's layer.
#[post("/shapefiles/<md5>/classify", data = "<form>")]
pub async fn classify(
    state: &State<SharedServices>,
    db: DbConn,
    md5: String,
    form: PostedForm,
) -> GeoconnectdResult<Json<JsonMessage>> {
    let state = state.inner().clone();
    let msg = db
        .run(move |conn| {
            let file = find_file(&md5, NOT_FOUND, conn)?;
            let mut layer = match WorldMapLayerInfo::latest_for_file(&file, conn)? {
                Some(layer) => layer,
                None => return Ok(JsonMessage::error("This shapefile has no map layer yet.")),
            };
            let choices = attribute_choices(&layer.attribute_info);
            let classify = match ClassifyLayer::validate(&form.0, &choices) {
                Ok(classify) => classify,
                Err(errors) => {
                    return Ok(JsonMessage::error_with_data(
                        "Please correct the errors below.",
                        json!({ "errors": errors, "errors_html": errors.as_ul() }),
                    ))
                }
            };
            match services::classify_layer(&file, &mut layer, &classify, &state.remotes, conn) {
                Ok(()) => Ok(JsonMessage::success(
                    "Your layer was restyled.",
                    Some(json!({ "map_image_link": layer.map_image_link })),
                )),
                Err(err) => {
                    error!("could not classify {}: {:#}", layer.layer_name, err);
                    Ok(JsonMessage::error(user_facing_message(&err)))
                }
            }
        })
        .await?;
    Ok(Json(msg))
}

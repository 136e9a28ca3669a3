//! Receiving uploaded files.

use geoconnect_common::prelude::info;
use geoconnect_common::{
    forms::{DataverseInfo, FormData, FormErrors},
    prelude::*,
    scratch::prepare_upload_path,
};
use rocket::fs::TempFile;

use crate::util::{DbConn, GeoconnectdResult, SharedServices};

/// A file plus the Dataverse context it came from. The upload form names
/// Dataverse fields `info[field_name]`.
#[derive(FromForm)]
pub struct Upload<'r> {
    /// The uploaded file.
    pub file: TempFile<'r>,
    /// Dataverse fields, as posted.
    pub info: FormData,
}

/// Store an upload and record it as a `kind` file. Returns the form errors
/// if the Dataverse fields don't validate.
pub async fn save_upload(
    mut upload: Upload<'_>,
    kind: FileKind,
    services: &SharedServices,
    db: DbConn,
) -> GeoconnectdResult<Result<GisDataFile, FormErrors>> {
    let info = match DataverseInfo::validate(&upload.info) {
        Ok(info) => info,
        Err(errors) => return Ok(Err(errors)),
    };
    if upload.file.len() == 0 {
        let mut errors = FormErrors::default();
        errors.add("file", "The submitted file is empty.");
        return Ok(Err(errors));
    }

    let name = upload
        .file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_owned())
        .unwrap_or_else(|| info.datafile_label.clone());
    let (relative, dest) = prepare_upload_path(&services.settings, &name)?;
    upload
        .file
        .copy_to(&dest)
        .await
        .with_context(|| format!("could not save upload to {}", dest.display()))?;
    info!("stored upload {} at {}", name, dest.display());

    let relative = relative.to_string_lossy().into_owned();
    let file = db
        .run(move |conn| {
            Ok(NewGisDataFile::from_dataverse_info(&info, kind, Some(relative)).insert(conn)?)
        })
        .await?;
    Ok(Ok(file))
}

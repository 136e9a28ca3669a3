//! Examining, visualizing, and styling shapefiles.

use crate::errors::user_facing_message;
use crate::forms::{attribute_choices, ClassifyLayer, DataverseInfo, ShapefileImportData};
use crate::prelude::*;
use crate::remote::find_remote_error;
use crate::scratch::ensure_scratch_dir;
use crate::shapefile::{check_zip, extract_and_load, ZipCheck, MANDATORY_EXTENSIONS};

use super::{push_metadata_or_warn, Remotes};

/// Recorded as the shapefile name when there was no file.
pub const LABEL_NO_FILE: &str = "(no file to check)";
/// Recorded when the zip had no complete shapefile.
pub const LABEL_NOT_A_SHAPEFILE: &str = "(not a shapefile)";
/// Recorded when the zip had several.
pub const LABEL_MULTIPLE_SHAPEFILES: &str = "(multiple shapefiles found)";

/// Where someone is in the mapping process.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Checking the zip.
    Examine,
    /// A layer was just made.
    Visualize,
    /// Restyling an existing layer.
    Style,
}

impl Step {
    /// The page title for this step.
    pub fn page_title(self) -> &'static str {
        match self {
            Step::Examine => "Examine Shapefile",
            Step::Visualize => "Visualize Shapefile",
            Step::Style => "Style Shapefile",
        }
    }
}

/// How someone arrived at the shapefile page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewMode {
    /// An ordinary visit.
    Normal,
    /// Just after uploading.
    FirstTime,
    /// Just after asking WorldMap for a layer.
    JustVisualized,
}

/// Something wrong with the uploaded zip.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExamineProblem {
    /// We have no file to look at.
    NoFileToCheck,
    /// The zip has no complete shapefile.
    NoShapefiles {
        /// Members of the zip, if we just looked.
        zip_names: Vec<String>,
        /// What a shapefile needs.
        mandatory_extensions: Vec<String>,
    },
    /// The zip has several shapefiles.
    MultipleShapefiles {
        /// The sets we found.
        set_names: Vec<String>,
        /// Members of the zip.
        zip_names: Vec<String>,
    },
    /// We found a shapefile, but couldn't read it.
    CouldNotOpen {
        /// Members of the zip.
        zip_names: Vec<String>,
        /// Details.
        message: String,
    },
}

fn no_shapefiles(zip_names: Vec<String>) -> ExamineProblem {
    ExamineProblem::NoShapefiles {
        zip_names,
        mandatory_extensions: MANDATORY_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    }
}

/// Everything the shapefile page shows.
#[derive(Clone, Debug, Serialize)]
pub struct Examination {
    /// Where we are in the process.
    pub step: Step,
    /// Is this the first visit after uploading?
    pub first_time: bool,
    /// What we know about the zip.
    pub shapefile_info: ShapefileInfo,
    /// What's wrong, if anything.
    pub problem: Option<ExamineProblem>,
    /// The newest import attempt.
    pub latest_attempt: Option<WorldMapImportAttempt>,
    /// The layer made by that attempt.
    pub layer: Option<WorldMapLayerInfo>,
    /// Why that attempt failed.
    pub import_fails: Vec<WorldMapImportFail>,
    /// `name|type` choices for restyling `layer`.
    pub attribute_choices: Vec<String>,
}

impl Examination {
    fn new(info: ShapefileInfo, mode: ViewMode) -> Examination {
        Examination {
            step: Step::Examine,
            first_time: mode == ViewMode::FirstTime,
            shapefile_info: info,
            problem: None,
            latest_attempt: None,
            layer: None,
            import_fails: vec![],
            attribute_choices: vec![],
        }
    }

    fn with_problem(mut self, problem: ExamineProblem) -> Examination {
        self.problem = Some(problem);
        self
    }
}

/// Check the zip the first time we see it, and then report on where things
/// stand.
#[instrument(level = "debug", skip_all, fields(file = %file.md5))]
pub fn examine_shapefile(
    file: &mut GisDataFile,
    mode: ViewMode,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<Examination> {
    let mut info = ShapefileInfo::find_or_create_for_file(file, conn)?;

    if !info.zipfile_checked {
        debug!("checking zip for {}", file.md5);
        let check = match file.dv_file_fullpath(settings) {
            Some(path) => check_zip(&path),
            None => ZipCheck::NoFileToCheck,
        };
        match check {
            ZipCheck::NoFileToCheck => {
                info.record_check_failure(LABEL_NO_FILE, conn)?;
                return Ok(Examination::new(info, mode).with_problem(ExamineProblem::NoFileToCheck));
            }
            ZipCheck::NoShapefiles { zip_names } => {
                info.record_check_failure(LABEL_NOT_A_SHAPEFILE, conn)?;
                return Ok(Examination::new(info, mode).with_problem(no_shapefiles(zip_names)));
            }
            ZipCheck::MultipleShapefiles {
                set_names,
                zip_names,
            } => {
                info.record_check_failure(LABEL_MULTIPLE_SHAPEFILES, conn)?;
                return Ok(Examination::new(info, mode).with_problem(
                    ExamineProblem::MultipleShapefiles {
                        set_names,
                        zip_names,
                    },
                ));
            }
            ZipCheck::Single {
                set_name,
                zip_names,
            } => {
                let scratch = ensure_scratch_dir(file, settings, conn)?;
                // `Single` means we found the file a moment ago.
                let zip_path = file
                    .dv_file_fullpath(settings)
                    .ok_or_else(|| format_err!("stored file for {} disappeared", file.md5))?;
                match extract_and_load(&zip_path, &set_name, &scratch) {
                    Ok(details) => {
                        info.record_loaded(&details, conn)?;
                        return Ok(Examination::new(info, mode));
                    }
                    Err(err) => {
                        error!("Shapefile not loaded. ({}): {}", file.md5, err);
                        info.mark_unloadable(conn)?;
                        return Ok(Examination::new(info, mode).with_problem(
                            ExamineProblem::CouldNotOpen {
                                zip_names,
                                message: err.message,
                            },
                        ));
                    }
                }
            }
        }
    }

    if !info.has_shapefile {
        debug!("no shapefile in {}", file.md5);
        return Ok(Examination::new(info, mode).with_problem(no_shapefiles(vec![])));
    }

    let mut exam = Examination::new(info, mode);
    if let Some(attempt) = WorldMapImportAttempt::latest_for_file(file, conn)? {
        exam.import_fails = attempt.fails(conn)?;
        if let Some(layer) = WorldMapLayerInfo::for_attempt(&attempt, conn)? {
            exam.step = match mode {
                ViewMode::JustVisualized => Step::Visualize,
                _ => Step::Style,
            };
            exam.attribute_choices = attribute_choices(&layer.attribute_info);
            exam.layer = Some(layer);
        }
        exam.latest_attempt = Some(attempt);
    }
    Ok(exam)
}

/// What happened when we asked WorldMap for a layer.
#[derive(Debug)]
pub enum VisualizeOutcome {
    /// We have a layer.
    Success(WorldMapLayerInfo),
    /// WorldMap didn't make one. The message is recorded with the attempt.
    Failed(String),
}

/// Send a checked shapefile to WorldMap, record the result, and tell
/// Dataverse about the new layer.
#[instrument(level = "info", skip_all, fields(file = %file.md5))]
pub fn visualize_shapefile(
    file: &GisDataFile,
    remotes: &Remotes,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<VisualizeOutcome> {
    let info = ShapefileInfo::find_for_file(file, conn)?
        .filter(|info| info.has_shapefile)
        .ok_or_else(|| format_err!("{} has no shapefile to visualize", file.md5))?;
    let zip_path = file
        .dv_file_fullpath(settings)
        .ok_or_else(|| format_err!("{} has no stored file", file.md5))?;

    let import = ShapefileImportData::for_file(file, &info.name);
    let mut attempt = NewWorldMapImportAttempt {
        gis_data_file_id: file.id,
        title: import.title.clone(),
        abstract_text: import.abstract_text.clone(),
        shapefile_name: import.shapefile_name.clone(),
    }
    .insert(conn)?;

    let dv_info = DataverseInfo::from(file);
    match remotes.worldmap.import_shapefile(&import, &dv_info, &zip_path) {
        Ok(metadata) => {
            attempt.mark_success(conn)?;
            let mut layer =
                NewWorldMapLayerInfo::from_shapefile_import(file, &attempt, &metadata)?.insert(conn)?;
            info!("created WorldMap layer {}", layer.layer_name);
            push_metadata_or_warn(&mut layer, file, &remotes.dataverse, conn);
            Ok(VisualizeOutcome::Success(layer))
        }
        Err(err) => {
            error!("WorldMap import failed: {:#}", err);
            let msg = user_facing_message(&err);
            let orig = find_remote_error(&err)
                .map(|remote| remote.original_response())
                .unwrap_or_default();
            attempt.mark_failure(&msg, &orig, conn)?;
            Ok(VisualizeOutcome::Failed(msg))
        }
    }
}

/// Restyle a layer, then refresh our metadata and Dataverse's.
#[instrument(level = "info", skip_all, fields(layer = %layer.layer_name))]
pub fn classify_layer(
    file: &GisDataFile,
    layer: &mut WorldMapLayerInfo,
    classify: &ClassifyLayer,
    remotes: &Remotes,
    conn: &PgConnection,
) -> Result<()> {
    let metadata = remotes
        .worldmap
        .classify_layer(classify, &DataverseInfo::from(&*file))?;
    layer.update_from_metadata(&metadata, conn)?;
    push_metadata_or_warn(layer, file, &remotes.dataverse, conn);
    Ok(())
}

#[test]
fn problems_serialize_for_templates() {
    let problem = no_shapefiles(vec!["README".to_owned()]);
    let json = serde_json::to_value(&problem).unwrap();
    assert_eq!(json["kind"], "no_shapefiles");
    assert_eq!(json["mandatory_extensions"][0], ".shp");
    assert_eq!(Step::Style.page_title(), "Style Shapefile");
}

//! HTML pages.

use geoconnect_common::{
    forms::{ColorRamp, ClassifyMethod, FormErrors, CLASSIFY_METHODS, COLOR_RAMPS, INTERVAL_RANGE},
    prelude::*,
    render::render_html,
    services::{Examination, ExamineProblem},
};

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.hbs");
const SHAPEFILE_TEMPLATE: &str = include_str!("templates/shapefile.html.hbs");
const TABULAR_TEMPLATE: &str = include_str!("templates/tabular.html.hbs");

/// Dataverse fields on the upload forms, in display order.
pub const DATAVERSE_FIELDS: &[&str] = &[
    "dv_user_id",
    "dv_username",
    "dv_user_email",
    "dataverse_installation_name",
    "dataverse_id",
    "dataverse_name",
    "dataset_id",
    "dataset_name",
    "dataset_citation",
    "datafile_id",
    "datafile_version",
    "datafile_label",
    "datafile_description",
    "datafile_content_type",
    "datafile_expected_md5_checksum",
    "return_to_dataverse_url",
    "dv_session_token",
];

#[derive(Serialize)]
struct IndexParams {
    shapefiles: Vec<GisDataFile>,
    tabular_files: Vec<GisDataFile>,
    dataverse_fields: &'static [&'static str],
    errors_html: Option<String>,
    debug: bool,
}

/// The list of uploads, plus upload forms. `errors` come from a rejected
/// upload.
pub fn index_page(
    files: Vec<GisDataFile>,
    errors: Option<&FormErrors>,
    debug: bool,
) -> Result<String> {
    let (shapefiles, tabular_files) = files
        .into_iter()
        .partition(|f| f.file_kind == FileKind::Shapefile);
    render_html(
        INDEX_TEMPLATE,
        &IndexParams {
            shapefiles,
            tabular_files,
            dataverse_fields: DATAVERSE_FIELDS,
            errors_html: errors.map(|e| e.as_ul()),
            debug,
        },
    )
}

#[derive(Serialize)]
struct ShapefileParams<'a> {
    page_title: &'static str,
    file: &'a GisDataFile,
    exam: &'a Examination,
    problem_message: Option<String>,
    zip_names: Vec<String>,
    set_names: Vec<String>,
    mandatory_extensions: Vec<String>,
    column_names: Vec<String>,
    shape_type: Option<&'static str>,
    classify_methods: &'static [ClassifyMethod],
    color_ramps: &'static [ColorRamp],
    min_intervals: u32,
    max_intervals: u32,
}

fn describe_problem(problem: &ExamineProblem) -> String {
    match problem {
        ExamineProblem::NoFileToCheck => "We could not find the uploaded file.".to_owned(),
        ExamineProblem::NoShapefiles { .. } => {
            "This .zip does not contain a complete shapefile.".to_owned()
        }
        ExamineProblem::MultipleShapefiles { set_names, .. } => format!(
            "This .zip contains {} shapefiles. Please upload only one.",
            set_names.len()
        ),
        ExamineProblem::CouldNotOpen { message, .. } => {
            format!("We could not read the shapefile: {}", message)
        }
    }
}

/// The page for one shapefile, at any step.
pub fn shapefile_page(file: &GisDataFile, exam: &Examination) -> Result<String> {
    let (zip_names, set_names, mandatory_extensions) = match &exam.problem {
        Some(ExamineProblem::NoShapefiles {
            zip_names,
            mandatory_extensions,
        }) => (zip_names.clone(), vec![], mandatory_extensions.clone()),
        Some(ExamineProblem::MultipleShapefiles {
            set_names,
            zip_names,
        }) => (zip_names.clone(), set_names.clone(), vec![]),
        Some(ExamineProblem::CouldNotOpen { zip_names, .. }) => (zip_names.clone(), vec![], vec![]),
        Some(ExamineProblem::NoFileToCheck) | None => (vec![], vec![], vec![]),
    };
    let (min_intervals, max_intervals) = INTERVAL_RANGE;
    render_html(
        SHAPEFILE_TEMPLATE,
        &ShapefileParams {
            page_title: exam.step.page_title(),
            file,
            exam,
            problem_message: exam.problem.as_ref().map(describe_problem),
            zip_names,
            set_names,
            mandatory_extensions,
            column_names: exam.shapefile_info.column_name_list(),
            shape_type: exam.shapefile_info.shape_type_name(),
            classify_methods: CLASSIFY_METHODS,
            color_ramps: COLOR_RAMPS,
            min_intervals,
            max_intervals,
        },
    )
}

#[derive(Serialize)]
struct TabularParams<'a> {
    file: &'a GisDataFile,
    info: &'a TabularFileInfo,
    column_names: Vec<String>,
    layer: Option<&'a WorldMapLayerInfo>,
}

/// The page for one tabular file.
pub fn tabular_page(
    file: &GisDataFile,
    info: &TabularFileInfo,
    layer: Option<&WorldMapLayerInfo>,
) -> Result<String> {
    render_html(
        TABULAR_TEMPLATE,
        &TabularParams {
            file,
            info,
            column_names: info.column_name_list(),
            layer,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconnect_common::services::Step;

    fn examination(file: &GisDataFile) -> Examination {
        Examination {
            step: Step::Examine,
            first_time: true,
            shapefile_info: ShapefileInfo::factory(file),
            problem: None,
            latest_attempt: None,
            layer: None,
            import_fails: vec![],
            attribute_choices: vec![],
        }
    }

    #[test]
    fn render_index() {
        let files = vec![
            GisDataFile::factory(FileKind::Shapefile),
            GisDataFile::factory(FileKind::Tabular),
        ];
        let mut errors = FormErrors::default();
        errors.add("dataset_name", "This field is required.");
        let html = index_page(files, Some(&errors), true).expect("could not render template");
        assert!(html.contains("errorlist"));
        assert!(html.contains("income_shapefile.zip"));
        assert!(html.contains("name=\"info[dv_session_token]\""));
    }

    #[test]
    fn render_shapefile_examine_with_problem() {
        let file = GisDataFile::factory(FileKind::Shapefile);
        let mut exam = examination(&file);
        exam.problem = Some(ExamineProblem::MultipleShapefiles {
            set_names: vec!["a".to_owned(), "b".to_owned()],
            zip_names: vec!["a.shp".to_owned(), "b.shp".to_owned()],
        });
        let html = shapefile_page(&file, &exam).expect("could not render template");
        assert!(html.contains("contains 2 shapefiles"));
        assert!(html.contains("Examine Shapefile"));
    }

    #[test]
    fn render_shapefile_with_layer() {
        let file = GisDataFile::factory(FileKind::Shapefile);
        let attempt = WorldMapImportAttempt::factory(&file);
        let layer = WorldMapLayerInfo::factory(&file, LayerKind::Shapefile);
        let mut exam = examination(&file);
        exam.step = Step::Style;
        exam.import_fails = vec![WorldMapImportFail::factory(&attempt)];
        exam.latest_attempt = Some(attempt);
        exam.attribute_choices = vec!["INCOME|xsd:int".to_owned()];
        exam.layer = Some(layer);
        let html = shapefile_page(&file, &exam).expect("could not render template");
        assert!(html.contains("Style Shapefile"));
        assert!(html.contains("INCOME|xsd:int"));
        assert!(html.contains("Jenks"));
    }

    #[test]
    fn render_tabular() {
        let file = GisDataFile::factory(FileKind::Tabular);
        let info = TabularFileInfo::factory(&file);
        let layer = WorldMapLayerInfo::factory(&file, LayerKind::TabularJoin);
        tabular_page(&file, &info, None).expect("could not render template");
        let html = tabular_page(&file, &info, Some(&layer)).expect("could not render template");
        assert!(html.contains(&layer.layer_name));
    }
}

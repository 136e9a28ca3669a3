//! The `file describe` subcommand.

use geoconnect_common::{prelude::*, render::render_text};

use super::find_file;

/// Template for human-readable `describe` output.
const DESCRIBE_TEMPLATE: &str = include_str!("describe.txt.hbs");

#[derive(Serialize)]
struct Params {
    file: GisDataFile,
    stored_path: String,
    /// `(label, value)` pairs from the shapefile check or table summary.
    details: Vec<(&'static str, String)>,
    attempts: Vec<WorldMapImportAttempt>,
    import_fails: Vec<WorldMapImportFail>,
    layers: Vec<WorldMapLayerInfo>,
}

fn shapefile_details(info: &ShapefileInfo) -> Vec<(&'static str, String)> {
    let mut details = vec![
        ("Zip checked", info.zipfile_checked.to_string()),
        ("Shapefile", info.name.clone()),
    ];
    if let Some(name) = info.shape_type_name() {
        details.push(("Shape type", name.to_owned()));
    }
    if let Some(count) = info.number_of_features {
        details.push(("Features", count.to_string()));
    }
    details.push(("Columns", info.column_name_list().join(", ")));
    details
}

fn tabular_details(info: &TabularFileInfo) -> Vec<(&'static str, String)> {
    if !info.is_file_readable {
        return vec![("Readable", "false".to_owned())];
    }
    vec![
        ("Delimiter", format!("{:?}", info.delimiter)),
        ("Rows", info.num_rows.to_string()),
        ("Columns", info.column_name_list().join(", ")),
    ]
}

/// The `file describe` subcommand.
pub fn run(md5: &str, conn: &PgConnection) -> Result<()> {
    let file = find_file(md5, conn)?;
    let details = match file.file_kind {
        FileKind::Shapefile => ShapefileInfo::find_for_file(&file, conn)?
            .map(|info| shapefile_details(&info))
            .unwrap_or_default(),
        FileKind::Tabular => TabularFileInfo::find_for_file(&file, conn)?
            .map(|info| tabular_details(&info))
            .unwrap_or_default(),
    };
    let attempt = WorldMapImportAttempt::latest_for_file(&file, conn)?;
    let import_fails = match &attempt {
        Some(attempt) => attempt.fails(conn)?,
        None => vec![],
    };
    let layers = WorldMapLayerInfo::all_for_file(&file, conn)?;
    let params = Params {
        stored_path: file.dv_file_path.clone().unwrap_or_else(|| "(none)".to_owned()),
        file,
        details,
        attempts: attempt.into_iter().collect(),
        import_fails,
        layers,
    };

    print!("{}", render_text(DESCRIBE_TEMPLATE, &params)?);
    Ok(())
}

#[test]
fn render_template() {
    let file = GisDataFile::factory(FileKind::Shapefile);
    let info = ShapefileInfo::factory(&file);
    let attempt = WorldMapImportAttempt::factory(&file);
    let fail = WorldMapImportFail::factory(&attempt);
    let mut layer = WorldMapLayerInfo::factory(&file, LayerKind::Shapefile);
    layer.dv_metadata_updated = false;
    let params = Params {
        stored_path: "(none)".to_owned(),
        details: shapefile_details(&info),
        attempts: vec![attempt],
        import_fails: vec![fail.clone()],
        layers: vec![layer.clone()],
        file,
    };

    let out = render_text(DESCRIBE_TEMPLATE, &params).expect("could not render template");
    assert!(out.contains("Columns: TRACT, INCOME"));
    assert!(out.contains(&format!("failed: {}", fail.msg)));
    assert!(out.contains(&format!("Layer {} (shapefile)", layer.layer_name)));
    assert!(out.contains("metadata NOT sent"));
}

#[test]
fn unreadable_tables_say_so() {
    let file = GisDataFile::factory(FileKind::Tabular);
    let mut info = TabularFileInfo::factory(&file);
    info.is_file_readable = false;
    assert_eq!(tabular_details(&info), vec![("Readable", "false".to_owned())]);
}

//! The `check-zip` subcommand.

use geoconnect_common::{
    prelude::*,
    services::shapefile::{LABEL_MULTIPLE_SHAPEFILES, LABEL_NOT_A_SHAPEFILE, LABEL_NO_FILE},
    shapefile::{check_zip, ZipCheck, MANDATORY_EXTENSIONS},
};

/// Run the `check-zip` subcommand. Fails unless the zip holds exactly one
/// shapefile set.
pub fn run(path: &Path) -> Result<()> {
    let check = check_zip(path);
    print!("{}", describe_check(&check));
    match check {
        ZipCheck::Single { .. } => Ok(()),
        _ => Err(format_err!("{} is not a usable shapefile zip", path.display())),
    }
}

/// Summarize `check` for a terminal.
fn describe_check(check: &ZipCheck) -> String {
    let mut out = String::new();
    let headline = match check {
        ZipCheck::NoFileToCheck => LABEL_NO_FILE.to_owned(),
        ZipCheck::NoShapefiles { .. } => format!(
            "{} Each set needs: {}",
            LABEL_NOT_A_SHAPEFILE,
            MANDATORY_EXTENSIONS.join(", "),
        ),
        ZipCheck::MultipleShapefiles { set_names, .. } => format!(
            "{} {}",
            LABEL_MULTIPLE_SHAPEFILES,
            set_names.join(", ")
        ),
        ZipCheck::Single { set_name, .. } => format!("shapefile: {}", set_name),
    };
    out.push_str(&headline);
    out.push('\n');
    for name in check.zip_names() {
        out.push_str("  ");
        out.push_str(name);
        out.push('\n');
    }
    out
}

#[test]
fn describes_each_result() {
    let names = vec!["roads.shp".to_owned(), "roads.dbf".to_owned()];
    let none = describe_check(&ZipCheck::NoShapefiles {
        zip_names: names.clone(),
    });
    assert!(none.starts_with("(not a shapefile) Each set needs: .shp, .shx, .dbf, .prj\n"));
    assert!(none.contains("  roads.dbf\n"));

    let many = describe_check(&ZipCheck::MultipleShapefiles {
        set_names: vec!["a".to_owned(), "b".to_owned()],
        zip_names: vec![],
    });
    assert_eq!(many, "(multiple shapefiles found) a, b\n");

    let one = describe_check(&ZipCheck::Single {
        set_name: "roads".to_owned(),
        zip_names: names,
    });
    assert_eq!(one, "shapefile: roads\n  roads.shp\n  roads.dbf\n");
    assert_eq!(describe_check(&ZipCheck::NoFileToCheck), "(no file to check)\n");
}

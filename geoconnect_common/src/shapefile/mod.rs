//! Checking zip files for shapefiles.
//!
//! A shapefile is really a *set* of files sharing a base name. WorldMap will
//! only import a zip containing exactly one complete set.

use std::collections::BTreeSet;
use thiserror::Error;
use zip::ZipArchive;

use crate::prelude::*;

pub mod dbf;
pub mod shp;

pub use self::dbf::DbfColumn;

/// Every shapefile set must contain these.
pub const MANDATORY_EXTENSIONS: &[&str] = &[".shp", ".shx", ".dbf", ".prj"];

/// The result of looking inside a zip file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ZipCheck {
    /// The file was missing, unreadable, or not a zip.
    NoFileToCheck,
    /// The zip contains no complete shapefile set.
    NoShapefiles {
        /// Everything in the zip.
        zip_names: Vec<String>,
    },
    /// The zip contains more than one shapefile set.
    MultipleShapefiles {
        /// The sets we found.
        set_names: Vec<String>,
        /// Everything in the zip.
        zip_names: Vec<String>,
    },
    /// Exactly one set. This is what we want.
    Single {
        /// The set's path inside the zip, without an extension.
        set_name: String,
        /// Everything in the zip.
        zip_names: Vec<String>,
    },
}

impl ZipCheck {
    /// The member names of the zip, if we could read it.
    pub fn zip_names(&self) -> &[String] {
        match self {
            ZipCheck::NoFileToCheck => &[],
            ZipCheck::NoShapefiles { zip_names }
            | ZipCheck::MultipleShapefiles { zip_names, .. }
            | ZipCheck::Single { zip_names, .. } => zip_names,
        }
    }
}

/// Look inside the zip file at `path`.
#[instrument(level = "debug")]
pub fn check_zip(path: &Path) -> ZipCheck {
    let zip_names = match list_zip(path) {
        Ok(names) => names,
        Err(err) => {
            warn!("could not check {}: {:#}", path.display(), err);
            return ZipCheck::NoFileToCheck;
        }
    };
    let mut set_names = shapefile_set_names(&zip_names);
    match set_names.len() {
        0 => ZipCheck::NoShapefiles { zip_names },
        1 => ZipCheck::Single {
            set_name: set_names.remove(0),
            zip_names,
        },
        _ => ZipCheck::MultipleShapefiles {
            set_names,
            zip_names,
        },
    }
}

fn list_zip(path: &Path) -> Result<Vec<String>> {
    let f = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let mut archive = ZipArchive::new(f).context("not a zip file")?;
    let mut names = vec![];
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("could not read zip entry {}", i))?;
        if !entry.is_dir() {
            names.push(entry.name().to_owned());
        }
    }
    Ok(names)
}

/// Is this zip member junk added by an operating system?
fn is_ignored(name: &str) -> bool {
    let basename = name.rsplit('/').next().unwrap_or(name);
    name.starts_with("__MACOSX/") || name.contains("/__MACOSX/") || basename.starts_with('.')
}

/// Split `"dir/name.SHP"` into `("dir/name", ".shp")`.
fn split_extension(name: &str) -> Option<(&str, String)> {
    let slash = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = name[slash..].rfind('.')? + slash;
    if dot == slash {
        return None;
    }
    Some((&name[..dot], name[dot..].to_ascii_lowercase()))
}

/// Find complete shapefile sets among `zip_names`.
pub fn shapefile_set_names(zip_names: &[String]) -> Vec<String> {
    let mut sets: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for name in zip_names.iter().filter(|n| !is_ignored(n)) {
        if let Some((stem, ext)) = split_extension(name) {
            sets.entry(stem).or_default().insert(ext);
        }
    }
    sets.into_iter()
        .filter(|(_, exts)| MANDATORY_EXTENSIONS.iter().all(|m| exts.contains(*m)))
        .map(|(stem, _)| stem.to_owned())
        .collect()
}

/// We found a shapefile set, but couldn't read it.
#[derive(Debug, Error)]
#[error("could not process shapefile: {message}")]
pub struct CouldNotProcessShapefile {
    /// What went wrong.
    pub message: String,
}

/// What we learned about a shapefile set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShapefileDetails {
    /// The set name without any directory.
    pub name: String,
    /// Shape type code.
    pub shape_type: i32,
    /// `[xmin, ymin, xmax, ymax]`.
    pub bounding_box: [f64; 4],
    /// Feature count, from the `.shx` index.
    pub number_of_features: i32,
    /// Rows in the attribute table. Should equal `number_of_features`.
    pub record_count: u32,
    /// Attribute columns.
    pub columns: Vec<DbfColumn>,
}

impl ShapefileDetails {
    /// Just the column names.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Extract the files for `set_name` from the zip at `zip_path` into
/// `scratch_dir`, and read their headers.
#[instrument(level = "debug", skip(scratch_dir))]
pub fn extract_and_load(
    zip_path: &Path,
    set_name: &str,
    scratch_dir: &Path,
) -> Result<ShapefileDetails, CouldNotProcessShapefile> {
    extract_and_load_inner(zip_path, set_name, scratch_dir).map_err(|err| {
        CouldNotProcessShapefile {
            message: format!("{:#}", err),
        }
    })
}

fn extract_and_load_inner(
    zip_path: &Path,
    set_name: &str,
    scratch_dir: &Path,
) -> Result<ShapefileDetails> {
    let f = File::open(zip_path)
        .with_context(|| format!("could not open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(f).context("not a zip file")?;
    fs::create_dir_all(scratch_dir)
        .with_context(|| format!("could not create {}", scratch_dir.display()))?;

    let base = set_name.rsplit('/').next().unwrap_or(set_name).to_owned();
    let mut extracted = HashMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || is_ignored(entry.name()) {
            continue;
        }
        let ext = match split_extension(entry.name()) {
            Some((stem, ext)) if stem == set_name => ext,
            _ => continue,
        };
        // Flatten into the scratch directory, using only our own file names.
        let dest = scratch_dir.join(format!("{}{}", base, ext));
        let mut out = File::create(&dest)
            .with_context(|| format!("could not create {}", dest.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("could not extract {}", dest.display()))?;
        extracted.insert(ext, dest);
    }

    let path_for = |ext: &str| {
        extracted
            .get(ext)
            .ok_or_else(|| format_err!("{}{} is missing from the zip", set_name, ext))
    };
    let shp = shp::ShpHeader::read(path_for(".shp")?)?;
    let shx = shp::ShpHeader::read(path_for(".shx")?)?;
    let dbf = dbf::DbfHeader::read(path_for(".dbf")?)?;
    let number_of_features = shx.shx_feature_count()?;
    if cast::i64(dbf.record_count) != i64::from(number_of_features) {
        warn!(
            "{} has {} shapes but {} attribute rows",
            set_name, number_of_features, dbf.record_count
        );
    }

    Ok(ShapefileDetails {
        name: base,
        shape_type: shp.shape_type,
        bounding_box: shp.bounding_box,
        number_of_features,
        record_count: dbf.record_count,
        columns: dbf.columns,
    })
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::io::Write as _;
    use zip::{write::FileOptions, ZipWriter};

    use super::*;

    /// Write a zip containing `files` to `path`.
    pub(crate) fn write_zip(path: &Path, files: &[(&str, Vec<u8>)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    /// The members of a small but valid polygon shapefile called `stem`.
    pub(crate) fn polygon_set(stem: &str) -> Vec<(String, Vec<u8>)> {
        let bbox = [-71.19, 42.22, -70.92, 42.40];
        vec![
            (format!("{}.shp", stem), shp::header_bytes(100, 5, bbox)),
            (format!("{}.shx", stem), shp::header_bytes(100 + 2 * 8, 5, bbox)),
            (
                format!("{}.dbf", stem),
                dbf::header_bytes(2, &[("TRACT", 'C', 11, 0), ("INCOME", 'N', 12, 2)]),
            ),
            (format!("{}.prj", stem), b"GEOGCS[\"WGS 84\"]".to_vec()),
        ]
    }

    pub(crate) fn as_refs(files: &[(String, Vec<u8>)]) -> Vec<(&str, Vec<u8>)> {
        files.iter().map(|(n, c)| (&n[..], c.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sets_need_every_mandatory_extension() {
        let zip_names = names(&[
            "boston/income.shp",
            "boston/income.SHX",
            "boston/income.dbf",
            "boston/income.prj",
            "boston/roads.shp",
            "boston/roads.dbf",
            "__MACOSX/boston/._income.shp",
            "boston/.DS_Store",
            "README",
        ]);
        assert_eq!(shapefile_set_names(&zip_names), vec!["boston/income"]);
    }

    #[test]
    fn missing_and_non_zip_files_have_nothing_to_check() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_zip(&dir.path().join("nope.zip")), ZipCheck::NoFileToCheck);
        let text = dir.path().join("notes.zip");
        fs::write(&text, "just some text").unwrap();
        assert_eq!(check_zip(&text), ZipCheck::NoFileToCheck);
    }

    #[test]
    fn classifies_zip_contents() {
        let dir = tempfile::tempdir().unwrap();

        let none = dir.path().join("none.zip");
        write_zip(&none, &[("data.csv", b"a,b\n1,2\n".to_vec())]);
        assert_eq!(
            check_zip(&none),
            ZipCheck::NoShapefiles {
                zip_names: names(&["data.csv"])
            }
        );

        let two = dir.path().join("two.zip");
        let mut files = polygon_set("a");
        files.extend(polygon_set("b"));
        write_zip(&two, &as_refs(&files));
        match check_zip(&two) {
            ZipCheck::MultipleShapefiles { set_names, zip_names } => {
                assert_eq!(set_names, names(&["a", "b"]));
                assert_eq!(zip_names.len(), 8);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn loads_a_single_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("income.zip");
        let mut files = polygon_set("data/income");
        files.push(("data/notes.txt".to_owned(), b"hello".to_vec()));
        write_zip(&zip_path, &as_refs(&files));

        let set_name = match check_zip(&zip_path) {
            ZipCheck::Single { set_name, .. } => set_name,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(set_name, "data/income");

        let scratch = dir.path().join("scratch");
        let details = extract_and_load(&zip_path, &set_name, &scratch).unwrap();
        assert_eq!(details.name, "income");
        assert_eq!(details.shape_type, 5);
        assert_eq!(details.number_of_features, 2);
        assert_eq!(details.record_count, 2);
        assert_eq!(details.column_names(), vec!["TRACT", "INCOME"]);
        assert!(scratch.join("income.prj").exists());
        assert!(!scratch.join("notes.txt").exists());
    }

    #[test]
    fn broken_shapefiles_cannot_be_processed() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("broken.zip");
        let mut files = polygon_set("broken");
        files[0].1 = b"garbage".to_vec();
        write_zip(&zip_path, &as_refs(&files));
        let err = extract_and_load(&zip_path, "broken", &dir.path().join("s")).unwrap_err();
        assert!(err.message.contains("broken.shp"), "{}", err.message);
    }
}

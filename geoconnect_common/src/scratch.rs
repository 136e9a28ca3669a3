//! Working directories and stored copies of uploaded files.

use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;

use crate::prelude::*;

/// The scratch directory for a file with the given `md5`.
pub fn scratch_dir_for(settings: &Settings, md5: &str) -> PathBuf {
    settings.scratch_directory.join(md5)
}

/// Make sure `file` has a scratch directory, creating it and recording it in
/// the database if needed.
pub fn ensure_scratch_dir(
    file: &mut GisDataFile,
    settings: &Settings,
    conn: &PgConnection,
) -> Result<PathBuf> {
    let dir = if file.gis_scratch_work_directory.is_empty() {
        scratch_dir_for(settings, &file.md5)
    } else {
        PathBuf::from(&file.gis_scratch_work_directory)
    };
    if !dir.exists() {
        debug!("creating scratch directory {}", dir.display());
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
    }
    let recorded = dir.to_string_lossy();
    if file.gis_scratch_work_directory != recorded {
        file.set_scratch_directory(&recorded, conn)?;
    }
    Ok(dir)
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    if dir.as_os_str().is_empty() || !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(dir).with_context(|| format!("could not remove {}", dir.display()))?;
    Ok(true)
}

/// Remove a file if it exists.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if path.as_os_str().is_empty() || !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("could not remove {}", path.display()))?;
    Ok(true)
}

/// Make an uploaded file name safe to use on disk.
pub fn sanitize_file_name(name: &str) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9._-]+").expect("invalid regex");
    }
    // Browsers on Windows may send a full path.
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned = UNSAFE.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// Where to keep a new upload called `name`, relative to the media root.
/// Uploads are grouped by day, as in `dv_files/2024/03/11/`.
pub fn media_path_for_upload(name: &str, now: NaiveDateTime) -> PathBuf {
    let prefix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    PathBuf::from("dv_files")
        .join(now.format("%Y/%m/%d").to_string())
        .join(format!("{}-{}", prefix.to_ascii_lowercase(), sanitize_file_name(name)))
}

/// Pick a place under the media root for a new upload called `name`, and
/// create its parent directory. Returns the path relative to the root, which
/// is what we record, and the absolute path to write to.
pub fn prepare_upload_path(settings: &Settings, name: &str) -> Result<(PathBuf, PathBuf)> {
    let relative = media_path_for_upload(name, Utc::now().naive_utc());
    let dest = settings.media_root.join(&relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    Ok((relative, dest))
}

/// The absolute path to a stored copy.
pub fn media_path(settings: &Settings, relative: &str) -> PathBuf {
    settings.media_root.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("C:\\Users\\me\\boston income.zip"), "boston_income.zip");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("tracts.tab"), "tracts.tab");
    }

    #[test]
    fn uploads_are_grouped_by_day() {
        let now = NaiveDate::from_ymd(2024, 3, 11).and_hms(14, 22, 0);
        let path = media_path_for_upload("income.zip", now);
        let s = path.to_string_lossy();
        assert!(s.starts_with("dv_files/2024/03/11/"), "{}", s);
        assert!(s.ends_with("-income.zip"), "{}", s);
    }

    #[test]
    fn removing_missing_paths_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_dir_if_exists(&dir.path().join("nope")).unwrap());
        assert!(!remove_file_if_exists(Path::new("")).unwrap());
        let sub = dir.path().join("abc");
        fs::create_dir_all(sub.join("inner")).unwrap();
        assert!(remove_dir_if_exists(&sub).unwrap());
        assert!(!sub.exists());
    }
}

//! Removing old data files.

use crate::prelude::*;
use crate::scratch::{remove_dir_if_exists, remove_file_if_exists, scratch_dir_for};

/// What a cleanup pass did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CleanupReport {
    /// MD5s of the files we removed, or would have removed.
    pub removed: Vec<String>,
    /// MD5s of files we couldn't remove.
    pub failed: Vec<String>,
    /// Was this a dry run?
    pub dry_run: bool,
}

/// Remove the scratch directory and stored copy belonging to `file`. The
/// database record is left alone.
pub fn remove_artifacts(file: &GisDataFile, settings: &Settings) -> Result<()> {
    let scratch = if file.gis_scratch_work_directory.is_empty() {
        scratch_dir_for(settings, &file.md5)
    } else {
        PathBuf::from(&file.gis_scratch_work_directory)
    };
    remove_dir_if_exists(&scratch)?;
    if let Some(stored) = file.dv_file_fullpath(settings) {
        remove_file_if_exists(&stored)?;
    }
    Ok(())
}

fn remove_one(file: &GisDataFile, settings: &Settings, conn: &PgConnection) -> Result<()> {
    remove_artifacts(file, settings)?;
    file.delete(conn)
}

/// Delete every file of `kind`, including scratch directories and stored
/// copies. Returns the number of records deleted.
#[instrument(level = "info", skip(settings, conn))]
pub fn delete_all_files(kind: FileKind, settings: &Settings, conn: &PgConnection) -> Result<usize> {
    conn.transaction::<_, Error, _>(|| {
        let files = GisDataFile::list(Some(kind), conn)?;
        for file in &files {
            remove_artifacts(file, settings)
                .with_context(|| format!("could not remove files for {}", file.md5))?;
        }
        GisDataFile::delete_all(kind, conn)
    })
}

/// Delete data files not updated within `settings.file_retention`, along
/// with their scratch directories and stored copies. A file which can't be
/// removed is logged and skipped.
#[instrument(level = "info", skip(settings, conn))]
pub fn cleanup(
    settings: &Settings,
    now: NaiveDateTime,
    dry_run: bool,
    conn: &PgConnection,
) -> Result<CleanupReport> {
    let mut report = CleanupReport {
        dry_run,
        ..CleanupReport::default()
    };
    for file in GisDataFile::older_than(settings.file_retention, now, conn)? {
        if dry_run {
            info!("would remove {} ({})", file.md5, file.datafile_label);
            report.removed.push(file.md5);
            continue;
        }
        match remove_one(&file, settings, conn) {
            Ok(()) => {
                debug!("removed {}", file.md5);
                report.removed.push(file.md5);
            }
            Err(err) => {
                error!("could not remove {}: {:#}", file.md5, err);
                report.failed.push(file.md5);
            }
        }
    }
    if !report.removed.is_empty() || !report.failed.is_empty() {
        info!(
            "cleanup removed {} files, {} failures",
            report.removed.len(),
            report.failed.len()
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &Path) -> Settings {
        let root = dir.to_owned();
        Settings::from_lookup(move |key| {
            let value = match key {
                "DATABASE_URL" => "postgres://localhost/geoconnect_test".to_owned(),
                "DATAVERSE_SERVER_URL" | "WORLDMAP_SERVER_URL" => "http://localhost/".to_owned(),
                "WORLDMAP_SIGNATURE_KEY" => "shared-key".to_owned(),
                "GEOCONNECT_MEDIA_ROOT" => root.join("media").display().to_string(),
                "GEOCONNECT_SCRATCH_DIRECTORY" => root.join("scratch").display().to_string(),
                _ => return None,
            };
            Some(value)
        })
        .unwrap()
    }

    #[test]
    fn artifacts_are_removed_with_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let mut file = GisDataFile::factory(FileKind::Tabular);
        file.dv_file_path = Some("dv_files/2024/03/11/ab12-income.tab".to_owned());

        let scratch = scratch_dir_for(&settings, &file.md5);
        fs::create_dir_all(scratch.join("unzipped")).unwrap();
        fs::write(scratch.join("unzipped/income.shp"), b"shp").unwrap();
        let stored = file.dv_file_fullpath(&settings).unwrap();
        fs::create_dir_all(stored.parent().unwrap()).unwrap();
        fs::write(&stored, b"tract\tincome\n").unwrap();

        remove_artifacts(&file, &settings).unwrap();
        assert!(!scratch.exists());
        assert!(!stored.exists());

        // Already gone is fine.
        remove_artifacts(&file, &settings).unwrap();
    }

    #[test]
    fn recorded_scratch_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        let mut file = GisDataFile::factory(FileKind::Shapefile);
        file.gis_scratch_work_directory = elsewhere.display().to_string();
        file.dv_file_path = None;

        remove_artifacts(&file, &settings).unwrap();
        assert!(!elsewhere.exists());
    }
}

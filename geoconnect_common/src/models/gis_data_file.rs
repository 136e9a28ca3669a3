use std::time::Duration;

use crate::forms::DataverseInfo;
use crate::prelude::*;
use crate::schema::*;

/// A Dataverse file which somebody is mapping. These records only last a few
/// days before the cleanup job removes them.
#[derive(Clone, Debug, Identifiable, Queryable, Serialize)]
#[table_name = "gis_data_files"]
pub struct GisDataFile {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// When this record was last updated.
    pub updated_at: NaiveDateTime,
    /// Our public identifier, used in URLs.
    pub md5: String,
    /// What kind of file this is.
    pub file_kind: FileKind,
    /// Dataverse user ID, for API calls.
    pub dv_user_id: i32,
    /// Dataverse username, for display.
    pub dv_username: String,
    /// Where WorldMap should send notifications.
    pub dv_user_email: String,
    /// The owning dataverse.
    pub dv_id: i32,
    /// The owning dataverse's name.
    pub dv_name: String,
    /// The dataset containing this file.
    pub dataset_id: i32,
    /// The dataset's name.
    pub dataset_name: String,
    /// The dataset citation.
    pub dataset_citation: String,
    /// The Dataverse file ID.
    pub datafile_id: i32,
    /// The file version, if known.
    pub datafile_version: Option<i64>,
    /// The file's label, usually its name.
    pub datafile_label: String,
    /// The file's description.
    pub datafile_description: String,
    /// The file's MIME type.
    pub datafile_type: String,
    /// The checksum Dataverse expects.
    pub datafile_expected_md5_checksum: String,
    /// Is access to this file restricted?
    pub datafile_is_restricted: bool,
    /// Name of the Dataverse installation.
    pub dataverse_installation_name: String,
    /// Link back to the dataset page.
    pub return_to_dataverse_url: String,
    /// Token for calling Dataverse for this user.
    #[serde(skip_serializing)]
    pub dv_session_token: String,
    /// Our stored copy, relative to the media root.
    pub dv_file_path: Option<String>,
    /// Scratch directory for unzipping and inspecting the file.
    pub gis_scratch_work_directory: String,
}

impl GisDataFile {
    /// Find a file by ID.
    pub fn find(id: i32, conn: &PgConnection) -> Result<GisDataFile> {
        gis_data_files::table
            .find(id)
            .first(conn)
            .with_context(|| format!("could not load data file {}", id))
    }

    /// Find a file by its public identifier.
    pub fn find_by_md5(md5: &str, conn: &PgConnection) -> Result<Option<GisDataFile>> {
        gis_data_files::table
            .filter(gis_data_files::md5.eq(md5))
            .first(conn)
            .optional()
            .with_context(|| format!("could not look up data file {}", md5))
    }

    /// List files, newest first, optionally limited to one kind.
    pub fn list(kind: Option<FileKind>, conn: &PgConnection) -> Result<Vec<GisDataFile>> {
        let mut query = gis_data_files::table
            .order_by(gis_data_files::updated_at.desc())
            .into_boxed();
        if let Some(kind) = kind {
            query = query.filter(gis_data_files::file_kind.eq(kind));
        }
        query.load(conn).context("could not list data files")
    }

    /// Files which haven't been touched since `now - age`.
    pub fn older_than(
        age: Duration,
        now: NaiveDateTime,
        conn: &PgConnection,
    ) -> Result<Vec<GisDataFile>> {
        let age = chrono::Duration::from_std(age).context("retention period is too long")?;
        gis_data_files::table
            .filter(gis_data_files::updated_at.lt(now - age))
            .order_by(gis_data_files::updated_at.asc())
            .load(conn)
            .context("could not find old data files")
    }

    /// Record where we stored our copy of this file.
    pub fn set_dv_file_path(&mut self, path: &str, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(gis_data_files::table.filter(gis_data_files::id.eq(self.id)))
            .set(gis_data_files::dv_file_path.eq(Some(path)))
            .get_result(conn)
            .context("could not record stored file path")?;
        Ok(())
    }

    /// Record our scratch directory.
    pub fn set_scratch_directory(&mut self, dir: &str, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(gis_data_files::table.filter(gis_data_files::id.eq(self.id)))
            .set(gis_data_files::gis_scratch_work_directory.eq(dir))
            .get_result(conn)
            .context("could not record scratch directory")?;
        Ok(())
    }

    /// Delete this record. Everything belonging to it goes too.
    pub fn delete(&self, conn: &PgConnection) -> Result<()> {
        diesel::delete(gis_data_files::table.filter(gis_data_files::id.eq(self.id)))
            .execute(conn)
            .with_context(|| format!("could not delete data file {}", self.id))?;
        Ok(())
    }

    /// Delete every file of `kind`. Only used by the test-only admin routes.
    pub fn delete_all(kind: FileKind, conn: &PgConnection) -> Result<usize> {
        diesel::delete(gis_data_files::table.filter(gis_data_files::file_kind.eq(kind)))
            .execute(conn)
            .context("could not delete data files")
    }

    /// A readable name, as `dataverse : dataset : file`.
    pub fn display_name(&self) -> String {
        format!(
            "{} : {} : {}",
            self.dv_name, self.dataset_name, self.datafile_label
        )
    }

    /// The stored copy of this file, if we have one.
    pub fn dv_file_fullpath(&self, settings: &Settings) -> Option<PathBuf> {
        self.dv_file_path
            .as_ref()
            .map(|p| crate::scratch::media_path(settings, p))
    }

    /// Generate a sample value for testing.
    pub fn factory(file_kind: FileKind) -> Self {
        let now = Utc::now().naive_utc();
        let label = match file_kind {
            FileKind::Shapefile => "income_shapefile.zip",
            FileKind::Tabular => "boston_income.tab",
        };
        GisDataFile {
            id: 1,
            created_at: now,
            updated_at: now,
            md5: record_md5(1, label),
            file_kind,
            dv_user_id: 7,
            dv_username: "mapper".to_owned(),
            dv_user_email: "mapper@example.edu".to_owned(),
            dv_id: 3,
            dv_name: "Urban Data".to_owned(),
            dataset_id: 11,
            dataset_name: "Boston Income".to_owned(),
            dataset_citation: "Mapper, 2024, \"Boston Income\"".to_owned(),
            datafile_id: 42,
            datafile_version: Some(1),
            datafile_label: label.to_owned(),
            datafile_description: "Median income by census tract".to_owned(),
            datafile_type: "application/zipped-shapefile".to_owned(),
            datafile_expected_md5_checksum: String::new(),
            datafile_is_restricted: false,
            dataverse_installation_name: "Harvard Dataverse".to_owned(),
            return_to_dataverse_url: "https://dataverse.example.edu/dataset.xhtml?id=11"
                .to_owned(),
            dv_session_token: "token".to_owned(),
            dv_file_path: Some(format!("dv_files/2024/03/11/abcd1234-{}", label)),
            gis_scratch_work_directory: String::new(),
        }
    }
}

/// Data required to create a new `GisDataFile`.
#[derive(Debug, Insertable)]
#[table_name = "gis_data_files"]
pub struct NewGisDataFile {
    /// What kind of file this is.
    pub file_kind: FileKind,
    /// Dataverse user ID.
    pub dv_user_id: i32,
    /// Dataverse username.
    pub dv_username: String,
    /// User email.
    pub dv_user_email: String,
    /// The owning dataverse.
    pub dv_id: i32,
    /// The owning dataverse's name.
    pub dv_name: String,
    /// The dataset containing this file.
    pub dataset_id: i32,
    /// The dataset's name.
    pub dataset_name: String,
    /// The dataset citation.
    pub dataset_citation: String,
    /// The Dataverse file ID.
    pub datafile_id: i32,
    /// The file version.
    pub datafile_version: Option<i64>,
    /// The file's label.
    pub datafile_label: String,
    /// The file's description.
    pub datafile_description: String,
    /// The file's MIME type.
    pub datafile_type: String,
    /// The checksum Dataverse expects.
    pub datafile_expected_md5_checksum: String,
    /// Is access restricted?
    pub datafile_is_restricted: bool,
    /// Name of the Dataverse installation.
    pub dataverse_installation_name: String,
    /// Link back to the dataset page.
    pub return_to_dataverse_url: String,
    /// Token for calling Dataverse.
    pub dv_session_token: String,
    /// Our stored copy.
    pub dv_file_path: Option<String>,
}

impl NewGisDataFile {
    /// Build a record from the Dataverse context posted with an upload.
    pub fn from_dataverse_info(
        info: &DataverseInfo,
        file_kind: FileKind,
        dv_file_path: Option<String>,
    ) -> NewGisDataFile {
        NewGisDataFile {
            file_kind,
            dv_user_id: info.dv_user_id,
            dv_username: info.dv_username.clone(),
            dv_user_email: info.dv_user_email.clone(),
            dv_id: info.dataverse_id,
            dv_name: info.dataverse_name.clone(),
            dataset_id: info.dataset_id,
            dataset_name: info.dataset_name.clone(),
            dataset_citation: info.dataset_citation.clone(),
            datafile_id: info.datafile_id,
            datafile_version: info.datafile_version,
            datafile_label: info.datafile_label.clone(),
            datafile_description: info.datafile_description.clone(),
            datafile_type: info.datafile_content_type.clone(),
            datafile_expected_md5_checksum: info.datafile_expected_md5_checksum.clone(),
            datafile_is_restricted: info.datafile_is_restricted,
            dataverse_installation_name: info.dataverse_installation_name.clone(),
            return_to_dataverse_url: info.return_to_dataverse_url.clone(),
            dv_session_token: info.dv_session_token.clone(),
            dv_file_path,
        }
    }

    /// Insert a new file, then fill in its `md5` now that we know its ID.
    pub fn insert(&self, conn: &PgConnection) -> Result<GisDataFile> {
        conn.transaction::<_, Error, _>(|| {
            let file: GisDataFile = diesel::insert_into(gis_data_files::table)
                .values(self)
                .get_result(conn)
                .context("error inserting data file")?;
            let md5 = record_md5(file.id, &file.datafile_label);
            Ok(diesel::update(gis_data_files::table.filter(gis_data_files::id.eq(file.id)))
                .set(gis_data_files::md5.eq(&md5))
                .get_result(conn)
                .context("error setting data file md5")?)
        })
    }
}

#[test]
fn display_name_joins_dataverse_names() {
    let file = GisDataFile::factory(FileKind::Shapefile);
    assert_eq!(
        file.display_name(),
        "Urban Data : Boston Income : income_shapefile.zip"
    );
    assert_eq!(file.md5, record_md5(1, "income_shapefile.zip"));
    let json = serde_json::to_value(&file).unwrap();
    assert!(json.get("dv_session_token").is_none());
    assert_eq!(json["file_kind"], "shapefile");
}

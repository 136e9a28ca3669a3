use serde_json::{json, Value};

use crate::prelude::*;
use crate::schema::*;
use crate::tabular::TabularSummary;

/// The shape of a delimited text file.
#[derive(Associations, Clone, Debug, Identifiable, Queryable, Serialize)]
#[belongs_to(GisDataFile, foreign_key = "gis_data_file_id")]
#[table_name = "tabular_file_infos"]
pub struct TabularFileInfo {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// When this record was last updated.
    pub updated_at: NaiveDateTime,
    /// The file we examined.
    pub gis_data_file_id: i32,
    /// The field delimiter.
    pub delimiter: String,
    /// Could we read the file at all?
    pub is_file_readable: bool,
    /// Data rows.
    pub num_rows: i32,
    /// Columns.
    pub num_columns: i32,
    /// Column names from the header row.
    pub column_names: Value,
}

impl TabularFileInfo {
    /// Find by ID.
    pub fn find(id: i32, conn: &PgConnection) -> Result<TabularFileInfo> {
        tabular_file_infos::table
            .find(id)
            .first(conn)
            .with_context(|| format!("could not load tabular file info {}", id))
    }

    /// Find the info for `file`, if we've created it.
    pub fn find_for_file(
        file: &GisDataFile,
        conn: &PgConnection,
    ) -> Result<Option<TabularFileInfo>> {
        TabularFileInfo::belonging_to(file)
            .first(conn)
            .optional()
            .with_context(|| format!("could not load tabular file info for {}", file.md5))
    }

    /// The data file this describes.
    pub fn gis_data_file(&self, conn: &PgConnection) -> Result<GisDataFile> {
        GisDataFile::find(self.gis_data_file_id, conn)
    }

    /// Column names, as strings.
    pub fn column_name_list(&self) -> Vec<String> {
        serde_json::from_value(self.column_names.clone()).unwrap_or_default()
    }

    /// Generate a sample value for testing.
    pub fn factory(file: &GisDataFile) -> Self {
        let now = Utc::now().naive_utc();
        TabularFileInfo {
            id: 1,
            created_at: now,
            updated_at: now,
            gis_data_file_id: file.id,
            delimiter: "\t".to_owned(),
            is_file_readable: true,
            num_rows: 180,
            num_columns: 4,
            column_names: json!(["tract", "income", "lat", "lng"]),
        }
    }
}

/// Data required to create a new `TabularFileInfo`.
#[derive(Debug, Insertable)]
#[table_name = "tabular_file_infos"]
pub struct NewTabularFileInfo {
    /// The file we examined.
    pub gis_data_file_id: i32,
    /// The field delimiter.
    pub delimiter: String,
    /// Could we read the file?
    pub is_file_readable: bool,
    /// Data rows.
    pub num_rows: i32,
    /// Columns.
    pub num_columns: i32,
    /// Column names.
    pub column_names: Value,
}

impl NewTabularFileInfo {
    /// Build from a summary of the file.
    pub fn from_summary(file: &GisDataFile, summary: &TabularSummary) -> NewTabularFileInfo {
        NewTabularFileInfo {
            gis_data_file_id: file.id,
            delimiter: summary.delimiter.clone(),
            is_file_readable: true,
            num_rows: summary.num_rows,
            num_columns: summary.num_columns,
            column_names: json!(summary.column_names),
        }
    }

    /// Record a file we couldn't read.
    pub fn unreadable(file: &GisDataFile) -> NewTabularFileInfo {
        NewTabularFileInfo {
            gis_data_file_id: file.id,
            delimiter: ",".to_owned(),
            is_file_readable: false,
            num_rows: 0,
            num_columns: 0,
            column_names: json!([]),
        }
    }

    /// Insert into the database.
    pub fn insert(&self, conn: &PgConnection) -> Result<TabularFileInfo> {
        diesel::insert_into(tabular_file_infos::table)
            .values(self)
            .get_result(conn)
            .context("error inserting tabular file info")
    }
}

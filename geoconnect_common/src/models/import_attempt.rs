use crate::prelude::*;
use crate::schema::*;

/// One attempt to send a shapefile to WorldMap.
#[derive(Associations, Clone, Debug, Identifiable, Queryable, Serialize)]
#[belongs_to(GisDataFile, foreign_key = "gis_data_file_id")]
#[table_name = "worldmap_import_attempts"]
pub struct WorldMapImportAttempt {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// When this record was last updated.
    pub updated_at: NaiveDateTime,
    /// The file being imported.
    pub gis_data_file_id: i32,
    /// The layer title we asked for.
    pub title: String,
    /// The layer abstract we sent.
    pub abstract_text: String,
    /// The shapefile set name.
    pub shapefile_name: String,
    /// How things went.
    pub import_status: AttemptStatus,
}

impl WorldMapImportAttempt {
    /// The most recent attempt for `file`, if any.
    pub fn latest_for_file(
        file: &GisDataFile,
        conn: &PgConnection,
    ) -> Result<Option<WorldMapImportAttempt>> {
        WorldMapImportAttempt::belonging_to(file)
            .order_by((
                worldmap_import_attempts::updated_at.desc(),
                worldmap_import_attempts::id.desc(),
            ))
            .first(conn)
            .optional()
            .with_context(|| format!("could not load import attempts for {}", file.md5))
    }

    /// Mark this attempt as having produced a layer.
    pub fn mark_success(&mut self, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(
            worldmap_import_attempts::table.filter(worldmap_import_attempts::id.eq(self.id)),
        )
        .set(worldmap_import_attempts::import_status.eq(AttemptStatus::Success))
        .get_result(conn)
        .context("could not mark import attempt as successful")?;
        Ok(())
    }

    /// Mark this attempt as failed, and keep a record of why.
    pub fn mark_failure(
        &mut self,
        msg: &str,
        orig_response: &str,
        conn: &PgConnection,
    ) -> Result<WorldMapImportFail> {
        conn.transaction::<_, Error, _>(|| {
            *self = diesel::update(
                worldmap_import_attempts::table.filter(worldmap_import_attempts::id.eq(self.id)),
            )
            .set(worldmap_import_attempts::import_status.eq(AttemptStatus::Failure))
            .get_result(conn)
            .context("could not mark import attempt as failed")?;
            diesel::insert_into(worldmap_import_fails::table)
                .values((
                    worldmap_import_fails::import_attempt_id.eq(self.id),
                    worldmap_import_fails::msg.eq(msg),
                    worldmap_import_fails::orig_response.eq(orig_response),
                ))
                .get_result(conn)
                .context("could not record import failure")
        })
    }

    /// Failure records for this attempt, newest first.
    pub fn fails(&self, conn: &PgConnection) -> Result<Vec<WorldMapImportFail>> {
        WorldMapImportFail::belonging_to(self)
            .order_by(worldmap_import_fails::id.desc())
            .load(conn)
            .context("could not load import failures")
    }

    /// Delete every attempt. Only used by the test-only admin routes.
    pub fn delete_all(conn: &PgConnection) -> Result<usize> {
        diesel::delete(worldmap_import_attempts::table)
            .execute(conn)
            .context("could not delete import attempts")
    }

    /// Generate a sample value for testing.
    pub fn factory(file: &GisDataFile) -> Self {
        let now = Utc::now().naive_utc();
        WorldMapImportAttempt {
            id: 1,
            created_at: now,
            updated_at: now,
            gis_data_file_id: file.id,
            title: file.datafile_label.clone(),
            abstract_text: "Median income by census tract".to_owned(),
            shapefile_name: "income".to_owned(),
            import_status: AttemptStatus::Pending,
        }
    }
}

/// Data required to create a new `WorldMapImportAttempt`.
#[derive(Debug, Insertable)]
#[table_name = "worldmap_import_attempts"]
pub struct NewWorldMapImportAttempt {
    /// The file being imported.
    pub gis_data_file_id: i32,
    /// The layer title.
    pub title: String,
    /// The layer abstract.
    pub abstract_text: String,
    /// The shapefile set name.
    pub shapefile_name: String,
}

impl NewWorldMapImportAttempt {
    /// Insert a new, pending attempt.
    pub fn insert(&self, conn: &PgConnection) -> Result<WorldMapImportAttempt> {
        diesel::insert_into(worldmap_import_attempts::table)
            .values(self)
            .get_result(conn)
            .context("error inserting import attempt")
    }
}

/// Why an import attempt failed.
#[derive(Associations, Clone, Debug, Identifiable, Queryable, Serialize)]
#[belongs_to(WorldMapImportAttempt, foreign_key = "import_attempt_id")]
#[table_name = "worldmap_import_fails"]
pub struct WorldMapImportFail {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// The attempt which failed.
    pub import_attempt_id: i32,
    /// The message we showed.
    pub msg: String,
    /// The raw response, if we got one.
    pub orig_response: String,
}

impl WorldMapImportFail {
    /// Generate a sample value for testing.
    pub fn factory(attempt: &WorldMapImportAttempt) -> Self {
        WorldMapImportFail {
            id: 1,
            created_at: Utc::now().naive_utc(),
            import_attempt_id: attempt.id,
            msg: "Layer with that name already exists".to_owned(),
            orig_response: String::new(),
        }
    }
}

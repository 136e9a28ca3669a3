use serde_json::{json, Value};

use crate::prelude::*;
use crate::schema::*;
use crate::shapefile::{shp::shape_type_name, ShapefileDetails};

/// What we found when we looked inside a zipped shapefile.
#[derive(Associations, Clone, Debug, Identifiable, Queryable, Serialize)]
#[belongs_to(GisDataFile, foreign_key = "gis_data_file_id")]
#[table_name = "shapefile_infos"]
pub struct ShapefileInfo {
    /// The unique ID of this record.
    pub id: i32,
    /// When this record was created.
    pub created_at: NaiveDateTime,
    /// When this record was last updated.
    pub updated_at: NaiveDateTime,
    /// The file we examined.
    pub gis_data_file_id: i32,
    /// Have we looked inside the zip yet?
    pub zipfile_checked: bool,
    /// Did we find exactly one usable shapefile?
    pub has_shapefile: bool,
    /// The shapefile set name, or a label describing what went wrong.
    pub name: String,
    /// Shape type code from the `.shp` header.
    pub shape_type: Option<i32>,
    /// Feature count.
    pub number_of_features: Option<i32>,
    /// `[xmin, ymin, xmax, ymax]`.
    pub bounding_box: Option<Value>,
    /// Attribute column names.
    pub column_names: Value,
    /// Attribute column descriptions.
    pub column_info: Value,
}

impl ShapefileInfo {
    /// Find the shapefile info for `file`, if we've created it.
    pub fn find_for_file(file: &GisDataFile, conn: &PgConnection) -> Result<Option<ShapefileInfo>> {
        ShapefileInfo::belonging_to(file)
            .first(conn)
            .optional()
            .with_context(|| format!("could not load shapefile info for {}", file.md5))
    }

    /// Find or create the shapefile info for `file`.
    pub fn find_or_create_for_file(file: &GisDataFile, conn: &PgConnection) -> Result<ShapefileInfo> {
        match ShapefileInfo::find_for_file(file, conn)? {
            Some(info) => Ok(info),
            None => NewShapefileInfo {
                gis_data_file_id: file.id,
            }
            .insert(conn),
        }
    }

    /// Record that the zip check failed, with a `label` such as
    /// `"(not a shapefile)"`.
    pub fn record_check_failure(&mut self, label: &str, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(shapefile_infos::table.filter(shapefile_infos::id.eq(self.id)))
            .set((
                shapefile_infos::zipfile_checked.eq(true),
                shapefile_infos::has_shapefile.eq(false),
                shapefile_infos::name.eq(label),
            ))
            .get_result(conn)
            .context("could not record zip check failure")?;
        Ok(())
    }

    /// Record the details of a successfully loaded shapefile.
    pub fn record_loaded(&mut self, details: &ShapefileDetails, conn: &PgConnection) -> Result<()> {
        let column_info =
            serde_json::to_value(&details.columns).context("could not serialize columns")?;
        *self = diesel::update(shapefile_infos::table.filter(shapefile_infos::id.eq(self.id)))
            .set((
                shapefile_infos::zipfile_checked.eq(true),
                shapefile_infos::has_shapefile.eq(true),
                shapefile_infos::name.eq(&details.name),
                shapefile_infos::shape_type.eq(Some(details.shape_type)),
                shapefile_infos::number_of_features.eq(Some(details.number_of_features)),
                shapefile_infos::bounding_box.eq(Some(json!(details.bounding_box))),
                shapefile_infos::column_names.eq(json!(details.column_names())),
                shapefile_infos::column_info.eq(column_info),
            ))
            .get_result(conn)
            .context("could not record shapefile details")?;
        Ok(())
    }

    /// We found a shapefile set, but couldn't read it.
    pub fn mark_unloadable(&mut self, conn: &PgConnection) -> Result<()> {
        *self = diesel::update(shapefile_infos::table.filter(shapefile_infos::id.eq(self.id)))
            .set((
                shapefile_infos::zipfile_checked.eq(true),
                shapefile_infos::has_shapefile.eq(false),
            ))
            .get_result(conn)
            .context("could not mark shapefile as unloadable")?;
        Ok(())
    }

    /// The attribute column names, as strings.
    pub fn column_name_list(&self) -> Vec<String> {
        serde_json::from_value(self.column_names.clone()).unwrap_or_default()
    }

    /// A readable name for `shape_type`.
    pub fn shape_type_name(&self) -> Option<&'static str> {
        self.shape_type.and_then(shape_type_name)
    }

    /// Generate a sample value for testing.
    pub fn factory(file: &GisDataFile) -> Self {
        let now = Utc::now().naive_utc();
        ShapefileInfo {
            id: 1,
            created_at: now,
            updated_at: now,
            gis_data_file_id: file.id,
            zipfile_checked: true,
            has_shapefile: true,
            name: "income".to_owned(),
            shape_type: Some(5),
            number_of_features: Some(180),
            bounding_box: Some(json!([-71.19, 42.22, -70.92, 42.40])),
            column_names: json!(["TRACT", "INCOME"]),
            column_info: json!([
                {"name": "TRACT", "type": "C", "size": 11, "decimals": 0},
                {"name": "INCOME", "type": "N", "size": 12, "decimals": 2},
            ]),
        }
    }
}

/// Data required to create a new `ShapefileInfo`.
#[derive(Debug, Insertable)]
#[table_name = "shapefile_infos"]
pub struct NewShapefileInfo {
    /// The file we're examining.
    pub gis_data_file_id: i32,
}

impl NewShapefileInfo {
    /// Insert a new, unchecked record.
    pub fn insert(&self, conn: &PgConnection) -> Result<ShapefileInfo> {
        diesel::insert_into(shapefile_infos::table)
            .values(self)
            .get_result(conn)
            .context("error inserting shapefile info")
    }
}

#[test]
fn factory_columns_are_readable() {
    let info = ShapefileInfo::factory(&GisDataFile::factory(FileKind::Shapefile));
    assert_eq!(info.column_name_list(), vec!["TRACT", "INCOME"]);
    assert_eq!(info.shape_type_name(), Some("Polygon"));
}

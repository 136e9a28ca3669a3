//! Database models.

use diesel::{deserialize, pg::Pg, serialize};

use crate::prelude::*;

mod gis_data_file;
mod import_attempt;
mod layer_info;
mod shapefile_info;
mod tabular_file_info;

pub use self::gis_data_file::*;
pub use self::import_attempt::*;
pub use self::layer_info::*;
pub use self::shapefile_info::*;
pub use self::tabular_file_info::*;

/// Custom SQL types.
pub mod sql_types {
    /// The `file_kind` enumeration type, for use in Diesel's `table!` macro.
    #[derive(QueryId, SqlType)]
    #[postgres(type_name = "file_kind")]
    pub struct FileKind;

    /// The `attempt_status` enumeration type.
    #[derive(QueryId, SqlType)]
    #[postgres(type_name = "attempt_status")]
    pub struct AttemptStatus;

    /// The `layer_kind` enumeration type.
    #[derive(QueryId, SqlType)]
    #[postgres(type_name = "layer_kind")]
    pub struct LayerKind;
}

/// Map a Rust enum onto a PostgreSQL `ENUM` type. Each variant is paired
/// with the label used both in the database and in serialized output.
macro_rules! pg_enum {
    ($name:ident, $sql_type:ident, { $($variant:ident => $label:expr,)+ }) => {
        impl $name {
            /// The label used for this value in PostgreSQL and in JSON.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $(s if s == $label => Ok($name::$variant),)+
                    _ => Err(format_err!("unknown {} {:?}", stringify!($name), s)),
                }
            }
        }

        impl serialize::ToSql<sql_types::$sql_type, Pg> for $name {
            fn to_sql<W: Write>(
                &self,
                out: &mut serialize::Output<W, Pg>,
            ) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl deserialize::FromSql<sql_types::$sql_type, Pg> for $name {
            fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
                match not_none!(bytes) {
                    $(b if b == $label.as_bytes() => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Unrecognized {} value from database",
                        stringify!($sql_type),
                    )
                    .into()),
                }
            }
        }
    };
}

/// What kind of GIS file are we working with?
#[derive(
    AsExpression,
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    FromSqlRow,
    PartialEq,
    Serialize,
)]
#[sql_type = "sql_types::FileKind"]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A zipped shapefile set.
    Shapefile,
    /// A delimited text file which we can map using lat/lng columns or by
    /// joining it to an existing layer.
    Tabular,
}

pg_enum!(FileKind, FileKind, {
    Shapefile => "shapefile",
    Tabular => "tabular",
});

/// The state of an attempt to import a file into WorldMap.
#[derive(
    AsExpression,
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    FromSqlRow,
    PartialEq,
    Serialize,
)]
#[sql_type = "sql_types::AttemptStatus"]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// We've sent (or are about to send) the file.
    Pending,
    /// WorldMap created a layer.
    Success,
    /// WorldMap refused the file, or we couldn't reach it.
    Failure,
}

pg_enum!(AttemptStatus, AttemptStatus, {
    Pending => "pending",
    Success => "success",
    Failure => "failure",
});

/// How a WorldMap layer was created.
#[derive(
    AsExpression,
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    FromSqlRow,
    PartialEq,
    Serialize,
)]
#[sql_type = "sql_types::LayerKind"]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Imported from a shapefile.
    Shapefile,
    /// A table joined to an existing layer.
    TabularJoin,
    /// A table mapped using latitude and longitude columns.
    TabularLatLng,
}

pg_enum!(LayerKind, LayerKind, {
    Shapefile => "shapefile",
    TabularJoin => "tabular_join",
    TabularLatLng => "tabular_lat_lng",
});

impl LayerKind {
    /// Was this layer built from a tabular file?
    pub fn is_tabular(self) -> bool {
        matches!(self, LayerKind::TabularJoin | LayerKind::TabularLatLng)
    }
}

/// Compute the public identifier we use for records in URLs. This is an MD5
/// hex digest of the row ID followed by a human-readable name.
pub fn record_md5(id: i32, name: &str) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(format!("{}{}", id, name).as_bytes()))
}

#[test]
fn record_md5_is_stable() {
    assert_eq!(record_md5(12, "poverty.zip").len(), 32);
    assert_eq!(record_md5(12, "poverty.zip"), record_md5(12, "poverty.zip"));
    assert_ne!(record_md5(12, "poverty.zip"), record_md5(13, "poverty.zip"));
    assert_eq!(record_md5(1, ""), "c4ca4238a0b923820dcc509a6f75849b");
}

#[test]
fn enum_labels() {
    assert_eq!(FileKind::Shapefile.to_string(), "shapefile");
    assert_eq!(AttemptStatus::Failure.as_str(), "failure");
    assert_eq!(LayerKind::TabularLatLng.to_string(), "tabular_lat_lng");
    assert!(LayerKind::TabularJoin.is_tabular());
    assert!(!LayerKind::Shapefile.is_tabular());
    assert_eq!(
        serde_json::to_string(&LayerKind::TabularJoin).unwrap(),
        "\"tabular_join\""
    );
    assert_eq!("tabular".parse::<FileKind>().unwrap(), FileKind::Tabular);
    assert!("csv".parse::<FileKind>().is_err());
}

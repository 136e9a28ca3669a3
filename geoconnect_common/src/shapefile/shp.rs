//! Headers of `.shp` and `.shx` files.
//!
//! Both files start with the same 100-byte header. Integers in the first
//! part are big-endian, the rest little-endian.

use std::convert::TryInto;

use crate::prelude::*;

/// Length of the main file header, in bytes.
pub const HEADER_LEN: usize = 100;

/// The magic number at the start of every `.shp` and `.shx` file.
const FILE_CODE: i32 = 9994;

/// The only version ever published.
const VERSION: i32 = 1000;

/// Each `.shx` record is an offset and a length.
const SHX_RECORD_LEN: i64 = 8;

/// The parsed header.
#[derive(Clone, Debug, PartialEq)]
pub struct ShpHeader {
    /// Total file length in bytes.
    pub file_len: i64,
    /// Shape type code.
    pub shape_type: i32,
    /// `[xmin, ymin, xmax, ymax]`.
    pub bounding_box: [f64; 4],
}

impl ShpHeader {
    /// Parse a header from the start of a file.
    pub fn parse(bytes: &[u8]) -> Result<ShpHeader> {
        if bytes.len() < HEADER_LEN {
            return Err(format_err!(
                "header is only {} bytes long, expected {}",
                bytes.len(),
                HEADER_LEN
            ));
        }
        let file_code = be_i32(&bytes[0..4]);
        if file_code != FILE_CODE {
            return Err(format_err!("unexpected file code {}", file_code));
        }
        let version = le_i32(&bytes[28..32]);
        if version != VERSION {
            return Err(format_err!("unsupported shapefile version {}", version));
        }
        // Stored in 16-bit words.
        let file_len = i64::from(be_i32(&bytes[24..28])) * 2;
        let shape_type = le_i32(&bytes[32..36]);
        if shape_type_name(shape_type).is_none() {
            return Err(format_err!("unknown shape type {}", shape_type));
        }
        let bounding_box = [
            le_f64(&bytes[36..44]),
            le_f64(&bytes[44..52]),
            le_f64(&bytes[52..60]),
            le_f64(&bytes[60..68]),
        ];
        Ok(ShpHeader {
            file_len,
            shape_type,
            bounding_box,
        })
    }

    /// Read the header of the file at `path`.
    pub fn read(path: &Path) -> Result<ShpHeader> {
        let mut buf = [0u8; HEADER_LEN];
        let mut f = File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        f.read_exact(&mut buf)
            .with_context(|| format!("could not read header of {}", path.display()))?;
        ShpHeader::parse(&buf).with_context(|| format!("bad header in {}", path.display()))
    }

    /// Treat this as the header of an `.shx` file, and compute how many
    /// features the shapefile contains.
    pub fn shx_feature_count(&self) -> Result<i32> {
        let body = self.file_len - HEADER_LEN as i64;
        if body < 0 || body % SHX_RECORD_LEN != 0 {
            return Err(format_err!(
                "index length {} is not a whole number of records",
                self.file_len
            ));
        }
        Ok(cast::i32(body / SHX_RECORD_LEN)?)
    }
}

/// The name of a shape type code.
pub fn shape_type_name(code: i32) -> Option<&'static str> {
    Some(match code {
        0 => "Null Shape",
        1 => "Point",
        3 => "PolyLine",
        5 => "Polygon",
        8 => "MultiPoint",
        11 => "PointZ",
        13 => "PolyLineZ",
        15 => "PolygonZ",
        18 => "MultiPointZ",
        21 => "PointM",
        23 => "PolyLineM",
        25 => "PolygonM",
        28 => "MultiPointM",
        31 => "MultiPatch",
        _ => return None,
    })
}

fn be_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes(bytes.try_into().expect("slice should be 4 bytes"))
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(bytes.try_into().expect("slice should be 4 bytes"))
}

fn le_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(bytes.try_into().expect("slice should be 8 bytes"))
}

/// Build a header. Used to write test fixtures.
#[cfg(test)]
pub(crate) fn header_bytes(file_len: i64, shape_type: i32, bbox: [f64; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&FILE_CODE.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&((file_len / 2) as i32).to_be_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&shape_type.to_le_bytes());
    for v in &bbox {
        out.extend_from_slice(&v.to_le_bytes());
    }
    // Z and M ranges.
    out.extend_from_slice(&[0u8; 32]);
    out
}

#[test]
fn parses_polygon_header() {
    let bytes = header_bytes(100 + 3 * 8, 5, [-71.2, 42.2, -70.9, 42.4]);
    let header = ShpHeader::parse(&bytes).unwrap();
    assert_eq!(header.shape_type, 5);
    assert_eq!(shape_type_name(header.shape_type), Some("Polygon"));
    assert_eq!(header.bounding_box, [-71.2, 42.2, -70.9, 42.4]);
    assert_eq!(header.shx_feature_count().unwrap(), 3);
}

#[test]
fn rejects_bad_headers() {
    let mut bytes = header_bytes(100, 5, [0.0; 4]);
    bytes[3] = 0;
    assert!(ShpHeader::parse(&bytes).is_err());
    assert!(ShpHeader::parse(&bytes[..50]).is_err());
    let bytes = header_bytes(100, 7, [0.0; 4]);
    assert!(ShpHeader::parse(&bytes).is_err());
    let header = ShpHeader::parse(&header_bytes(105 + 1, 1, [0.0; 4])).unwrap();
    assert!(header.shx_feature_count().is_err());
}

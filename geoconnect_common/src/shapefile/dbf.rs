//! The attribute table (`.dbf`) which accompanies a shapefile.

use std::convert::TryInto;

use crate::prelude::*;

/// Size of the fixed part of the header.
const PREFIX_LEN: usize = 32;

/// Size of each field descriptor.
const DESCRIPTOR_LEN: usize = 32;

/// Ends the list of field descriptors.
const TERMINATOR: u8 = 0x0D;

/// A column in the attribute table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DbfColumn {
    /// Column name.
    pub name: String,
    /// dBase type code, such as `C` (character) or `N` (numeric).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Field width.
    pub size: u8,
    /// Digits after the decimal point.
    pub decimals: u8,
}

/// What we learned from a `.dbf` header.
#[derive(Clone, Debug, PartialEq)]
pub struct DbfHeader {
    /// Number of rows.
    pub record_count: u32,
    /// Column descriptions.
    pub columns: Vec<DbfColumn>,
}

impl DbfHeader {
    /// Parse the header from the beginning of a `.dbf` file.
    pub fn parse(bytes: &[u8]) -> Result<DbfHeader> {
        if bytes.len() < PREFIX_LEN {
            return Err(format_err!("dbf header is truncated"));
        }
        let record_count = u32::from_le_bytes(
            bytes[4..8].try_into().expect("slice should be 4 bytes"),
        );
        let header_len = usize::from(u16::from_le_bytes(
            bytes[8..10].try_into().expect("slice should be 2 bytes"),
        ));
        let end = header_len.min(bytes.len());

        let mut columns = vec![];
        let mut offset = PREFIX_LEN;
        loop {
            match bytes.get(offset) {
                Some(&TERMINATOR) => break,
                Some(_) if offset + DESCRIPTOR_LEN <= end => {}
                _ => return Err(format_err!("dbf field descriptors are not terminated")),
            }
            let desc = &bytes[offset..offset + DESCRIPTOR_LEN];
            let name_bytes = &desc[0..11];
            let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&name_bytes[..name_len])
                .trim()
                .to_owned();
            columns.push(DbfColumn {
                name,
                field_type: char::from(desc[11]).to_string(),
                size: desc[16],
                decimals: desc[17],
            });
            offset += DESCRIPTOR_LEN;
        }

        Ok(DbfHeader {
            record_count,
            columns,
        })
    }

    /// Read the header of the file at `path`.
    pub fn read(path: &Path) -> Result<DbfHeader> {
        let mut bytes = vec![];
        File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?
            // The header can't be longer than 64K, and we don't need the rows.
            .take(u64::from(u16::MAX))
            .read_to_end(&mut bytes)
            .with_context(|| format!("could not read {}", path.display()))?;
        DbfHeader::parse(&bytes).with_context(|| format!("bad header in {}", path.display()))
    }

    /// Just the column names.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Build a `.dbf` header. Used to write test fixtures.
#[cfg(test)]
pub(crate) fn header_bytes(record_count: u32, columns: &[(&str, char, u8, u8)]) -> Vec<u8> {
    let header_len = PREFIX_LEN + DESCRIPTOR_LEN * columns.len() + 1;
    let record_len = 1 + columns.iter().map(|c| usize::from(c.2)).sum::<usize>();
    let mut out = vec![0x03, 124, 3, 11];
    out.extend_from_slice(&record_count.to_le_bytes());
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(&(record_len as u16).to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);
    for (name, ty, size, decimals) in columns {
        let mut desc = [0u8; DESCRIPTOR_LEN];
        desc[..name.len()].copy_from_slice(name.as_bytes());
        desc[11] = *ty as u8;
        desc[16] = *size;
        desc[17] = *decimals;
        out.extend_from_slice(&desc);
    }
    out.push(TERMINATOR);
    out
}

#[test]
fn parses_field_descriptors() {
    let bytes = header_bytes(12, &[("TRACT", 'C', 11, 0), ("INCOME", 'N', 12, 2)]);
    let header = DbfHeader::parse(&bytes).unwrap();
    assert_eq!(header.record_count, 12);
    assert_eq!(header.column_names(), vec!["TRACT", "INCOME"]);
    assert_eq!(
        header.columns[1],
        DbfColumn {
            name: "INCOME".to_owned(),
            field_type: "N".to_owned(),
            size: 12,
            decimals: 2,
        }
    );
    assert_eq!(
        serde_json::to_value(&header.columns[0]).unwrap(),
        serde_json::json!({"name": "TRACT", "type": "C", "size": 11, "decimals": 0})
    );
}

#[test]
fn rejects_unterminated_headers() {
    let mut bytes = header_bytes(1, &[("A", 'C', 1, 0)]);
    bytes.pop();
    assert!(DbfHeader::parse(&bytes).is_err());
    assert!(DbfHeader::parse(&[0u8; 10]).is_err());
}

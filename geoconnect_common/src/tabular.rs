//! Reading the shape of delimited text files.

use crate::prelude::*;

/// Delimiters we know how to detect, most likely first.
const CANDIDATE_DELIMITERS: &[char] = &[',', '\t', ';', '|'];

/// What we learned about a delimited file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TabularSummary {
    /// The field delimiter.
    pub delimiter: String,
    /// Names from the header row. Blank names are dropped.
    pub column_names: Vec<String>,
    /// Data rows, not counting the header.
    pub num_rows: i32,
    /// Columns in the header row, including any without names.
    pub num_columns: i32,
}

/// Guess the delimiter from the first line of a file. Tab-separated files
/// often come with a `.tab` or `.tsv` extension, and we trust that first.
pub fn sniff_delimiter(first_line: &str, path: Option<&Path>) -> char {
    let ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if let Some("tab") | Some("tsv") = ext.as_deref() {
        return '\t';
    }
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| (first_line.matches(*d).count(), -(index_of(*d) as i64)))
        .filter(|d| first_line.contains(*d))
        .unwrap_or(',')
}

fn index_of(d: char) -> usize {
    CANDIDATE_DELIMITERS
        .iter()
        .position(|c| *c == d)
        .unwrap_or(CANDIDATE_DELIMITERS.len())
}

/// Read the header and count the rows of the file at `path`.
#[instrument(level = "debug")]
pub fn summarize(path: &Path) -> Result<TabularSummary> {
    let f = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    summarize_reader(f, Some(path)).with_context(|| format!("could not read {}", path.display()))
}

/// Like `summarize`, but for any reader.
pub fn summarize_reader<R: Read>(mut reader: R, path: Option<&Path>) -> Result<TabularSummary> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("file is not valid UTF-8 text")?;
    let text = text.trim_start_matches('\u{feff}');
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| format_err!("file is empty"))?;
    let delimiter = sniff_delimiter(first_line, path);

    // Quoted fields may contain newlines, so let the CSV reader find the
    // record boundaries.
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut records = rdr.records().filter(|record| match record {
        Ok(record) => record.iter().any(|field| !field.is_empty()),
        Err(_) => true,
    });

    let headings = records
        .next()
        .ok_or_else(|| format_err!("file is empty"))?
        .context("could not parse header row")?;
    let mut num_rows = 0i32;
    for record in records {
        record.context("could not parse row")?;
        num_rows += 1;
    }

    Ok(TabularSummary {
        delimiter: delimiter.to_string(),
        num_columns: cast::i32(headings.len())?,
        column_names: headings
            .iter()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_owned())
            .collect(),
        num_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c", None), ',');
        assert_eq!(sniff_delimiter("a\tb\tc", None), '\t');
        assert_eq!(sniff_delimiter("a;b;c", None), ';');
        assert_eq!(sniff_delimiter("single", None), ',');
        assert_eq!(sniff_delimiter("a,b", Some(Path::new("x.TAB"))), '\t');
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let data = "tract,\"Boston, MA\",\"say \"\"hi\"\"\"\n1,2,3\n";
        let summary = summarize_reader(data.as_bytes(), None).unwrap();
        assert_eq!(
            summary.column_names,
            vec!["tract", "Boston, MA", r#"say "hi""#]
        );
        assert_eq!(summary.num_columns, 3);
    }

    #[test]
    fn quoted_newlines_stay_in_one_row() {
        let data = "name,notes\n\"a\",\"line one\nline two\"\n\"b\",\"x\"\n";
        let summary = summarize_reader(data.as_bytes(), None).unwrap();
        assert_eq!(summary.column_names, vec!["name", "notes"]);
        assert_eq!(summary.num_rows, 2);
    }

    #[test]
    fn summarizes_csv() {
        let data = "\u{feff}tract,lat,lng,\n1,42.3,-71.0,\n\n2,42.4,-71.1,\n";
        let summary = summarize_reader(data.as_bytes(), None).unwrap();
        assert_eq!(summary.delimiter, ",");
        assert_eq!(summary.column_names, vec!["tract", "lat", "lng"]);
        assert_eq!(summary.num_columns, 4);
        assert_eq!(summary.num_rows, 2);
    }

    #[test]
    fn empty_and_binary_files_are_unreadable() {
        assert!(summarize_reader("".as_bytes(), None).is_err());
        assert!(summarize_reader(&[0xff, 0xfe, 0x00, b'\n'][..], None).is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(summarize(&dir.path().join("missing.tab")).is_err());
    }
}

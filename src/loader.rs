use crate::error::SheetError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Upload format detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Excel,
}

/// Decide how to parse an uploaded file from its extension.
pub fn detect_format(filepath: impl AsRef<Path>) -> Result<SheetFormat, SheetError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(SheetFormat::Csv),
        Some("xls") | Some("xlsx") => Ok(SheetFormat::Excel),
        Some(ext) => Err(SheetError::UnsupportedFormat(ext.to_string())),
        None => Err(SheetError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}

/// Read a delimited text file into a header row plus data records.
///
/// The first line is the column list; every following line is one record.
/// Quoted fields may contain commas and doubled quotes.
pub fn read_csv(
    filepath: impl AsRef<Path>,
) -> Result<(Vec<String>, Vec<Vec<String>>), SheetError> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(SheetError::Parse("file is empty".to_string())),
    };
    let columns = parse_csv_row(&header);

    let mut records = Vec::new();
    for line in lines {
        records.push(parse_csv_row(&line?));
    }

    Ok((columns, records))
}

// Split one CSV line into fields, honouring quotes and doubled quotes.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

/// Read an Excel workbook into a header row plus data records.
///
/// `sheet_name` picks the worksheet (first sheet when empty or absent);
/// `header_row` is the 0-based index of the header line, and everything
/// above it is skipped. Decode failures surface as `SheetError::Parse`.
#[cfg(feature = "web")]
pub fn read_excel(
    filepath: impl AsRef<Path>,
    sheet_name: Option<&str>,
    header_row: usize,
) -> Result<(Vec<String>, Vec<Vec<String>>), SheetError> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(filepath)
        .map_err(|e| SheetError::Parse(e.to_string()))?;

    let sheet = match sheet_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SheetError::Parse("workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| SheetError::Parse(e.to_string()))?;

    let mut rows = range.rows().skip(header_row);
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| SheetError::Parse("no header row in worksheet".to_string()))?
        .iter()
        .map(render_excel_cell)
        .collect();
    let records = rows
        .map(|row| row.iter().map(render_excel_cell).collect())
        .collect();

    Ok((columns, records))
}

#[cfg(feature = "web")]
fn render_excel_cell(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Keep "5", not "5.0", for whole quantities.
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Detect the file format and dispatch to the matching reader.
#[cfg_attr(not(feature = "web"), allow(unused_variables))]
pub fn read_sheet(
    filepath: impl AsRef<Path>,
    sheet_name: Option<&str>,
    header_row: usize,
) -> Result<(Vec<String>, Vec<Vec<String>>), SheetError> {
    let path = filepath.as_ref();
    match detect_format(path)? {
        SheetFormat::Csv => read_csv(path),
        #[cfg(feature = "web")]
        SheetFormat::Excel => read_excel(path, sheet_name, header_row),
        #[cfg(not(feature = "web"))]
        SheetFormat::Excel => Err(SheetError::Parse(
            "Excel support requires the 'web' feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(detect_format("data.csv").unwrap(), SheetFormat::Csv);
        assert_eq!(detect_format("data.CSV").unwrap(), SheetFormat::Csv);
        assert_eq!(detect_format("data.xlsx").unwrap(), SheetFormat::Excel);
        assert_eq!(detect_format("data.xls").unwrap(), SheetFormat::Excel);

        assert!(matches!(
            detect_format("data.pdf"),
            Err(SheetError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
        assert!(matches!(
            detect_format("noextension"),
            Err(SheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn csv_header_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "inventory.csv",
            "Site,Quantity,Asset Code\nA,2,\nB,1,X001\n",
        );

        let (columns, records) = read_csv(&path).unwrap();
        assert_eq!(columns, vec!["Site", "Quantity", "Asset Code"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["A", "2", ""]);
        assert_eq!(records[1], vec!["B", "1", "X001"]);
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "quoted.csv",
            "Site,Note\nA,\"desk, wooden\"\nB,\"say \"\"hi\"\"\"\n",
        );

        let (_, records) = read_csv(&path).unwrap();
        assert_eq!(records[0][1], "desk, wooden");
        assert_eq!(records[1][1], "say \"hi\"");
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "");
        assert!(matches!(read_csv(&path), Err(SheetError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            read_csv("no/such/file.csv"),
            Err(SheetError::Io(_))
        ));
    }

    #[test]
    fn read_sheet_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "inventory.csv", "Site\nA\n");
        let (columns, records) = read_sheet(&path, None, 0).unwrap();
        assert_eq!(columns, vec!["Site"]);
        assert_eq!(records, vec![vec!["A".to_string()]]);

        assert!(matches!(
            read_sheet("inventory.txt", None, 0),
            Err(SheetError::UnsupportedFormat(_))
        ));
    }
}

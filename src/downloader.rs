use crate::table::Table;

#[cfg(feature = "web")]
use crate::error::SheetError;

/// Rendered string records plus column order, the handoff to an exporter.
pub fn export_view(table: &Table) -> (Vec<Vec<String>>, Vec<String>) {
    (table.records(), table.columns().to_vec())
}

/// Serialize the table to CSV with a header row.
///
/// Fields containing commas, quotes or newlines are quoted, with inner
/// quotes doubled.
pub fn to_csv(table: &Table) -> String {
    let mut csv_content = String::new();

    for (i, column) in table.columns().iter().enumerate() {
        if i > 0 {
            csv_content.push(',');
        }
        push_csv_field(&mut csv_content, column);
    }
    csv_content.push('\n');

    for row in table.rows() {
        for (i, cell) in row.cells().iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            push_csv_field(&mut csv_content, &cell.render());
        }
        csv_content.push('\n');
    }

    csv_content
}

fn push_csv_field(out: &mut String, value: &str) {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace("\"", "\"\"");
        out.push_str(&format!("\"{}\"", escaped));
    } else {
        out.push_str(value);
    }
}

/// Serialize the table to an XLSX workbook in memory.
///
/// Column names go into the first worksheet row; numeric cells are
/// written as numbers so spreadsheet applications can keep summing them,
/// everything else as text.
#[cfg(feature = "web")]
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, SheetError> {
    use crate::table::CellValue;
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, column) in table.columns().iter().enumerate() {
        worksheet
            .write_string(0, c as u16, column)
            .map_err(|e| SheetError::Export(e.to_string()))?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        for (c, cell) in row.cells().iter().enumerate() {
            match cell {
                CellValue::Number(n) => {
                    worksheet
                        .write_number((r + 1) as u32, c as u16, *n)
                        .map_err(|e| SheetError::Export(e.to_string()))?;
                }
                CellValue::Text(s) => {
                    worksheet
                        .write_string((r + 1) as u32, c as u16, s)
                        .map_err(|e| SheetError::Export(e.to_string()))?;
                }
                CellValue::Empty => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);

    workbook
        .save_to_buffer()
        .map_err(|e| SheetError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::load(
            ["Site", "Quantity", "Note"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            &[],
        )
        .unwrap()
    }

    #[test]
    fn export_view_hands_over_rendered_records() {
        let sheet = table(&[&["A", "2.0", ""]]);
        let (records, columns) = export_view(&sheet);
        assert_eq!(columns, vec!["Site", "Quantity", "Note"]);
        assert_eq!(records, vec![vec!["A", "2", ""]]);
    }

    #[test]
    fn csv_includes_header_and_rows() {
        let sheet = table(&[&["A", "2", "plain"], &["B", "", ""]]);
        let csv = to_csv(&sheet);
        assert_eq!(csv, "Site,Quantity,Note\nA,2,plain\nB,,\n");
    }

    #[test]
    fn csv_escapes_special_characters() {
        let sheet = table(&[&["A", "1", "desk, wooden"], &["B", "2", "say \"hi\""]]);
        let csv = to_csv(&sheet);
        assert!(csv.contains("\"desk, wooden\""));
        assert!(csv.contains("\"say \"\"hi\"\"\""));
    }
}

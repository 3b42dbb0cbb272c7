use crate::error::SheetError;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A single cell, typed once at load time.
///
/// Absence is `Empty`, never a distinct null: rendering an empty cell
/// always yields the empty string. Numbers render without a trailing
/// `.0` when integral so that summing "2" and "3" displays as "5".
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Classify a raw input string into a typed cell.
    pub fn from_raw(raw: &str) -> CellValue {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Display/export rendering. Integral numbers drop the fraction.
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    /// Numeric coercion. `Empty` and `Text` yield `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One record of the table: a vector of cells positionally aligned with
/// the owning table's column list. Rows are only built through the
/// table so the column set cannot drift between pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) cells: Vec<CellValue>,
}

impl Row {
    pub(crate) fn from_cells(cells: Vec<CellValue>) -> Row {
        Row { cells }
    }

    pub fn cell(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.cells.len()))?;
        for cell in &self.cells {
            seq.serialize_element(cell)?;
        }
        seq.end()
    }
}

/// The in-memory record set shared by every pipeline stage.
///
/// An ordered set of named columns plus an ordered sequence of rows;
/// every row holds exactly one cell per declared column, and row order
/// is the display/export order. Mutation is in place: callers that need
/// an unmodified baseline must `snapshot()` explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column set.
    pub fn new(columns: Vec<String>) -> Table {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from parsed string records.
    ///
    /// Each raw record is typed cell by cell; records shorter than the
    /// column list are padded with empty cells, longer ones truncated.
    /// Fails with `SheetError::Schema` when any of `required_columns`
    /// is absent from `columns`.
    pub fn load(
        columns: Vec<String>,
        records: Vec<Vec<String>>,
        required_columns: &[String],
    ) -> Result<Table, SheetError> {
        for required in required_columns {
            if !columns.iter().any(|c| c == required) {
                return Err(SheetError::Schema(required.clone()));
            }
        }

        let width = columns.len();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut cells: Vec<CellValue> = record
                    .iter()
                    .take(width)
                    .map(|raw| CellValue::from_raw(raw))
                    .collect();
                cells.resize(width, CellValue::Empty);
                Row::from_cells(cells)
            })
            .collect();

        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Read a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Overwrite a cell in place.
    pub fn set_cell(
        &mut self,
        row: usize,
        column: &str,
        value: CellValue,
    ) -> Result<(), SheetError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| SheetError::ColumnNotFound(column.to_string()))?;
        if let Some(r) = self.rows.get_mut(row) {
            r.cells[col] = value;
        }
        Ok(())
    }

    pub(crate) fn set_cell_at(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(r) = self.rows.get_mut(row) {
            if col < r.cells.len() {
                r.cells[col] = value;
            }
        }
    }

    /// Append a row; the cell count must match the declared columns.
    pub fn append_row(&mut self, row: Row) -> Result<(), SheetError> {
        if row.cells.len() != self.columns.len() {
            return Err(SheetError::Schema(format!(
                "row has {} cells, expected {}",
                row.cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// A row of empty cells matching the current schema.
    pub fn blank_row(&self) -> Row {
        Row::from_cells(vec![CellValue::Empty; self.columns.len()])
    }

    /// Index of `name`, appending the column (and backfilling every
    /// existing row with an empty cell) when it is not yet declared.
    /// This is how the derived classification and lead columns come
    /// into existence on first write.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.cells.push(CellValue::Empty);
        }
        self.columns.len() - 1
    }

    /// Explicit deep copy. There is no copy-on-write anywhere in the
    /// pipeline; stages that must not disturb the current table work on
    /// a snapshot and swap it in on success.
    pub fn snapshot(&self) -> Table {
        self.clone()
    }

    /// A new table keeping only `selected` columns, in the given order.
    pub fn select_columns(&self, selected: &[String]) -> Result<Table, SheetError> {
        let mut indices = Vec::with_capacity(selected.len());
        for name in selected {
            let idx = self
                .column_index(name)
                .ok_or_else(|| SheetError::ColumnNotFound(name.clone()))?;
            indices.push(idx);
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                Row::from_cells(indices.iter().map(|&idx| row.cells[idx].clone()).collect())
            })
            .collect();

        Ok(Table {
            columns: selected.to_vec(),
            rows,
        })
    }

    /// Rendered string records in display order, for export handoff.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.cells.iter().map(|c| c.render()).collect())
            .collect()
    }
}

use crate::error::SheetError;
use crate::table::{CellValue, Row, Table};
use std::cmp::Ordering;

/// Per-cell sort key: numeric where the cell coerces, original text
/// otherwise. Mixed columns order numbers before text so re-sorting a
/// partially numeric column is deterministic.
#[derive(Debug, Clone)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(cell: &CellValue) -> SortKey {
        match cell.to_number() {
            Some(n) => SortKey::Number(n),
            None => SortKey::Text(cell.render()),
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

/// Stable-sort the table by the composite key and append one subtotal
/// row after every group of more than one row.
///
/// Groups are maximal runs of equal composite key in the sorted order.
/// The subtotal row sums `aggregate_column` (cells that do not coerce
/// count as zero), leaves `code_column` blank so it reads apart from
/// data rows, and copies the group's first row everywhere else. Ties
/// keep their pre-sort relative order so duplicate rows read
/// top-to-bottom in original upload order beneath their subtotal.
///
/// Returns a new table; the input is untouched, so a failed sort leaves
/// the caller's working table exactly as it was.
pub fn sort_and_subtotal(
    table: &Table,
    sort_keys: &[String],
    ascending: bool,
    aggregate_column: &str,
    code_column: &str,
) -> Result<Table, SheetError> {
    let mut key_indices = Vec::with_capacity(sort_keys.len());
    for key in sort_keys {
        let idx = table
            .column_index(key)
            .ok_or_else(|| SheetError::ColumnNotFound(key.clone()))?;
        key_indices.push(idx);
    }

    if key_indices.is_empty() {
        return Ok(table.snapshot());
    }

    let rows = table.rows();
    let composite: Vec<Vec<SortKey>> = rows
        .iter()
        .map(|row| {
            key_indices
                .iter()
                .map(|&idx| SortKey::of(row.cell(idx).unwrap_or(&CellValue::Empty)))
                .collect()
        })
        .collect();

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = composite[a].cmp(&composite[b]);
        if ascending { ord } else { ord.reverse() }
    });

    let aggregate_idx = table.column_index(aggregate_column);
    let code_idx = table.column_index(code_column);

    let mut out = Table::new(table.columns().to_vec());
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && composite[order[end]] == composite[order[start]] {
            end += 1;
        }

        for &idx in &order[start..end] {
            out.append_row(rows[idx].clone())?;
        }
        if end - start > 1 {
            let group: Vec<&Row> = order[start..end].iter().map(|&idx| &rows[idx]).collect();
            out.append_row(subtotal_row(&group, aggregate_idx, code_idx))?;
        }
        start = end;
    }

    Ok(out)
}

fn subtotal_row(group: &[&Row], aggregate_idx: Option<usize>, code_idx: Option<usize>) -> Row {
    let first = group[0];
    let cells = (0..first.len())
        .map(|col| {
            if Some(col) == aggregate_idx {
                let sum: f64 = group
                    .iter()
                    .map(|row| {
                        row.cell(col)
                            .and_then(|c| c.to_number())
                            .unwrap_or(0.0)
                    })
                    .sum();
                CellValue::Number(sum)
            } else if Some(col) == code_idx {
                CellValue::Empty
            } else {
                first.cell(col).cloned().unwrap_or(CellValue::Empty)
            }
        })
        .collect();
    Row::from_cells(cells)
}

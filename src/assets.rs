use crate::error::SheetError;
use crate::table::{CellValue, Table};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref SEED_REGEX: Regex = Regex::new(r"^(.*?)([0-9]+)$").unwrap();
}

/// A seed asset code split into its base prefix and numeric suffix.
///
/// "AB100" parses to base "AB", start 100, width 3; generated codes share
/// the base and continue the suffix at the same zero-padded width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCode {
    pub base: String,
    pub start: u64,
    pub width: usize,
}

impl SeedCode {
    /// Split a seed into base and trailing numeric suffix. A seed with no
    /// trailing digits (or a suffix too large to count from) is invalid.
    pub fn parse(seed: &str) -> Result<SeedCode, SheetError> {
        let trimmed = seed.trim();
        let caps = SEED_REGEX
            .captures(trimmed)
            .ok_or_else(|| SheetError::InvalidSeedCode(seed.to_string()))?;
        let digits = &caps[2];
        let start = digits
            .parse::<u64>()
            .map_err(|_| SheetError::InvalidSeedCode(seed.to_string()))?;
        Ok(SeedCode {
            base: caps[1].to_string(),
            start,
            width: digits.len(),
        })
    }

    /// The code `offset` places after the seed, zero-padded to the seed's
    /// suffix width.
    pub fn code(&self, offset: u64) -> String {
        format!("{}{:0width$}", self.base, self.start + offset, width = self.width)
    }
}

/// Fill blank asset codes and propagate the group lead marker.
///
/// Step 1 walks rows in current order and assigns consecutive codes from
/// the seed to every row whose code cell is empty; row order is never
/// changed and non-blank codes are left alone. Subtotal rows take part
/// like any other row.
///
/// Step 2 partitions rows into groups by equality on all `group_keys`
/// (order of first appearance). A group containing at least one code that
/// begins with the seed's base has that group's first such code written
/// into `lead_column` for every member row; other groups keep whatever
/// lead value they had. An empty `group_keys` selection performs the fill
/// step only.
///
/// The code and lead columns are created on first write. A malformed seed
/// or an unknown group key fails before any cell is touched.
pub fn assign_asset_codes(
    table: &mut Table,
    seed_code: &str,
    group_keys: &[String],
    code_column: &str,
    lead_column: &str,
) -> Result<(), SheetError> {
    let seed = SeedCode::parse(seed_code)?;

    let mut key_indices = Vec::with_capacity(group_keys.len());
    for key in group_keys {
        let idx = table
            .column_index(key)
            .ok_or_else(|| SheetError::ColumnNotFound(key.clone()))?;
        key_indices.push(idx);
    }

    let code_idx = table.ensure_column(code_column);

    let mut filled: u64 = 0;
    for row in 0..table.len() {
        let blank = table
            .row(row)
            .and_then(|r| r.cell(code_idx))
            .map(|cell| cell.is_empty())
            .unwrap_or(false);
        if blank {
            table.set_cell_at(row, code_idx, CellValue::Text(seed.code(filled)));
            filled += 1;
        }
    }

    if key_indices.is_empty() {
        return Ok(());
    }

    // Groups in order of first appearance, not sorted.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    for row in 0..table.len() {
        let key: Vec<String> = key_indices
            .iter()
            .map(|&idx| {
                table
                    .row(row)
                    .and_then(|r| r.cell(idx))
                    .map(|cell| cell.render())
                    .unwrap_or_default()
            })
            .collect();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    let lead_idx = table.ensure_column(lead_column);
    for members in &groups {
        let lead = members.iter().find_map(|&row| {
            table
                .row(row)
                .and_then(|r| r.cell(code_idx))
                .map(|cell| cell.render())
                .filter(|code| code.starts_with(&seed.base))
        });
        if let Some(lead) = lead {
            for &row in members {
                table.set_cell_at(row, lead_idx, CellValue::Text(lead.clone()));
            }
        }
    }

    Ok(())
}

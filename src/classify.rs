use crate::table::{CellValue, Table};
use serde::Serialize;

/// One queued classification intent: every row whose group column equals
/// `group` receives `classification` in the target column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingClassification {
    pub group: String,
    pub classification: String,
}

/// FIFO buffer of classification requests awaiting batch application.
///
/// Enqueueing with an empty group or value is a silent no-op, matching
/// the best-effort behaviour of the operator UI. Duplicate group entries
/// are all retained; on apply the later entry wins because it overwrites
/// the same rows.
#[derive(Debug, Default)]
pub struct PendingUpdateQueue {
    entries: Vec<PendingClassification>,
}

impl PendingUpdateQueue {
    pub fn new() -> PendingUpdateQueue {
        PendingUpdateQueue::default()
    }

    pub fn enqueue(&mut self, group: &str, classification: &str) {
        let group = group.trim();
        let classification = classification.trim();
        if group.is_empty() || classification.is_empty() {
            return;
        }
        self.entries.push(PendingClassification {
            group: group.to_string(),
            classification: classification.to_string(),
        });
    }

    /// Pending entries in insertion order, for echoing back to the UI.
    pub fn entries(&self) -> &[PendingClassification] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every pending entry in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<PendingClassification> {
        std::mem::take(&mut self.entries)
    }
}

/// Apply a drained batch of classification updates to the table.
///
/// For each update in order, every row whose `group_column` renders equal
/// to the update's group value has `target_column` set to the update's
/// classification. The target column is created (backfilled with empty
/// cells) on first write, so rows outside every group end up with an
/// empty value rather than a missing one. Re-applying the same batch to
/// its own output changes nothing.
pub fn apply_classifications(
    table: &mut Table,
    updates: &[PendingClassification],
    group_column: &str,
    target_column: &str,
) {
    if updates.is_empty() {
        return;
    }

    let target_idx = table.ensure_column(target_column);
    let group_idx = match table.column_index(group_column) {
        Some(idx) => idx,
        // A vanished group column matches no rows.
        None => return,
    };

    for update in updates {
        for row in 0..table.len() {
            let matches = table
                .row(row)
                .and_then(|r| r.cell(group_idx))
                .map(|cell| cell.render() == update.group)
                .unwrap_or(false);
            if matches {
                table.set_cell_at(
                    row,
                    target_idx,
                    CellValue::Text(update.classification.clone()),
                );
            }
        }
    }
}

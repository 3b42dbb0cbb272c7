use assetsheet::assets::assign_asset_codes;
use assetsheet::classify::{PendingUpdateQueue, apply_classifications};
use assetsheet::downloader::{export_view, to_csv};
use assetsheet::sorting::sort_and_subtotal;
use assetsheet::table::Table;

// Helper to build a table from string rows
fn make_table(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::load(
        columns.iter().map(|s| s.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
        &[],
    )
    .expect("table should load")
}

// Helper to check a rendered cell
fn assert_cell(table: &Table, row: usize, column: &str, expected: &str) {
    let actual = table
        .cell(row, column)
        .map(|c| c.render())
        .unwrap_or_default();
    assert_eq!(
        actual, expected,
        "row {} column {} should be {:?}",
        row, column, expected
    );
    println!("✓ Row {} {:?} = {:?} as expected", row, column, expected);
}

// Test the sort-and-subtotal scenario: two "A" rows get a subtotal with
// the summed quantity, the lone "B" row does not.
fn test_sort_with_subtotals() {
    println!("\n====== Testing sort_and_subtotal ======");
    let table = make_table(
        &["Site", "Quantity", "Asset Code"],
        &[&["A", "2", ""], &["A", "3", ""], &["B", "1", "X001"]],
    );

    let sorted = sort_and_subtotal(&table, &["Site".to_string()], true, "Quantity", "Asset Code")
        .expect("sort should succeed");

    assert_eq!(sorted.len(), 4);
    println!("✓ Output has 4 rows (3 data + 1 subtotal)");

    assert_cell(&sorted, 0, "Site", "A");
    assert_cell(&sorted, 1, "Site", "A");
    assert_cell(&sorted, 2, "Site", "A");
    assert_cell(&sorted, 2, "Quantity", "5");
    assert_cell(&sorted, 2, "Asset Code", "");
    assert_cell(&sorted, 3, "Site", "B");
    println!("✓ Subtotal row sums Quantity and leaves Asset Code blank");
}

// Test queued classification: FIFO order, silent no-op on blanks,
// last write wins, idempotent re-apply.
fn test_classification_batch() {
    println!("\n====== Testing classification queue + apply ======");
    let mut table = make_table(
        &["Site", "Quantity"],
        &[&["A", "2"], &["B", "3"], &["A", "4"]],
    );

    let mut queue = PendingUpdateQueue::new();
    queue.enqueue("", "ignored");
    queue.enqueue("A", "IT");
    queue.enqueue("B", "Lab");
    queue.enqueue("A", "Office");
    assert_eq!(queue.len(), 3);
    println!("✓ Blank enqueue ignored, 3 entries queued");

    let updates = queue.drain();
    assert!(queue.is_empty());
    println!("✓ Drain cleared the queue");

    apply_classifications(&mut table, &updates, "Site", "Group.1");
    assert_cell(&table, 0, "Group.1", "Office");
    assert_cell(&table, 1, "Group.1", "Lab");
    assert_cell(&table, 2, "Group.1", "Office");
    println!("✓ Later update for the same group wins");

    let once = table.snapshot();
    apply_classifications(&mut table, &updates, "Site", "Group.1");
    assert_eq!(table, once);
    println!("✓ Re-applying the same batch changes nothing");
}

// Test the asset code scenario: seed "X001" fills the two blank "A"
// rows; group "B" already holds "X001" and leads itself.
fn test_asset_codes() {
    println!("\n====== Testing assign_asset_codes ======");
    let mut table = make_table(
        &["Site", "Quantity", "Asset Code"],
        &[&["A", "2", ""], &["A", "3", ""], &["B", "1", "X001"]],
    );

    assign_asset_codes(
        &mut table,
        "X001",
        &["Site".to_string()],
        "Asset Code",
        "Group Lead?",
    )
    .expect("assignment should succeed");

    assert_cell(&table, 0, "Asset Code", "X001");
    assert_cell(&table, 1, "Asset Code", "X002");
    assert_cell(&table, 2, "Asset Code", "X001");
    println!("✓ Blank rows filled in row order with consecutive ordinals");

    assert_cell(&table, 0, "Group Lead?", "X001");
    assert_cell(&table, 1, "Group Lead?", "X001");
    assert_cell(&table, 2, "Group Lead?", "X001");
    println!("✓ Each group's first matching code propagated as its lead");
}

// Run the full pipeline end to end on one inventory.
fn test_full_pipeline() {
    println!("\n====== Testing the full pipeline ======");
    let table = make_table(
        &["Site", "Quantity", "Asset Code"],
        &[
            &["B", "1", "X001"],
            &["A", "2", ""],
            &["A", "3", ""],
            &["C", "x", ""],
        ],
    );

    let mut table =
        sort_and_subtotal(&table, &["Site".to_string()], true, "Quantity", "Asset Code")
            .expect("sort should succeed");
    assert_eq!(table.len(), 5);
    println!("✓ Sorted with one subtotal row");

    let mut queue = PendingUpdateQueue::new();
    queue.enqueue("A", "IT");
    let updates = queue.drain();
    apply_classifications(&mut table, &updates, "Site", "Group.1");
    assert_cell(&table, 0, "Group.1", "IT");
    println!("✓ Classification applied on the sorted table");

    // The subtotal row's blank code participates in the fill.
    assign_asset_codes(
        &mut table,
        "X001",
        &["Site".to_string()],
        "Asset Code",
        "Group Lead?",
    )
    .expect("assignment should succeed");
    assert_cell(&table, 2, "Asset Code", "X003");
    println!("✓ Subtotal row included in the sequence fill");

    let (records, columns) = export_view(&table);
    assert_eq!(columns.len(), 5);
    assert_eq!(records.len(), 5);
    let csv = to_csv(&table);
    assert!(csv.starts_with("Site,Quantity,Asset Code,Group.1,Group Lead?\n"));
    println!("✓ Export view and CSV include the derived columns");
}

fn main() {
    println!("Running asset inventory pipeline tests...");

    test_sort_with_subtotals();
    test_classification_batch();
    test_asset_codes();
    test_full_pipeline();

    println!("\nAll pipeline tests passed!");
}

/// Basic View Example
///
/// This example demonstrates:
/// - Loading rows into a ViewSession
/// - Sorting by several keys
/// - Filtering with case-insensitive substring queries
/// - Reading the result back out of the shared ViewBuffer

use gridview::{CellValue, Detached, FilterSpec, Row, RowStore, SortKey, SortSpec, ViewBuffer, ViewOutcome, ViewRequest, ViewSession};

fn print_view(rows: &RowStore, buffer: &ViewBuffer, outcome: &ViewOutcome) {
    let num_rows = match outcome {
        ViewOutcome::Done(n) => *n,
        other => {
            println!("   view did not complete: {:?}\n", other);
            return;
        }
    };
    for id in buffer.prefix(num_rows) {
        if let Some(row) = rows.rows().iter().find(|r| r.id == id) {
            let cells: Vec<String> = row.cells.iter().map(|c| c.to_string()).collect();
            println!("   {:>3}  {}", id, cells.join(" | "));
        }
    }
    println!();
}

fn main() {
    println!("=== GridView Basic Example ===\n");

    // 1. Build a small product grid: name, category, price
    println!("1. Loading products...");
    let items = vec![
        (1, "Laptop", "Electronics", 999.99),
        (2, "Mouse", "Electronics", 29.99),
        (3, "Desk", "Furniture", 299.99),
        (4, "Chair", "Furniture", 199.99),
        (5, "Monitor", "Electronics", 399.99),
        (6, "Lamp", "Furniture", 29.99),
    ];
    let rows = RowStore::new(
        items
            .into_iter()
            .map(|(id, name, category, price)| {
                Row::new(id, vec![CellValue::from(name), CellValue::from(category), CellValue::from(price)])
            })
            .collect(),
    )
    .unwrap();
    println!("   Loaded {} rows with {} columns\n", rows.len(), rows.width());

    let mut session = ViewSession::default();
    session.set_rows(rows.clone());
    let buffer = ViewBuffer::with_capacity(rows.len());

    // 2. Source order
    println!("2. No sort, no filter (source order):");
    let outcome = session.compute_view(&buffer, &ViewRequest::new(SortSpec::default(), FilterSpec::new(), 1), &mut Detached, &Detached);
    print_view(&rows, &buffer, &outcome);

    // 3. Category ascending, then price descending
    println!("3. Sorted by category, then price descending:");
    let sort = SortSpec::new(vec![SortKey::ascending(1), SortKey::descending(2)]);
    let outcome = session.compute_view(&buffer, &ViewRequest::new(sort.clone(), FilterSpec::new(), 2), &mut Detached, &Detached);
    print_view(&rows, &buffer, &outcome);

    // 4. Same sort, filtered; the sorted order is reused from the cache
    println!("4. Same sort, name contains \"m\":");
    let outcome = session.compute_view(&buffer, &ViewRequest::new(sort, FilterSpec::new().with(0, "M"), 3), &mut Detached, &Detached);
    print_view(&rows, &buffer, &outcome);
    println!("   Sorts performed: {}, cache hits: {}\n", session.stats().sorts, session.stats().cache_hits);

    // 5. Bad column references are refused before touching the buffer
    println!("5. Sorting by a column that does not exist:");
    let outcome = session.compute_view(
        &buffer,
        &ViewRequest::new(SortSpec::new(vec![SortKey::ascending(9)]), FilterSpec::new(), 4),
        &mut Detached,
        &Detached,
    );
    print_view(&rows, &buffer, &outcome);

    println!("=== Example Complete ===");
}

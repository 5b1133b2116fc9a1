/// Performance Example
///
/// This example demonstrates:
/// - Cost of a cold multi-key sort versus a cache hit
/// - Cost of filtering sorted and unsorted data
/// - How chunk size affects cancellation latency

use gridview::{CellValue, Detached, EngineConfig, FilterSpec, Row, RowStore, SortKey, SortSpec, ViewBuffer, ViewRequest, ViewSession};
use std::time::Instant;

fn main() {
    println!("=== GridView Performance Example ===\n");

    let n = 500_000u32;
    let rows = RowStore::new(
        (0..n)
            .map(|i| {
                let word = format!("word{}", i.wrapping_mul(2_654_435_761) % 10_007);
                Row::new(i, vec![CellValue::from(word), CellValue::from(((i * 31) % 977) as f64 / 7.0)])
            })
            .collect(),
    )
    .unwrap();
    let buffer = ViewBuffer::with_capacity(rows.len());
    let sort = SortSpec::new(vec![SortKey::ascending(0), SortKey::descending(1)]);

    for chunk_size in [5_000, 30_000, 120_000] {
        println!("chunk_size = {}", chunk_size);
        let config = EngineConfig {
            chunk_size,
            ..EngineConfig::default()
        };
        let mut session = ViewSession::new(config);
        session.set_rows(rows.clone());

        let start = Instant::now();
        let outcome = session.compute_view(&buffer, &ViewRequest::new(sort.clone(), FilterSpec::new(), 1), &mut Detached, &Detached);
        println!("   Cold sort of {} rows: {:?} ({:?})", n, start.elapsed(), outcome);

        let start = Instant::now();
        let outcome = session.compute_view(&buffer, &ViewRequest::new(sort.clone(), FilterSpec::new(), 2), &mut Detached, &Detached);
        println!("   Cached sort: {:?} ({:?})", start.elapsed(), outcome);

        let start = Instant::now();
        let outcome = session.compute_view(
            &buffer,
            &ViewRequest::new(sort.clone(), FilterSpec::new().with(0, "word12"), 3),
            &mut Detached,
            &Detached,
        );
        println!("   Cached sort + filter: {:?} ({:?})", start.elapsed(), outcome);

        let start = Instant::now();
        let outcome = session.compute_view(
            &buffer,
            &ViewRequest::new(SortSpec::default(), FilterSpec::new().with(0, "word12"), 4),
            &mut Detached,
            &Detached,
        );
        println!("   Unsorted filter: {:?} ({:?})\n", start.elapsed(), outcome);
    }

    println!("Key takeaways:");
    println!("- Sorting dominates a cold request; a cache hit only pays for filtering");
    println!("- Smaller chunks react to new requests sooner at a small throughput cost");

    println!("\n=== Example Complete ===");
}

/// Worker Example
///
/// This example demonstrates:
/// - Running a ViewSession on its own thread with ViewWorker
/// - Superseding an in-flight request with a newer one
/// - Early results for long filters over large datasets
/// - The JSON form of outbound events

use gridview::{CellValue, EngineConfig, FilterSpec, Row, RowStore, SortKey, SortSpec, ViewBuffer, ViewWorker};
use std::time::Duration;

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    println!("=== GridView Worker Example ===\n");

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let n = 250_000u32;
    println!("1. Generating {} rows...", n);
    let regions = ["north", "south", "east", "west", "central"];
    let rows = RowStore::new(
        (0..n)
            .map(|i| {
                let region = regions[(i as usize * 7) % regions.len()];
                let name = format!("customer-{:06}", (i * 7919) % n);
                Row::new(i, vec![CellValue::from(name), CellValue::from(region), CellValue::from(((i * 37) % 1000) as i64)])
            })
            .collect(),
    )
    .unwrap();

    let worker = ViewWorker::spawn(config).unwrap();
    let buffer = ViewBuffer::with_capacity(rows.len());
    worker.set_rows(rows).unwrap();

    // 2. Fire a slow request, then immediately replace it
    println!("2. Sorting by score, then changing our mind...");
    let filter = FilterSpec::new().with(1, "th");
    let first = worker
        .compute(&buffer, SortSpec::new(vec![SortKey::descending(2), SortKey::ascending(0)]), filter.clone())
        .unwrap();
    let second = worker.compute(&buffer, SortSpec::default(), filter).unwrap();
    println!("   Submitted generations {} and {}\n", first, second);

    // 3. Drain events until the newest request settles
    println!("3. Events:");
    loop {
        let event = match worker.events().recv_timeout(Duration::from_secs(60)) {
            Ok(event) => event,
            Err(e) => {
                eprintln!("   worker went quiet: {}", e);
                break;
            }
        };
        println!("   {}", event.to_json());
        if event.is_terminal() && event.generation() == Some(second) {
            break;
        }
    }

    println!("\n   First ids: {:?}\n", buffer.prefix(5));

    // 4. Scroll acknowledgements pass straight through
    println!("4. Scrolling...");
    worker.scroll(4200.0).unwrap();
    if let Ok(event) = worker.events().recv_timeout(Duration::from_secs(5)) {
        println!("   {}\n", event.to_json());
    }

    worker.shutdown();
    println!("=== Example Complete ===");
}

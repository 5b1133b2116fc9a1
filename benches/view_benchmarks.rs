use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridview::*;

fn make_rows(size: u32) -> RowStore {
    RowStore::new(
        (0..size)
            .map(|i| {
                let word = format!("item{}", i.wrapping_mul(2_654_435_761) % 9_973);
                Row::new(i, vec![CellValue::from(word), CellValue::from(((i * 31) % 1_000) as i64)])
            })
            .collect(),
    )
    .unwrap()
}

fn bench_stable_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("stable_sort");

    for size in [10_000u32, 100_000].iter() {
        let rows = make_rows(*size);
        let sort = SortSpec::new(vec![SortKey::ascending(0), SortKey::descending(1)]);
        let positions: Vec<usize> = (0..rows.len()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let compare = sort.comparator();
            b.iter(|| {
                let sorted = stable_sort(
                    black_box(&positions),
                    EngineConfig::default().min_run,
                    |&x, &y| compare(&rows.rows()[x], &rows.rows()[y]),
                    &mut NeverCancel,
                );
                black_box(sorted)
            });
        });
    }
    group.finish();
}

fn bench_filter_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_rows");

    for size in [10_000u32, 100_000].iter() {
        let rows = make_rows(*size);
        let buffer = ViewBuffer::with_capacity(rows.len());
        let filter = FilterSpec::new().with(0, "ITEM1");
        let config = EngineConfig::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let count = filter_rows(
                    OrderedRows::source(rows.rows()),
                    black_box(&filter),
                    &buffer,
                    &config,
                    &mut NeverCancel,
                    |_| {},
                );
                black_box(count)
            });
        });
    }
    group.finish();
}

fn bench_compute_view_cached(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_view_cached");

    for size in [10_000u32, 100_000].iter() {
        let rows = make_rows(*size);
        let buffer = ViewBuffer::with_capacity(rows.len());
        let mut session = ViewSession::default();
        session.set_rows(rows);
        let sort = SortSpec::new(vec![SortKey::descending(1)]);
        let mut generation = 0;
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                generation += 1;
                let request = ViewRequest::new(sort.clone(), FilterSpec::new().with(0, "item7"), generation);
                black_box(session.compute_view(&buffer, &request, &mut Detached, &Detached))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stable_sort, bench_filter_rows, bench_compute_view_cached);
criterion_main!(benches);

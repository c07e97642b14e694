//! Window and cursor benchmarks for turcursor
//!
//! These benchmarks measure the fill path (alloc_row + typed puts), typed
//! reads with coercion, and cursor paging over a windowed producer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use turcursor::cursor::{MemoryProducer, WindowedSource};
use turcursor::{OwnedValue, PositionedCursor, RowWindow};

fn filled_window(rows: usize) -> RowWindow {
    let window = RowWindow::new("bench", 4 * 1024 * 1024).unwrap();
    window.set_num_columns(3);
    for i in 0..rows {
        window.alloc_row();
        window.put_long(i as i64, i, 0).unwrap();
        window.put_string("benchmark row payload", i, 1).unwrap();
        window.put_double(i as f64 * 0.5, i, 2).unwrap();
    }
    window
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_fill");

    for rows in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let window = RowWindow::new("bench", 4 * 1024 * 1024).unwrap();
            window.set_num_columns(3);
            b.iter(|| {
                window.clear();
                for i in 0..rows {
                    if !window.alloc_row() {
                        break;
                    }
                    window.put_long(black_box(i as i64), i, 0).unwrap();
                    window.put_string(black_box("benchmark row payload"), i, 1).unwrap();
                    window.put_double(black_box(i as f64), i, 2).unwrap();
                }
                black_box(window.num_rows())
            });
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_read");
    let window = filled_window(1_000);

    group.bench_function("get_long", |b| {
        b.iter(|| black_box(window.get_long(black_box(500), 0).unwrap()));
    });

    group.bench_function("get_string", |b| {
        b.iter(|| black_box(window.get_string(black_box(500), 1).unwrap()));
    });

    group.bench_function("get_string_from_double", |b| {
        b.iter(|| black_box(window.get_string(black_box(500), 2).unwrap()));
    });

    group.finish();
}

fn bench_cursor_paging(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_paging");
    let rows: Vec<Vec<OwnedValue>> = (0..10_000)
        .map(|i| vec![OwnedValue::Int(i), OwnedValue::Text(format!("row {}", i))])
        .collect();

    for capacity in [16 * 1024usize, 256 * 1024] {
        group.bench_with_input(
            BenchmarkId::new("forward_scan", capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let producer = MemoryProducer::new(["id", "name"], rows.clone()).unwrap();
                    let source =
                        WindowedSource::new(producer, RowWindow::builder().capacity(capacity))
                            .unwrap();
                    let mut cursor = PositionedCursor::new(source);
                    let mut sum = 0i64;
                    while cursor.move_to_next() {
                        sum += cursor.get_long(0).unwrap();
                    }
                    black_box(sum)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_fill, bench_read, bench_cursor_paging);
criterion_main!(benches);

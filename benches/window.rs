//! Window benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mochi_zones::config::{BufferConfig, WindowConfig, Zone};
use mochi_zones::core::ScrollbackStore;
use mochi_zones::term::{FixedGeometry, RecordingSink};
use mochi_zones::Window;

fn window(buffer: BufferConfig) -> Window<RecordingSink> {
    let config = WindowConfig::new(Zone::new(10, 5, 60, 15))
        .with_buffer(buffer)
        .with_scrollback(4096);
    Window::new(config, RecordingSink::new(), FixedGeometry::new(80, 24)).unwrap()
}

fn bench_window_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");

    // Long lines wrapping at the zone edge
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("wrap", |b| {
        b.iter(|| {
            let mut w = window(BufferConfig::with_capacity(256));
            w.write(black_box(&text)).unwrap();
            w.flush().unwrap();
            black_box(w.cursor())
        })
    });

    group.finish();
}

fn bench_window_styled_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");

    // Enough lines to scroll the zone many times
    let input = "\x1b[32mok\x1b[0m line of build output\n".repeat(200);
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("styled_lines", |b| {
        b.iter(|| {
            let mut w = window(BufferConfig::with_capacity(1024));
            w.write(black_box(&input)).unwrap();
            w.flush().unwrap();
            black_box(w.view_top())
        })
    });

    group.finish();
}

fn bench_window_strict_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");

    let text = "0123456789".repeat(100);

    group.bench_function("strict_small_buffer", |b| {
        b.iter(|| {
            let mut w = window(BufferConfig::with_capacity(16).strict(true));
            w.write(black_box(&text)).unwrap();
            w.flush().unwrap();
            black_box(w.sink().write_count())
        })
    });

    group.finish();
}

fn bench_scrollback_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("scrollback");

    group.bench_function("eviction", |b| {
        b.iter(|| {
            let mut store = ScrollbackStore::new(60, 512);
            for i in 0..500 {
                store.record_command("\x1b[1m");
                store.record_text(&format!("entry {}", i), 60).unwrap();
                store.record_command("\x1b[22m");
                store.new_line(0);
            }
            black_box(store.evicted())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_window_wrap,
    bench_window_styled_lines,
    bench_window_strict_buffer,
    bench_scrollback_eviction,
);
criterion_main!(benches);

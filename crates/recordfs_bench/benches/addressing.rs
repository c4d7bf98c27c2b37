//! Path resolution and matching benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recordfs_core::{Key, KeyCodec, Store};
use recordfs_testkit::{note_kind, subwidget_kind, widget_kind, widget_one};
use uuid::Uuid;

/// Benchmark key to address resolution.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    let widgets = widget_kind();
    let widget_key = Key::new().with("id", widget_one());
    group.bench_function("top_level", |b| {
        let resolver = widgets.descriptor().resolver();
        b.iter(|| black_box(resolver.resolve(black_box(&widget_key)).unwrap()));
    });

    let subwidgets = subwidget_kind();
    let nested_key = Key::new().with("widgetId", widget_one()).with("id", Uuid::new_v4());
    group.bench_function("nested", |b| {
        let resolver = subwidgets.descriptor().resolver();
        b.iter(|| black_box(resolver.resolve(black_box(&nested_key)).unwrap()));
    });

    let notes = note_kind();
    group.bench_function("version_file", |b| {
        let resolver = notes.descriptor().resolver();
        b.iter(|| black_box(resolver.resolve_version(black_box(&nested_key), 42).unwrap()));
    });

    group.finish();
}

/// Benchmark matching of record paths and noise.
fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match");
    let kind = subwidget_kind();
    let matcher = kind.descriptor().matcher();

    let record = format!("/widgets/{}/subwidgets/{}.json", widget_one(), Uuid::new_v4());
    let noise = format!("/widgets/{}/subwidgets/.syncthing.{}.json.tmp", widget_one(), Uuid::new_v4());

    group.bench_function("record", |b| {
        b.iter(|| black_box(matcher.is_record(black_box(&record))));
    });
    group.bench_function("noise", |b| {
        b.iter(|| black_box(matcher.is_record(black_box(&noise))));
    });
    group.bench_function("decode_key", |b| {
        b.iter(|| black_box(KeyCodec::key_of_path(kind.descriptor(), black_box(&record))));
    });

    group.finish();
}

/// Benchmark classification against a growing number of kinds.
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    let store = Store::in_memory(Default::default());
    store.documents(&widget_kind()).unwrap();
    store.documents(&subwidget_kind()).unwrap();
    store.versioned(&note_kind()).unwrap();

    let paths: Vec<String> = (0..100)
        .map(|i| match i % 4 {
            0 => format!("/widgets/{}.json", Uuid::new_v4()),
            1 => format!("/widgets/{}/subwidgets/{}.json", widget_one(), Uuid::new_v4()),
            2 => format!("/widgets/{}/notes/{}/{i}.json", widget_one(), Uuid::new_v4()),
            _ => format!("/widgets/{}/.DS_Store", widget_one()),
        })
        .collect();

    group.throughput(Throughput::Elements(paths.len() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(paths.len()), &paths, |b, paths| {
        b.iter(|| {
            for path in paths {
                black_box(store.classify(black_box(path)));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_match, bench_classify);
criterion_main!(benches);

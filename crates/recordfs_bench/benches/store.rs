//! Store operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recordfs_core::Key;
use recordfs_testkit::{note_kind, subwidget_kind, widget_kind, widget_one, Note, Subwidget, TestStore, Widget};
use uuid::Uuid;

/// Benchmark single document writes.
fn bench_document_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_put");

    for (name, store) in [("memory", TestStore::memory()), ("file", TestStore::file())] {
        let widgets = store.documents(&widget_kind()).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let widget = Widget::new(Uuid::new_v4(), "bench");
                black_box(widgets.put_record(widget).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark document reads.
fn bench_document_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_get");

    let store = TestStore::file();
    let widgets = store.documents(&widget_kind()).unwrap();
    widgets.put_record(Widget::new(widget_one(), "bench")).unwrap();
    let key = Key::new().with("id", widget_one());

    group.bench_function("file", |b| {
        b.iter(|| black_box(widgets.get(black_box(&key)).unwrap()));
    });

    group.finish();
}

/// Benchmark appending to a document's embedded history.
fn bench_history_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_put");

    for depth in [0usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let store = TestStore::memory();
            let subwidgets = store.documents(&subwidget_kind()).unwrap();
            let id = Uuid::new_v4();
            for i in 0..depth {
                subwidgets
                    .put_record(Subwidget::new(widget_one(), id, format!("v{i}")))
                    .unwrap();
            }
            b.iter(|| {
                black_box(
                    subwidgets
                        .put_record(Subwidget::new(widget_one(), id, "next"))
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

/// Benchmark listing all records of a kind among unrelated files.
fn bench_list_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_all");

    for count in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let store = TestStore::file();
            let widgets = store.documents(&widget_kind()).unwrap();
            let notes = store.versioned(&note_kind()).unwrap();
            for _ in 0..count {
                let id = Uuid::new_v4();
                widgets.put_record(Widget::new(id, "bench")).unwrap();
                notes.put_record(Note::new(id, Uuid::new_v4(), "bench")).unwrap();
            }
            b.iter(|| black_box(widgets.list_all().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_document_put,
    bench_document_get,
    bench_history_put,
    bench_list_all
);
criterion_main!(benches);

// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `vellum_property` + `vellum_model`.

use std::sync::{Arc, Once};

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use vellum_model::{HasProps, ModelClass, RecordingSink, Theme, ThemedValues};
use vellum_property::{
    ColumnData, DataSpec, Float, Int, List, Owner, Property, Value, ValueMap,
};

fn glyph_class() -> Arc<ModelClass> {
    ModelClass::builder("BenchGlyph")
        .property("alpha", Property::new(Float).with_default(1.0).unwrap())
        .property("width", Property::new(Int).with_default(1).unwrap())
        .property("size", Property::new(DataSpec::number()).with_default(4.0).unwrap())
        .property("radius", Property::new(DataSpec::distance()))
        .property("tags", Property::new(List::new(Int)))
        .property("data", Property::new(ColumnData::default()))
        .build()
        .unwrap()
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("property/prepare");

    let float = Property::new(Float);
    group.bench_function("float", |b| {
        b.iter(|| {
            black_box(
                float
                    .prepare_value(Owner::Class("Bench"), "x", black_box(Value::Float(0.5)))
                    .unwrap(),
            )
        });
    });

    let spec = Property::new(DataSpec::number());
    group.bench_function("number_spec_field", |b| {
        b.iter(|| {
            black_box(
                spec.prepare_value(Owner::Class("Bench"), "size", black_box(Value::from("pressure")))
                    .unwrap(),
            )
        });
    });

    let list = Property::new(List::new(Int));
    for len in [16_usize, 256] {
        let value = Value::list((0..len).map(|i| i as i64));
        group.bench_with_input(BenchmarkId::new("int_list", len), &value, |b, value| {
            b.iter_batched(
                || value.clone(),
                |value| black_box(list.prepare_value(Owner::Class("Bench"), "tags", value).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_model(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: Value={} HasProps={}",
            size_of::<Value>(),
            size_of::<HasProps>(),
        );
    });

    let class = glyph_class();
    let mut group = c.benchmark_group("model/access");

    group.bench_function("get_default", |b| {
        let mut obj = HasProps::new(&class);
        b.iter(|| black_box(obj.get("alpha").unwrap()));
    });

    group.bench_function("get_explicit", |b| {
        let mut obj = HasProps::new(&class);
        obj.set("alpha", 0.5).unwrap();
        b.iter(|| black_box(obj.get("alpha").unwrap()));
    });

    group.bench_function("set_unchanged", |b| {
        let mut obj = HasProps::new(&class);
        obj.set("alpha", 0.5).unwrap();
        b.iter(|| obj.set("alpha", black_box(0.5)).unwrap());
    });

    group.bench_function("set_notified", |b| {
        let mut obj = HasProps::new(&class);
        obj.subscribe(Arc::new(|change: &vellum_model::PropertyChange| {
            black_box(change);
        }));
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            obj.set("width", if flip { 2 } else { 3 }).unwrap();
        });
    });

    group.bench_function("set_from_json", |b| {
        let mut obj = HasProps::new(&class);
        let json = json!({"value": 2.0, "units": "screen"});
        b.iter(|| obj.set_from_json("radius", black_box(&json), None, None).unwrap());
    });

    group.bench_function("to_serializable", |b| {
        let mut obj = HasProps::new(&class);
        obj.set("alpha", 0.5).unwrap();
        obj.set("size", "pressure").unwrap();
        obj.set("tags", Value::list([1, 2, 3])).unwrap();
        b.iter(|| black_box(obj.to_serializable().unwrap()));
    });

    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let class = glyph_class();
    let mut group = c.benchmark_group("model/containers");

    group.bench_function("list_push", |b| {
        b.iter_batched(
            || HasProps::new(&class),
            |mut obj| {
                {
                    let mut tags = obj.list_mut("tags").unwrap();
                    for i in 0..16 {
                        tags.push(i).unwrap();
                    }
                }
                obj
            },
            BatchSize::SmallInput,
        );
    });

    for rows in [8_usize, 128] {
        group.bench_with_input(BenchmarkId::new("stream_rollover", rows), &rows, |b, &rows| {
            let mut obj = HasProps::new(&class);
            obj.set(
                "data",
                Value::dict([("x", Value::list(Vec::<Value>::new()))]),
            )
            .unwrap();
            let batch: ValueMap = [("x".to_owned(), Value::array((0..rows).map(|i| i as f64)))]
                .into_iter()
                .collect();
            b.iter(|| {
                obj.column_data_mut("data")
                    .unwrap()
                    .stream(batch.clone(), Some(1024))
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_theme(c: &mut Criterion) {
    let class = glyph_class();
    let theme = Theme::builder()
        .set("BenchGlyph", "alpha", 0.25)
        .set("BenchGlyph", "width", 4)
        .build();
    let mut group = c.benchmark_group("model/theme");

    group.bench_function("apply_and_unapply", |b| {
        let mut obj = HasProps::new(&class);
        let sink = Arc::new(RecordingSink::new());
        obj.subscribe(sink.clone());
        b.iter(|| {
            sink.take();
            theme.apply_to(&mut obj).unwrap();
            obj.unapply_theme().unwrap();
        });
    });

    group.bench_function("reapply_same", |b| {
        let mut obj = HasProps::new(&class);
        let values: ThemedValues = theme.themed_values(&class);
        b.iter(|| obj.apply_theme(black_box(values.clone())).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_prepare, bench_model, bench_containers, bench_theme);
criterion_main!(benches);

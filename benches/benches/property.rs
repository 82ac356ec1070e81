// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property`.

use std::sync::Once;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_property::{
    Class, ErasedValue, Hubs, Object, PropertyBuilder, PropertyStore, StoreKey, listener,
    on_change,
};

fn bench_property(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: PropertyStore={} ErasedValue={} Object={}",
            size_of::<PropertyStore>(),
            size_of::<ErasedValue>(),
            size_of::<Object>(),
        );
    });

    let class = Class::new("Elem");
    let width = PropertyBuilder::new()
        .instance_of_type::<f64>()
        .default_value(0.0_f64)
        .build();
    class.define("width", &width).unwrap();
    let height = PropertyBuilder::new()
        .instance_of_type::<f64>()
        .build_reactive();
    class.define("height", &height).unwrap();

    let mut group = c.benchmark_group("property/read");

    group.bench_function("stored", |b| {
        let elem = class.instantiate();
        width.set(&elem, ErasedValue::new(100.0_f64)).unwrap();
        b.iter(|| black_box(width.get(&elem).unwrap().downcast::<f64>()));
    });

    group.bench_function("by_name", |b| {
        let elem = class.instantiate();
        width.set(&elem, ErasedValue::new(100.0_f64)).unwrap();
        b.iter(|| black_box(elem.get_as::<f64>("width").unwrap()));
    });

    group.bench_function("default_first_read", |b| {
        b.iter_batched(
            || class.instantiate(),
            |elem| black_box(width.get(&elem).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.finish();

    let mut group = c.benchmark_group("property/write");

    group.bench_function("validated", |b| {
        let elem = class.instantiate();
        b.iter(|| width.set(&elem, ErasedValue::new(black_box(1.0_f64))).unwrap());
    });

    group.bench_function("reactive/no_listener", |b| {
        let mut hubs = Hubs::new();
        let elem = class.instantiate();
        b.iter(|| {
            height
                .set(&mut hubs, &elem, ErasedValue::new(black_box(1.0_f64)))
                .unwrap();
        });
    });

    group.bench_function("reactive/one_listener", |b| {
        let mut hubs = Hubs::new();
        let elem = class.instantiate();
        let on_height = listener(|_, event| {
            black_box(event.target());
            Ok(())
        });
        on_change(&mut hubs, &elem, "height", &on_height).unwrap();
        b.iter(|| {
            height
                .set(&mut hubs, &elem, ErasedValue::new(black_box(1.0_f64)))
                .unwrap();
        });
    });

    group.finish();

    let mut group = c.benchmark_group("property/store");

    group.bench_function("set_remove/8", |b| {
        let keys: Vec<StoreKey> = (0..8).map(|i| StoreKey::plain(&format!("k{i}"))).collect();
        b.iter_batched(
            PropertyStore::new,
            |mut store| {
                for key in &keys {
                    store.set(key.clone(), ErasedValue::new(1_u32));
                }
                for key in &keys {
                    black_box(store.remove(key));
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);

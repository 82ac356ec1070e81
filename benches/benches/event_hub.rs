// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_event_hub` dispatch and bubbling.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use understory_event_hub::{Event, HubId, HubOwner, Hubs, Listener, Target, listener};

struct Node {
    hub: Cell<Option<HubId>>,
}

impl HubOwner for Node {
    fn hub_slot(&self) -> &Cell<Option<HubId>> {
        &self.hub
    }
}

fn node() -> Rc<Node> {
    Rc::new(Node {
        hub: Cell::new(None),
    })
}

fn counting() -> Listener {
    let hits = Cell::new(0_u64);
    listener(move |_, _| {
        hits.set(hits.get() + 1);
        Ok(())
    })
}

fn bench_trigger(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_hub/trigger");

    for listeners in [1_usize, 8, 64] {
        group.bench_function(BenchmarkId::new("exact", listeners), |b| {
            let mut hubs = Hubs::new();
            let owner = node();
            let hub = hubs.ensure(&owner);
            let held: Vec<Listener> = (0..listeners).map(|_| counting()).collect();
            for l in &held {
                hubs.listen(hub, ["value", "changed"], l).unwrap();
            }
            let target = Target::from(["value", "changed"]);
            b.iter(|| {
                let mut event = Event::new(hub, &target);
                hubs.trigger(&mut event).unwrap();
                black_box(event.is_stopped())
            });
        });
    }

    group.bench_function("miss", |b| {
        let mut hubs = Hubs::new();
        let owner = node();
        let hub = hubs.ensure(&owner);
        let held = counting();
        hubs.listen(hub, "other", &held).unwrap();
        b.iter(|| hubs.emit(black_box(hub), "value").unwrap());
    });

    group.bench_function("quiet", |b| {
        let mut hubs = Hubs::new();
        let owner = node();
        let hub = hubs.ensure(&owner);
        let held = counting();
        hubs.listen(hub, "value", &held).unwrap();
        b.iter(|| hubs.quiet(|hubs| hubs.emit(hub, "value").unwrap()));
    });

    group.finish();
}

fn bench_bubble(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_hub/bubble");

    for depth in [1_usize, 4, 16] {
        group.bench_function(BenchmarkId::new("chain", depth), |b| {
            // root <- n1 <- ... <- n{depth}; events start at the deepest node.
            let mut hubs = Hubs::new();
            let owners: Vec<_> = (0..=depth).map(|_| node()).collect();
            let ids: Vec<HubId> = owners.iter().map(|o| hubs.ensure(o)).collect();
            for pair in ids.windows(2) {
                hubs.connect(pair[0], pair[1], "child").unwrap();
            }
            let held = counting();
            hubs.listen(ids[0], Target::any(), &held).unwrap();
            let leaf = ids[depth];
            b.iter(|| hubs.emit(leaf, "value").unwrap());
        });
    }

    group.bench_function("connect_cycle_check/16", |b| {
        let mut hubs = Hubs::new();
        let owners: Vec<_> = (0..17).map(|_| node()).collect();
        let ids: Vec<HubId> = owners.iter().map(|o| hubs.ensure(o)).collect();
        for pair in ids.windows(2) {
            hubs.connect(pair[0], pair[1], "child").unwrap();
        }
        b.iter(|| black_box(hubs.connect(ids[16], ids[0], "back").is_err()));
    });

    group.finish();
}

criterion_group!(benches, bench_trigger, bench_bubble);
criterion_main!(benches);

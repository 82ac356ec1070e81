// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for `understory_event_hub` dispatch.
//!
//! These cover listening, bubbling through labelled edges, interceptor scopes
//! and their precedence, and the weak ownership rules of the arena.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use understory_event_hub::{
    ErasedValue, Event, HubError, HubId, HubOwner, Hubs, Listener, Target, interceptor, listener,
};

struct Obj {
    hub: Cell<Option<HubId>>,
}

impl HubOwner for Obj {
    fn hub_slot(&self) -> &Cell<Option<HubId>> {
        &self.hub
    }
}

fn obj() -> Rc<Obj> {
    Rc::new(Obj {
        hub: Cell::new(None),
    })
}

/// A listener that records the targets it saw.
fn recorder() -> (Rc<RefCell<Vec<Target>>>, Listener) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let l = listener(move |_, event| {
        sink.borrow_mut().push(event.target().clone());
        Ok(())
    });
    (seen, l)
}

#[derive(Debug)]
struct Boom;

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

#[test]
fn listener_fires_once_for_its_target_only() {
    let mut hubs = Hubs::new();
    let o = obj();
    let h = hubs.ensure(&o);
    let (seen, l) = recorder();
    hubs.listen(h, "x", &l).unwrap();

    hubs.emit(h, "x").unwrap();
    hubs.emit(h, "y").unwrap();
    hubs.emit(h, ["x", "changed"]).unwrap();
    assert_eq!(*seen.borrow(), [Target::from("x")]);
}

#[test]
fn bubbles_with_label_prefix() {
    let mut hubs = Hubs::new();
    let (a, b) = (obj(), obj());
    let (ha, hb) = (hubs.ensure(&a), hubs.ensure(&b));
    hubs.connect(ha, hb, "lbl").unwrap();
    let (seen, l) = recorder();
    hubs.listen(ha, ["lbl", "x"], &l).unwrap();

    hubs.emit(hb, "x").unwrap();
    assert_eq!(*seen.borrow(), [Target::from(["lbl", "x"])]);
}

#[test]
fn bubbles_across_several_levels_and_labels() {
    let mut hubs = Hubs::new();
    let (root, mid, leaf) = (obj(), obj(), obj());
    let (hr, hm, hl) = (hubs.ensure(&root), hubs.ensure(&mid), hubs.ensure(&leaf));
    hubs.connect(hr, hm, "mid").unwrap();
    hubs.connect(hm, hl, "left").unwrap();
    hubs.connect(hm, hl, "right").unwrap();
    let (seen, l) = recorder();
    hubs.listen(hr, Target::any(), &l).unwrap();

    hubs.emit(hl, "x").unwrap();
    assert_eq!(
        *seen.borrow(),
        [
            Target::from(["mid", "left", "x"]),
            Target::from(["mid", "right", "x"]),
        ]
    );
}

#[test]
fn stop_in_upstream_halts_sibling_edges() {
    let mut hubs = Hubs::new();
    let (first, second, leaf) = (obj(), obj(), obj());
    let (h1, h2, hl) = (hubs.ensure(&first), hubs.ensure(&second), hubs.ensure(&leaf));
    hubs.connect(h1, hl, "a").unwrap();
    hubs.connect(h2, hl, "b").unwrap();
    hubs.listen_strong(
        h1,
        ["a", "x"],
        listener(|_, event| {
            event.stop();
            Ok(())
        }),
    )
    .unwrap();
    let (seen, l) = recorder();
    hubs.listen(h2, ["b", "x"], &l).unwrap();

    let mut event = Event::new(hl, "x");
    hubs.trigger(&mut event).unwrap();
    assert!(event.is_stopped(), "stop must be copied back to the original event");
    assert!(seen.borrow().is_empty());
}

#[test]
fn cycle_rejection_keeps_original_edge() {
    let mut hubs = Hubs::new();
    let (a, b) = (obj(), obj());
    let (ha, hb) = (hubs.ensure(&a), hubs.ensure(&b));
    hubs.connect(ha, hb, "b").unwrap();
    let err = hubs.connect(hb, ha, "a").unwrap_err();
    assert!(matches!(err, HubError::Cycle { .. }));
    assert!(hubs.has_edge(ha, hb, "b"));
    assert!(!hubs.has_edge(hb, ha, "a"));
    assert!(hubs.upstream_edges(ha).is_empty());
}

#[test]
fn explicit_dispatcher_outranks_quiet() {
    let mut hubs = Hubs::new();
    let o = obj();
    let h = hubs.ensure(&o);
    let (seen, l) = recorder();
    hubs.listen(h, "x", &l).unwrap();

    // A dispatcher that swallows calls.
    let swallow = interceptor(|_, _, _| Ok(()));
    hubs.trigger(&mut Event::new(h, "x").with_dispatcher(swallow))
        .unwrap();
    assert!(seen.borrow().is_empty());

    let direct = interceptor(|hubs, event, listener| listener(hubs, event));
    hubs.quiet(|hubs| hubs.trigger(&mut Event::new(h, "x").with_dispatcher(direct)))
        .unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn hub_quiet_inside_global_queue() {
    let mut hubs = Hubs::new();
    let (a, b) = (obj(), obj());
    let (ha, hb) = (hubs.ensure(&a), hubs.ensure(&b));
    let (seen, l) = recorder();
    for h in [ha, hb] {
        hubs.listen(h, "x", &l).unwrap();
    }

    let (result, queued) = hubs.queue(|hubs| {
        hubs.quiet_hub(hb, |hubs| -> Result<(), HubError> {
            hubs.emit(ha, "x")?;
            hubs.emit(hb, "x")?;
            hubs.emit(ha, "x")
        })
    });
    result.unwrap().unwrap();
    assert_eq!(queued.len(), 2);
    assert!(queued.iter().all(|q| q.event.hub() == ha));
    assert!(seen.borrow().is_empty());

    for q in queued {
        q.replay(&mut hubs).unwrap();
    }
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn hub_quiet_leaves_other_hubs_alone() {
    let mut hubs = Hubs::new();
    let (a, b) = (obj(), obj());
    let (ha, hb) = (hubs.ensure(&a), hubs.ensure(&b));
    let (seen_a, la) = recorder();
    let (seen_b, lb) = recorder();
    hubs.listen(ha, "x", &la).unwrap();
    hubs.listen(hb, "x", &lb).unwrap();

    hubs.quiet_hub(ha, |hubs| {
        hubs.emit(ha, "x").unwrap();
        hubs.emit(hb, "x").unwrap();
    })
    .unwrap();
    assert!(seen_a.borrow().is_empty());
    assert_eq!(seen_b.borrow().len(), 1);
}

#[test]
fn unique_counts_distinct_event_listener_pairs() {
    let mut hubs = Hubs::new();
    let (a, b) = (obj(), obj());
    let (ha, hb) = (hubs.ensure(&a), hubs.ensure(&b));
    let (seen, l) = recorder();
    hubs.listen(ha, "x", &l).unwrap();
    hubs.listen(hb, "x", &l).unwrap();

    hubs.unique(|hubs| -> Result<(), HubError> {
        for _ in 0..4 {
            hubs.emit(ha, "x")?;
            hubs.emit(hb, "x")?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(seen.borrow().len(), 2, "one delivery per (hub, target, listener)");
}

#[test]
fn unique_replay_goes_through_outer_scopes() {
    let mut hubs = Hubs::new();
    let o = obj();
    let h = hubs.ensure(&o);
    let (seen, l) = recorder();
    hubs.listen(h, "x", &l).unwrap();

    let (result, queued) = hubs.queue(|hubs| {
        hubs.unique(|hubs| -> Result<(), HubError> {
            hubs.emit(h, "x")?;
            hubs.emit(h, "x")
        })
    });
    result.unwrap();
    assert_eq!(queued.len(), 1);
    assert!(seen.borrow().is_empty());
}

#[test]
fn global_listeners_run_after_local_and_before_bubbling() {
    let mut hubs = Hubs::new();
    let (up, down) = (obj(), obj());
    let (hu, hd) = (hubs.ensure(&up), hubs.ensure(&down));
    hubs.connect(hu, hd, "down").unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    let tag = |name: &'static str| {
        let order = Rc::clone(&order);
        listener(move |_, event| {
            order.borrow_mut().push((name, event.target().clone()));
            Ok(())
        })
    };
    let local = tag("local");
    let upstream = tag("upstream");
    hubs.listen(hd, "x", &local).unwrap();
    hubs.listen(hu, ["down", "x"], &upstream).unwrap();
    let global = tag("global");
    hubs.add_global_listener(Rc::clone(&global), None);

    hubs.emit(hd, "x").unwrap();
    assert_eq!(
        *order.borrow(),
        [
            ("local", Target::from("x")),
            ("global", Target::from("x")),
            ("upstream", Target::from(["down", "x"])),
            ("global", Target::from(["down", "x"])),
        ]
    );

    assert!(hubs.remove_global_listener(&global, None));
    assert!(!hubs.remove_global_listener(&global, None));
}

#[test]
fn listener_failure_aborts_dispatch_and_bubbling() {
    let mut hubs = Hubs::new();
    let (up, down) = (obj(), obj());
    let (hu, hd) = (hubs.ensure(&up), hubs.ensure(&down));
    hubs.connect(hu, hd, "down").unwrap();
    hubs.listen_strong(hd, "x", listener(|_, _| Err(HubError::listener(Boom))))
        .unwrap();
    let (seen, l) = recorder();
    hubs.listen(hd, Target::any(), &l).unwrap();
    hubs.listen(hu, Target::any(), &l).unwrap();

    let err = hubs.emit(hd, "x").unwrap_err();
    assert_eq!(err.to_string(), "listener failed: boom");
    assert!(seen.borrow().is_empty());
}

#[test]
fn listeners_can_trigger_reentrantly() {
    let mut hubs = Hubs::new();
    let o = obj();
    let h = hubs.ensure(&o);
    let (seen, l) = recorder();
    hubs.listen(h, "second", &l).unwrap();
    hubs.listen_strong(h, "first", listener(move |hubs, _| hubs.emit(h, "second")))
        .unwrap();

    hubs.emit(h, "first").unwrap();
    assert_eq!(*seen.borrow(), [Target::from("second")]);
}

#[test]
fn dropped_weak_listener_is_skipped() {
    let mut hubs = Hubs::new();
    let o = obj();
    let h = hubs.ensure(&o);
    let (seen, l) = recorder();
    hubs.listen(h, "x", &l).unwrap();
    drop(l);
    hubs.emit(h, "x").unwrap();
    assert!(seen.borrow().is_empty());
}

#[test]
fn dropped_owner_stops_bubbling() {
    let mut hubs = Hubs::new();
    let (up, down) = (obj(), obj());
    let (hu, hd) = (hubs.ensure(&up), hubs.ensure(&down));
    hubs.connect(hu, hd, "down").unwrap();
    let (seen, l) = recorder();
    hubs.add_global_listener(l, None);

    drop(up);
    hubs.emit(hd, "x").unwrap();
    assert_eq!(*seen.borrow(), [Target::from("x")]);
    assert!(!hubs.is_connected(hu, hd));
    assert_eq!(hubs.collect_garbage(), 1);
    assert_eq!(hubs.len(), 1);
}

#[test]
fn metadata_travels_with_bubbled_events() {
    let mut hubs = Hubs::new();
    let (up, down) = (obj(), obj());
    let (hu, hd) = (hubs.ensure(&up), hubs.ensure(&down));
    hubs.connect(hu, hd, "down").unwrap();
    let got = Rc::new(Cell::new(0_i64));
    let sink = Rc::clone(&got);
    let l = listener(move |_, event| {
        sink.set(*event.meta::<i64>("new").unwrap());
        Ok(())
    });
    hubs.listen(hu, ["down", "x"], &l).unwrap();

    hubs.trigger(&mut Event::new(hd, "x").with_meta("new", ErasedValue::new(42_i64)))
        .unwrap();
    assert_eq!(got.get(), 42);
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener and interceptor callables, and the tables that hold them.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::HubError;
use crate::event::Event;
use crate::hubs::Hubs;
use crate::target::Target;

/// A callable notified of events.
///
/// Listeners receive the dispatch context so they can trigger further events
/// or write reactive properties. A failure aborts the rest of the dispatch and
/// reaches the caller of [`Hubs::trigger`].
pub type Listener = Rc<dyn Fn(&mut Hubs, &mut Event) -> Result<(), HubError>>;

/// A function substituted for direct listener invocation.
///
/// Interceptors decide whether and how `listener` sees `event`: they may call
/// it, record it for later, or stop the event.
pub type Interceptor = Rc<dyn Fn(&mut Hubs, &mut Event, &Listener) -> Result<(), HubError>>;

type WeakListener = Weak<dyn Fn(&mut Hubs, &mut Event) -> Result<(), HubError>>;

/// Wraps a closure as a [`Listener`].
///
/// ```rust
/// use understory_event_hub::listener;
///
/// let noop = listener(|_hubs, _event| Ok(()));
/// # let _ = noop;
/// ```
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&mut Hubs, &mut Event) -> Result<(), HubError> + 'static,
{
    Rc::new(f)
}

/// Wraps a closure as an [`Interceptor`].
pub fn interceptor<F>(f: F) -> Interceptor
where
    F: Fn(&mut Hubs, &mut Event, &Listener) -> Result<(), HubError> + 'static,
{
    Rc::new(f)
}

/// How a hub holds on to a registered listener.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strength {
    /// The hub holds a weak reference; once every other `Rc` to the listener
    /// is dropped it is skipped and pruned.
    #[default]
    Weak,
    /// The hub keeps the listener alive.
    Strong,
}

/// Address used for listener identity, ignoring vtable metadata.
pub(crate) fn listener_addr(listener: &Listener) -> usize {
    Rc::as_ptr(listener).cast::<()>() as usize
}

enum Entry {
    Strong(Listener),
    Weak(WeakListener),
}

impl Entry {
    fn upgrade(&self) -> Option<Listener> {
        match self {
            Self::Strong(listener) => Some(Rc::clone(listener)),
            Self::Weak(weak) => weak.upgrade(),
        }
    }

    fn addr(&self) -> usize {
        match self {
            Self::Strong(listener) => listener_addr(listener),
            Self::Weak(weak) => weak.as_ptr().cast::<()>() as usize,
        }
    }

    fn is_dead(&self) -> bool {
        matches!(self, Self::Weak(weak) if weak.strong_count() == 0)
    }
}

/// Snapshot of the listeners due for one dispatch phase.
pub(crate) type Batch = SmallVec<[Listener; 8]>;

/// Target → ordered listener entries.
#[derive(Default)]
pub(crate) struct ListenerTable {
    by_target: HashMap<Target, Vec<Entry>>,
}

impl ListenerTable {
    pub(crate) fn add(&mut self, target: Target, listener: &Listener, strength: Strength) {
        let entry = match strength {
            Strength::Strong => Entry::Strong(Rc::clone(listener)),
            Strength::Weak => Entry::Weak(Rc::downgrade(listener)),
        };
        self.by_target.entry(target).or_default().push(entry);
    }

    /// Removes `listener` under `target`, or every listener when `None`.
    pub(crate) fn remove(&mut self, target: &Target, listener: Option<&Listener>) -> bool {
        let Some(entries) = self.by_target.get_mut(target) else {
            return false;
        };
        let before = entries.len();
        match listener {
            Some(listener) => {
                let addr = listener_addr(listener);
                entries.retain(|entry| entry.addr() != addr);
            }
            None => entries.clear(),
        }
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.by_target.remove(target);
        }
        removed
    }

    /// Collects the live listeners under `target`, pruning dead weak entries.
    pub(crate) fn snapshot(&mut self, target: &Target) -> Batch {
        let Some(entries) = self.by_target.get_mut(target) else {
            return Batch::new();
        };
        let batch: Batch = entries.iter().filter_map(Entry::upgrade).collect();
        if batch.len() != entries.len() {
            entries.retain(|entry| !entry.is_dead());
            tracing::trace!(%target, live = batch.len(), "pruned dead listeners");
            if entries.is_empty() {
                self.by_target.remove(target);
            }
        }
        batch
    }

    pub(crate) fn contains(&self, target: &Target, listener: &Listener) -> bool {
        let addr = listener_addr(listener);
        self.by_target
            .get(target)
            .is_some_and(|entries| entries.iter().any(|entry| entry.addr() == addr))
    }

    pub(crate) fn len(&self, target: &Target) -> usize {
        self.by_target.get(target).map_or(0, Vec::len)
    }
}

impl fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.by_target.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The hub arena and event dispatch.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::Cell;
use core::fmt;

use smallvec::SmallVec;

use crate::error::HubError;
use crate::event::Event;
use crate::listener::{Interceptor, Listener, ListenerTable, Strength};
use crate::target::Target;

/// Number of slots below which the arena never sweeps for dead owners.
const MIN_SWEEP: usize = 32;

/// Generation-checked handle to an event hub.
///
/// Handles stay valid while the hub's owner is alive. Once the owner is
/// dropped the handle no longer resolves: listeners, edges and interceptors
/// keyed by it are ignored, and its slot may be reused with a new generation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HubId(u32, u32);

impl HubId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    #[inline]
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// An object that can own an event hub.
///
/// The owner stores its hub handle; the hub only keeps a weak reference back,
/// so it never extends the owner's lifetime.
pub trait HubOwner: Any {
    /// Storage for this owner's hub handle.
    fn hub_slot(&self) -> &Cell<Option<HubId>>;
}

/// One labelled upstream connection of a hub.
#[derive(Debug)]
pub(crate) struct Upstream {
    pub(crate) hub: HubId,
    pub(crate) labels: SmallVec<[Target; 1]>,
}

pub(crate) struct Hub {
    owner: Weak<dyn Any>,
    pub(crate) listeners: ListenerTable,
    pub(crate) upstream: Vec<Upstream>,
    pub(crate) interceptors: Vec<Interceptor>,
}

impl Hub {
    fn new(owner: Weak<dyn Any>) -> Self {
        Self {
            owner,
            listeners: ListenerTable::default(),
            upstream: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("alive", &self.is_alive())
            .field("listeners", &self.listeners)
            .field("upstream", &self.upstream)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    hub: Option<Hub>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Source {
    Local,
    Global,
}

/// Arena of event hubs and the shared dispatch context.
///
/// `Hubs` owns every hub, the context-wide listener registry and the
/// context-wide interceptor stack. It is threaded by `&mut` through every
/// operation that can emit events; listeners and interceptors receive it back,
/// so dispatch is re-entrant through ordinary recursion.
///
/// # Dispatch order
///
/// [`trigger`](Self::trigger) runs, stopping as soon as the event is stopped:
///
/// 1. local listeners under the exact target,
/// 2. local wildcard listeners,
/// 3. global listeners under the exact target,
/// 4. global wildcard listeners,
/// 5. bubbling: for every upstream edge in insertion order, the event is
///    re-triggered on the upstream hub with the edge label prepended.
///
/// Each listener call goes through the first of: the event's own dispatcher,
/// the top interceptor of the event's hub, the top context-wide interceptor.
/// With none of those, the listener is called directly.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_event_hub::{HubId, HubOwner, Hubs, Target, listener};
///
/// struct Node {
///     hub: Cell<Option<HubId>>,
/// }
///
/// impl HubOwner for Node {
///     fn hub_slot(&self) -> &Cell<Option<HubId>> {
///         &self.hub
///     }
/// }
///
/// let mut hubs = Hubs::new();
/// let parent = Rc::new(Node { hub: Cell::new(None) });
/// let child = Rc::new(Node { hub: Cell::new(None) });
/// let p = hubs.ensure(&parent);
/// let c = hubs.ensure(&child);
/// hubs.connect(p, c, "child").unwrap();
///
/// let seen = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&seen);
/// let on_child_x = listener(move |_, event| {
///     assert_eq!(event.target(), &Target::from(["child", "x"]));
///     counter.set(counter.get() + 1);
///     Ok(())
/// });
/// hubs.listen(p, ["child", "x"], &on_child_x).unwrap();
///
/// hubs.emit(c, "x").unwrap();
/// assert_eq!(seen.get(), 1);
/// ```
pub struct Hubs {
    slots: Vec<Slot>,
    free: Vec<u32>,
    sweep_at: usize,
    pub(crate) global_listeners: ListenerTable,
    pub(crate) global_interceptors: Vec<Interceptor>,
}

impl Default for Hubs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hubs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hubs")
            .field("live", &self.len())
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .field("global_listeners", &self.global_listeners)
            .field("global_interceptors", &self.global_interceptors.len())
            .finish_non_exhaustive()
    }
}

impl Hubs {
    /// Creates an empty dispatch context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            sweep_at: MIN_SWEEP,
            global_listeners: ListenerTable::default(),
            global_interceptors: Vec::new(),
        }
    }

    /// Returns the hub of `owner`, creating it on first use.
    pub fn ensure<T: HubOwner>(&mut self, owner: &Rc<T>) -> HubId {
        self.ensure_with(owner, |_, _| {})
    }

    /// Returns the hub of `owner`, creating it on first use.
    ///
    /// `init` runs only when a new hub is created, before this returns; it is
    /// the place to bind per-type listeners.
    pub fn ensure_with<T, F>(&mut self, owner: &Rc<T>, init: F) -> HubId
    where
        T: HubOwner,
        F: FnOnce(&mut Self, HubId),
    {
        if let Some(id) = owner.hub_slot().get()
            && self.is_owned_by(id, Rc::as_ptr(owner))
        {
            return id;
        }
        let weak: Weak<T> = Rc::downgrade(owner);
        let id = self.allocate(Hub::new(weak));
        owner.hub_slot().set(Some(id));
        tracing::trace!(hub = ?id, "created event hub");
        init(self, id);
        id
    }

    /// Returns the hub of `owner` without creating one.
    ///
    /// Fails with [`HubError::NotInitialized`] if the owner has no live hub
    /// in this context. A handle issued to `owner` by another `Hubs` never
    /// resolves here.
    pub fn hub_of<T: HubOwner>(&self, owner: &T) -> Result<HubId, HubError> {
        owner
            .hub_slot()
            .get()
            .filter(|id| self.is_owned_by(*id, owner))
            .ok_or(HubError::NotInitialized)
    }

    /// Returns `true` if `id` is a live hub of this context owned by `owner`.
    fn is_owned_by<T>(&self, id: HubId, owner: *const T) -> bool {
        self.hub(id)
            .is_some_and(|hub| core::ptr::addr_eq(hub.owner.as_ptr(), owner))
    }

    /// Returns `true` if `id` resolves to a hub whose owner is alive.
    #[must_use]
    pub fn is_alive(&self, id: HubId) -> bool {
        self.hub(id).is_some()
    }

    /// Returns the owner of a live hub.
    #[must_use]
    pub fn owner(&self, id: HubId) -> Option<Rc<dyn Any>> {
        self.hub(id)?.owner.upgrade()
    }

    /// Number of live hubs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.hub.as_ref().is_some_and(Hub::is_alive))
            .count()
    }

    /// Returns `true` when no hub is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frees the slots of hubs whose owners have been dropped.
    ///
    /// Returns the number of reclaimed hubs. This also happens automatically,
    /// from time to time, before the arena grows.
    pub fn collect_garbage(&mut self) -> usize {
        let mut reclaimed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.hub.as_ref().is_some_and(|hub| !hub.is_alive()) {
                slot.hub = None;
                slot.generation = slot.generation.wrapping_add(1);
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot count is bounded by u32 at allocation"
                )]
                self.free.push(idx as u32);
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            tracing::debug!(reclaimed, "reclaimed event hubs");
        }
        reclaimed
    }

    fn allocate(&mut self, hub: Hub) -> HubId {
        if self.free.is_empty() && self.slots.len() >= self.sweep_at {
            self.collect_garbage();
            self.sweep_at = (self.slots.len() * 2).max(MIN_SWEEP);
        }
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.hub = Some(hub);
            return HubId::new(idx, slot.generation);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "more than u32::MAX live hubs is not supported"
        )]
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            hub: Some(hub),
        });
        HubId::new(idx, 1)
    }

    pub(crate) fn hub(&self, id: HubId) -> Option<&Hub> {
        self.slots
            .get(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.hub.as_ref())
            .filter(|hub| hub.is_alive())
    }

    pub(crate) fn hub_mut(&mut self, id: HubId) -> Option<&mut Hub> {
        self.slots
            .get_mut(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.hub.as_mut())
            .filter(|hub| hub.is_alive())
    }

    pub(crate) fn require(&self, id: HubId) -> Result<&Hub, HubError> {
        self.hub(id).ok_or(HubError::Stale(id))
    }

    pub(crate) fn require_mut(&mut self, id: HubId) -> Result<&mut Hub, HubError> {
        self.hub_mut(id).ok_or(HubError::Stale(id))
    }

    /// Registers a weakly held listener under `target` on `hub`.
    ///
    /// The caller keeps `listener` alive; once its last `Rc` is dropped the
    /// hub skips and forgets it.
    pub fn listen(
        &mut self,
        hub: HubId,
        target: impl Into<Target>,
        listener: &Listener,
    ) -> Result<(), HubError> {
        self.listen_with(hub, target, listener, Strength::Weak)
    }

    /// Registers a listener that the hub keeps alive.
    pub fn listen_strong(
        &mut self,
        hub: HubId,
        target: impl Into<Target>,
        listener: Listener,
    ) -> Result<(), HubError> {
        self.listen_with(hub, target, &listener, Strength::Strong)
    }

    /// Registers a listener under `target` on `hub` with an explicit strength.
    pub fn listen_with(
        &mut self,
        hub: HubId,
        target: impl Into<Target>,
        listener: &Listener,
        strength: Strength,
    ) -> Result<(), HubError> {
        self.require_mut(hub)?
            .listeners
            .add(target.into(), listener, strength);
        Ok(())
    }

    /// Removes `listener` from `target` on `hub`, or all listeners under
    /// `target` when `listener` is `None`.
    ///
    /// Returns `true` if anything was removed.
    pub fn unlisten(
        &mut self,
        hub: HubId,
        target: impl Into<Target>,
        listener: Option<&Listener>,
    ) -> Result<bool, HubError> {
        Ok(self
            .require_mut(hub)?
            .listeners
            .remove(&target.into(), listener))
    }

    /// Returns `true` if `listener` is registered under `target` on `hub`.
    #[must_use]
    pub fn is_listening(&self, hub: HubId, target: impl Into<Target>, listener: &Listener) -> bool {
        self.hub(hub)
            .is_some_and(|h| h.listeners.contains(&target.into(), listener))
    }

    /// Registers a listener with every hub of this context.
    ///
    /// `None` registers it for every target. Global listeners are held
    /// strongly and run after a hub's own listeners, before bubbling.
    pub fn add_global_listener(&mut self, listener: Listener, target: Option<Target>) {
        self.global_listeners
            .add(target.unwrap_or_default(), &listener, Strength::Strong);
    }

    /// Removes a global listener; returns `true` if it was registered.
    pub fn remove_global_listener(&mut self, listener: &Listener, target: Option<Target>) -> bool {
        self.global_listeners
            .remove(&target.unwrap_or_default(), Some(listener))
    }

    /// Creates an event for `target` on `hub` and triggers it.
    pub fn emit(&mut self, hub: HubId, target: impl Into<Target>) -> Result<(), HubError> {
        self.trigger(&mut Event::new(hub, target))
    }

    /// Triggers `event` on its hub.
    ///
    /// Events on a hub whose owner is gone are dropped. A listener failure
    /// stops the dispatch and is returned.
    pub fn trigger(&mut self, event: &mut Event) -> Result<(), HubError> {
        let id = event.hub();
        if !self.is_alive(id) {
            tracing::trace!(hub = ?id, target = %event.target(), "dropped event on a dead hub");
            return Ok(());
        }
        let any = Target::any();
        for source in [Source::Local, Source::Global] {
            for wildcard in [false, true] {
                if wildcard && event.target().is_any() {
                    continue;
                }
                let key = if wildcard { &any } else { event.target() };
                let batch = match source {
                    Source::Local => match self.hub_mut(id) {
                        Some(hub) => hub.listeners.snapshot(key),
                        None => return Ok(()),
                    },
                    Source::Global => self.global_listeners.snapshot(key),
                };
                for listener in &batch {
                    self.dispatch(event, listener)?;
                    if event.is_stopped() {
                        return Ok(());
                    }
                }
            }
        }
        self.bubble(event)
    }

    fn bubble(&mut self, event: &mut Event) -> Result<(), HubError> {
        let id = event.hub();
        let Some(hub) = self.hub(id) else {
            return Ok(());
        };
        let edges: SmallVec<[(HubId, Target); 4]> = hub
            .upstream
            .iter()
            .flat_map(|edge| edge.labels.iter().map(move |label| (edge.hub, label.clone())))
            .collect();
        let mut saw_dead = false;
        for (upstream, label) in edges {
            if !self.is_alive(upstream) {
                saw_dead = true;
                continue;
            }
            let mut bubbled = event.bubbled(upstream, &label);
            self.trigger(&mut bubbled)?;
            if bubbled.is_stopped() {
                event.stop();
                break;
            }
        }
        if saw_dead {
            self.prune_upstream(id);
        }
        Ok(())
    }

    /// Delivers `event` to `listener` through the active interceptor.
    ///
    /// Resolution order: the event's own dispatcher, the top interceptor of
    /// the event's hub, the top context-wide interceptor, a direct call.
    pub fn dispatch(&mut self, event: &mut Event, listener: &Listener) -> Result<(), HubError> {
        let interceptor = event
            .dispatcher()
            .cloned()
            .or_else(|| {
                self.hub(event.hub())
                    .and_then(|hub| hub.interceptors.last().cloned())
            })
            .or_else(|| self.global_interceptors.last().cloned());
        match interceptor {
            Some(interceptor) => interceptor(self, event, listener),
            None => listener(self, event),
        }
    }
}

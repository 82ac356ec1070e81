// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped dispatch interceptors.
//!
//! An interceptor scope pushes an [`Interceptor`] when it is entered and pops
//! it when the scope body returns. The pop is done by a drop guard, so it also
//! happens if the body panics. Stacks are strictly LIFO.
//!
//! Three interceptors ship with the crate:
//!
//! - **quiet** stops every intercepted event without calling the listener;
//! - **queue** records `(event, listener)` pairs and hands them to the caller;
//! - **unique** records pairs, drops duplicates, and once the body succeeds
//!   delivers each remaining pair exactly once through normal dispatch.
//!
//! Each exists context-wide ([`Hubs::quiet`]) and for a single hub
//! ([`Hubs::quiet_hub`]). A hub's own interceptor outranks the context-wide
//! one for events dispatched on that hub.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashSet;

use crate::error::HubError;
use crate::event::Event;
use crate::hubs::{HubId, Hubs};
use crate::listener::{Interceptor, Listener, interceptor, listener_addr};
use crate::target::Target;

/// Which interceptor stack a scope pushes onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterceptScope {
    /// The context-wide stack, consulted for every hub.
    Global,
    /// The stack of one hub, consulted for events dispatched on it.
    Hub(HubId),
}

/// An `(event, listener)` pair captured by a queueing interceptor.
#[derive(Clone)]
pub struct Queued {
    /// The event as it was when intercepted.
    pub event: Event,
    /// The listener the event was headed for.
    pub listener: Listener,
}

impl Queued {
    /// Delivers the pair through normal dispatch.
    ///
    /// Interceptors active at the time of the call apply.
    pub fn replay(mut self, hubs: &mut Hubs) -> Result<(), HubError> {
        hubs.dispatch(&mut self.event, &self.listener)
    }
}

impl fmt::Debug for Queued {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queued")
            .field("event", &self.event)
            .field("listener", &listener_addr(&self.listener))
            .finish()
    }
}

/// Pops one interceptor when dropped.
struct PopGuard<'a> {
    hubs: &'a mut Hubs,
    scope: InterceptScope,
}

impl Drop for PopGuard<'_> {
    fn drop(&mut self) {
        match self.scope {
            InterceptScope::Global => {
                self.hubs.global_interceptors.pop();
            }
            InterceptScope::Hub(id) => {
                if let Some(hub) = self.hubs.hub_mut(id) {
                    hub.interceptors.pop();
                }
            }
        }
    }
}

/// Removes a global listener when dropped.
struct UnlistenGuard<'a> {
    hubs: &'a mut Hubs,
    listener: Listener,
    target: Option<Target>,
}

impl Drop for UnlistenGuard<'_> {
    fn drop(&mut self) {
        self.hubs
            .remove_global_listener(&self.listener, self.target.take());
    }
}

#[derive(Default)]
struct UniqueSet {
    seen: HashSet<(HubId, Target, usize)>,
    pending: Vec<Queued>,
}

fn quiet_interceptor() -> Interceptor {
    interceptor(|_, event, _| {
        event.stop();
        Ok(())
    })
}

fn queue_interceptor(sink: Rc<RefCell<Vec<Queued>>>) -> Interceptor {
    interceptor(move |_, event, listener| {
        sink.borrow_mut().push(Queued {
            event: event.clone(),
            listener: Rc::clone(listener),
        });
        Ok(())
    })
}

fn unique_interceptor(set: Rc<RefCell<UniqueSet>>) -> Interceptor {
    interceptor(move |_, event, listener| {
        let mut set = set.borrow_mut();
        let key = (event.hub(), event.target().clone(), listener_addr(listener));
        if set.seen.insert(key) {
            set.pending.push(Queued {
                event: event.clone(),
                listener: Rc::clone(listener),
            });
        }
        Ok(())
    })
}

impl Hubs {
    /// Runs `f` with `interceptor` pushed onto the stack named by `scope`.
    ///
    /// Fails with [`HubError::Stale`] if `scope` names a dead hub.
    pub fn with_interceptor<R>(
        &mut self,
        scope: InterceptScope,
        interceptor: Interceptor,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, HubError> {
        match scope {
            InterceptScope::Global => self.global_interceptors.push(interceptor),
            InterceptScope::Hub(id) => self.require_mut(id)?.interceptors.push(interceptor),
        }
        let mut guard = PopGuard { hubs: self, scope };
        Ok(f(&mut *guard.hubs))
    }

    fn with_global_interceptor<R>(
        &mut self,
        interceptor: Interceptor,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.global_interceptors.push(interceptor);
        let mut guard = PopGuard {
            hubs: self,
            scope: InterceptScope::Global,
        };
        f(&mut *guard.hubs)
    }

    /// Runs `f` with every listener call suppressed.
    ///
    /// Events triggered inside are stopped at their first listener, so they
    /// neither reach listeners nor bubble.
    pub fn quiet<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.with_global_interceptor(quiet_interceptor(), f)
    }

    /// Like [`quiet`](Self::quiet), for events dispatched on `hub` only.
    pub fn quiet_hub<R>(&mut self, hub: HubId, f: impl FnOnce(&mut Self) -> R) -> Result<R, HubError> {
        self.with_interceptor(InterceptScope::Hub(hub), quiet_interceptor(), f)
    }

    /// Runs `f` recording listener calls instead of making them.
    ///
    /// Returns the body's result and the recorded pairs, in dispatch order.
    /// Each pair can be delivered later with [`Queued::replay`].
    pub fn queue<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, Vec<Queued>) {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let out = self.with_global_interceptor(queue_interceptor(Rc::clone(&sink)), f);
        let queued = core::mem::take(&mut *sink.borrow_mut());
        (out, queued)
    }

    /// Like [`queue`](Self::queue), for events dispatched on `hub` only.
    pub fn queue_hub<R>(
        &mut self,
        hub: HubId,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<(R, Vec<Queued>), HubError> {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let out = self.with_interceptor(
            InterceptScope::Hub(hub),
            queue_interceptor(Rc::clone(&sink)),
            f,
        )?;
        let queued = core::mem::take(&mut *sink.borrow_mut());
        Ok((out, queued))
    }

    /// Runs `f` collapsing duplicate listener calls.
    ///
    /// Calls are recorded while `f` runs. A pair whose event has the same hub
    /// and target as an earlier one, for the same listener, is dropped. If `f`
    /// succeeds, the remaining pairs are delivered once each, in first-seen
    /// order, after the interceptor is popped. If `f` fails nothing is
    /// delivered.
    pub fn unique<R, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E>
    where
        E: From<HubError>,
    {
        let set = Rc::new(RefCell::new(UniqueSet::default()));
        let out = self.with_global_interceptor(unique_interceptor(Rc::clone(&set)), f)?;
        self.deliver(&set)?;
        Ok(out)
    }

    /// Like [`unique`](Self::unique), for events dispatched on `hub` only.
    pub fn unique_hub<R, E>(
        &mut self,
        hub: HubId,
        f: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<HubError>,
    {
        let set = Rc::new(RefCell::new(UniqueSet::default()));
        let out = self.with_interceptor(
            InterceptScope::Hub(hub),
            unique_interceptor(Rc::clone(&set)),
            f,
        )??;
        self.deliver(&set)?;
        Ok(out)
    }

    fn deliver(&mut self, set: &RefCell<UniqueSet>) -> Result<(), HubError> {
        let pending = core::mem::take(&mut set.borrow_mut().pending);
        for queued in pending {
            queued.replay(self)?;
        }
        Ok(())
    }

    /// Runs `f` with `listener` registered globally, removing it afterwards.
    pub fn with_global_listener<R>(
        &mut self,
        listener: Listener,
        target: Option<Target>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.add_global_listener(Rc::clone(&listener), target.clone());
        let mut guard = UnlistenGuard {
            hubs: self,
            listener,
            target,
        };
        f(&mut *guard.hubs)
    }
}

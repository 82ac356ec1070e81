// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Event Hub: per-object event routing with bubbling.
//!
//! This crate gives arbitrary objects an event hub: a router with a listener
//! table, a set of labelled upstream edges, and a stack of dispatch
//! interceptors. Events fired on a hub reach its own listeners, then the
//! context-wide listeners, then bubble to every upstream hub with the edge
//! label prepended to their target.
//!
//! ## Core Concepts
//!
//! - [`Target`]: a flat path of [`Symbol`]s such as `["b", "t", "changed"]`.
//!   The empty target is the wildcard listener key.
//! - [`Event`]: origin hub, target, stop flag, optional dispatcher override and
//!   [`ErasedValue`] metadata.
//! - [`Hubs`]: the arena that owns every hub plus the context-wide listener
//!   registry and interceptor stack. Every operation that can emit events takes
//!   it by `&mut`; there is no global state.
//! - [`HubId`]: a generation-checked handle. Hubs hold their owner, upstream
//!   hubs and weakly registered listeners weakly; a handle whose owner was
//!   dropped simply stops resolving.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use understory_event_hub::{HubId, HubOwner, Hubs, Target, listener};
//!
//! struct Widget {
//!     hub: Cell<Option<HubId>>,
//! }
//!
//! impl HubOwner for Widget {
//!     fn hub_slot(&self) -> &Cell<Option<HubId>> {
//!         &self.hub
//!     }
//! }
//!
//! let widget = || Rc::new(Widget { hub: Cell::new(None) });
//! let (window, button) = (widget(), widget());
//!
//! let mut hubs = Hubs::new();
//! let w = hubs.ensure(&window);
//! let b = hubs.ensure(&button);
//! hubs.connect(w, b, "ok_button").unwrap();
//!
//! // Connecting the other way round would close a loop.
//! assert!(hubs.connect(b, w, "window").unwrap_err().is_cycle());
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&log);
//! let on_any = listener(move |_, event| {
//!     sink.borrow_mut().push(event.target().clone());
//!     Ok(())
//! });
//! hubs.listen(w, Target::any(), &on_any).unwrap();
//!
//! hubs.emit(b, "clicked").unwrap();
//! assert_eq!(*log.borrow(), [Target::from(["ok_button", "clicked"])]);
//!
//! // Inside a quiet scope nothing is delivered.
//! hubs.quiet(|hubs| hubs.emit(b, "clicked")).unwrap();
//! assert_eq!(log.borrow().len(), 1);
//! ```
//!
//! ## Interceptors
//!
//! Listener calls can be intercepted for the duration of a scope, either for
//! the whole context or for one hub: [`Hubs::quiet`] suppresses them,
//! [`Hubs::queue`] records them, and [`Hubs::unique`] delivers each distinct
//! call once when the scope ends. See the [`scope`] module.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. Diagnostics go through `tracing`
//! with default features disabled.

#![no_std]

extern crate alloc;

mod error;
mod event;
mod graph;
mod hubs;
mod listener;
pub mod scope;
mod target;
mod value;

pub use error::{HubError, SharedError};
pub use event::{Event, Metadata};
pub use hubs::{HubId, HubOwner, Hubs};
pub use listener::{Interceptor, Listener, Strength, interceptor, listener};
pub use scope::{InterceptScope, Queued};
pub use target::{Symbol, Target};
pub use value::ErasedValue;

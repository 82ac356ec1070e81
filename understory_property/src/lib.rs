// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: validated and reactive attributes.
//!
//! This crate layers typed attribute declarations over
//! [`understory_event_hub`]. A [`Class`] declares named attributes; an
//! [`Object`] is an instance holding the attribute values.
//!
//! ## Core Concepts
//!
//! ### Validated properties
//!
//! A [`ValidatedProperty`] checks every written value against its required
//! types, runs an optional coercion, then stores the result. Reads fall back
//! to a default computed once per object. See [`PropertyBuilder`].
//!
//! ### Reactive properties
//!
//! A [`ReactiveProperty`] is a validated property whose writes trigger
//! events on the object's hub:
//!
//! - `(name, "changed")` carrying [`OLD`] and [`NEW`] metadata;
//! - `(name, "error")` carrying the failure under [`FAILURE`].
//!
//! When the written value is itself an [`Object`], its hub is connected
//! upstream to the owner under the label `name`, so events on the value
//! bubble to the owner as `(name, ...)`. Replacing the value moves the edge.
//!
//! ### Delegates
//!
//! A [`Delegate`] forwards an attribute through a path of nested objects.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use understory_property::{
//!     Class, ErasedValue, Hubs, NEW, PropertyBuilder, listener, on_change,
//! };
//!
//! let engine = Class::new("Engine");
//! let rpm = PropertyBuilder::new()
//!     .instance_of_type::<u32>()
//!     .build_reactive();
//! engine.define("rpm", &rpm).unwrap();
//!
//! let car = Class::new("Car");
//! let motor = PropertyBuilder::new().instance_of(&engine).build_reactive();
//! car.define("motor", &motor).unwrap();
//!
//! let mut hubs = Hubs::new();
//! let c = car.instantiate();
//! let e = engine.instantiate();
//! motor.set(&mut hubs, &c, ErasedValue::new(e.clone())).unwrap();
//!
//! // Changes inside the engine bubble to the car as `motor.rpm.changed`.
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let on_rpm = listener(move |_, event| {
//!     sink.borrow_mut().push(*event.meta::<u32>(NEW).unwrap());
//!     Ok(())
//! });
//! on_change(&mut hubs, &c, ["motor", "rpm"], &on_rpm).unwrap();
//!
//! rpm.set(&mut hubs, &e, ErasedValue::new(3000_u32)).unwrap();
//! assert_eq!(*seen.borrow(), [3000]);
//!
//! // Rejected writes leave the value alone.
//! assert!(rpm.set(&mut hubs, &e, ErasedValue::new("fast")).is_err());
//! assert_eq!(e.get_as::<u32>("rpm").unwrap(), 3000);
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod class;
mod delegate;
mod error;
mod object;
mod reactive;
mod store;
mod validated;

pub use class::{Attribute, Class, StaticListener};
pub use delegate::{Delegate, Hop};
pub use error::PropertyError;
pub use object::{Object, WeakObject, connect, disconnect, ensure_hub, hub_of, is_connected};
pub use reactive::{CHANGED, ERROR, FAILURE, NEW, NoDefault, OLD, ReactiveProperty, on_change};
pub use store::{PropertyStore, StoreKey};
pub use validated::{
    Coercion, DefaultFactory, Deleter, Getter, PropertyBuilder, RequiredType, Setter,
    ValidatedProperty,
};

pub use understory_event_hub::{
    ErasedValue, Event, HubError, HubId, Hubs, Listener, Symbol, Target, listener,
};

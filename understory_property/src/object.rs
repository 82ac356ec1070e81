// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Class instances and their event hubs.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::{Cell, RefCell};
use core::fmt;

use understory_event_hub::{
    ErasedValue, HubError, HubId, HubOwner, Hubs, Target, listener,
};

use crate::class::Class;
use crate::error::PropertyError;
use crate::store::{PropertyStore, StoreKey};
use crate::validated::describe_value;

struct ObjectInner {
    class: Class,
    store: RefCell<PropertyStore>,
    hub: Cell<Option<HubId>>,
}

impl HubOwner for ObjectInner {
    fn hub_slot(&self) -> &Cell<Option<HubId>> {
        &self.hub
    }
}

/// A shared handle to an instance of a [`Class`].
///
/// Attribute access by name consults the class declarations first; names
/// the class does not declare read and write plain storage.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

/// A non-owning [`Object`] handle.
#[derive(Clone, Default)]
pub struct WeakObject(Weak<ObjectInner>);

impl Object {
    /// Creates an instance of `class` with nothing stored.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self(Rc::new(ObjectInner {
            class: class.clone(),
            store: RefCell::new(PropertyStore::new()),
            hub: Cell::new(None),
        }))
    }

    /// The class of this object.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// Returns `true` if both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Creates a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.0))
    }

    /// Reads attribute `name`.
    pub fn get(&self, name: &str) -> Result<ErasedValue, PropertyError> {
        match self.class().attribute(name) {
            Some(attribute) => attribute.get(self),
            None => self
                .stored(&StoreKey::plain(name))
                .ok_or_else(|| PropertyError::not_set(name)),
        }
    }

    /// Reads attribute `name` as a `T`.
    ///
    /// Fails with [`PropertyError::TypeMismatch`] if the value is of another
    /// type.
    pub fn get_as<T: Clone + 'static>(&self, name: &str) -> Result<T, PropertyError> {
        let value = self.get(name)?;
        value
            .downcast::<T>()
            .ok_or_else(|| PropertyError::TypeMismatch {
                name: name.into(),
                expected: String::from(core::any::type_name::<T>()),
                found: describe_value(&value),
            })
    }

    /// Writes attribute `name`.
    pub fn set(&self, hubs: &mut Hubs, name: &str, value: ErasedValue) -> Result<(), PropertyError> {
        match self.class().attribute(name) {
            Some(attribute) => attribute.set(hubs, self, value),
            None => {
                self.store_value(StoreKey::plain(name), value);
                Ok(())
            }
        }
    }

    /// Clears attribute `name`.
    pub fn delete(&self, hubs: &mut Hubs, name: &str) -> Result<(), PropertyError> {
        match self.class().attribute(name) {
            Some(attribute) => attribute.delete(hubs, self),
            None => self
                .clear_stored(&StoreKey::plain(name))
                .map(drop)
                .ok_or_else(|| PropertyError::not_set(name)),
        }
    }

    /// Reads a raw storage slot.
    #[must_use]
    pub fn stored(&self, key: &StoreKey) -> Option<ErasedValue> {
        self.0.store.borrow().get(key).cloned()
    }

    /// Writes a raw storage slot, returning the previous value.
    pub fn store_value(&self, key: StoreKey, value: ErasedValue) -> Option<ErasedValue> {
        self.0.store.borrow_mut().set(key, value)
    }

    /// Clears a raw storage slot, returning the value it held.
    pub fn clear_stored(&self, key: &StoreKey) -> Option<ErasedValue> {
        self.0.store.borrow_mut().remove(key)
    }

    /// Returns this object's hub, creating it on first use.
    ///
    /// A new hub gets the class listeners registered with [`Class::on`].
    pub fn ensure_hub(&self, hubs: &mut Hubs) -> HubId {
        let class = self.0.class.clone();
        let this = self.downgrade();
        hubs.ensure_with(&self.0, move |hubs, hub| {
            for (target, bound) in class.static_listeners() {
                let owner = this.clone();
                let forward = listener(move |hubs, event| match owner.upgrade() {
                    Some(obj) => bound(hubs, &obj, event),
                    None => Ok(()),
                });
                let registered = hubs.listen_strong(hub, target, forward).is_ok();
                debug_assert!(registered, "a new hub accepts listeners");
            }
            tracing::trace!(class = %class.name(), hub = ?hub, "bound class listeners");
        })
    }

    /// Returns this object's hub without creating one.
    pub fn hub(&self, hubs: &Hubs) -> Result<HubId, HubError> {
        hubs.hub_of(&*self.0)
    }

    /// Recovers the object owning `hub`.
    #[must_use]
    pub fn from_hub(hubs: &Hubs, hub: HubId) -> Option<Self> {
        hubs.owner(hub)?.downcast::<ObjectInner>().ok().map(Self)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", self.class().name())
            .field("hub", &self.0.hub.get())
            .finish_non_exhaustive()
    }
}

impl WeakObject {
    /// Returns the object if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakObject")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

/// Returns the hub of `obj`, creating it on first use.
pub fn ensure_hub(hubs: &mut Hubs, obj: &Object) -> HubId {
    obj.ensure_hub(hubs)
}

/// Returns the hub of `obj` without creating one.
pub fn hub_of(hubs: &Hubs, obj: &Object) -> Result<HubId, HubError> {
    obj.hub(hubs)
}

/// Bubbles events from `downstream` to `upstream` under `label`, creating
/// both hubs if needed.
pub fn connect(
    hubs: &mut Hubs,
    upstream: &Object,
    downstream: &Object,
    label: impl Into<Target>,
) -> Result<bool, HubError> {
    let up = upstream.ensure_hub(hubs);
    let down = downstream.ensure_hub(hubs);
    hubs.connect(up, down, label)
}

/// Removes a `label` edge; objects without hubs have no edges.
pub fn disconnect(
    hubs: &mut Hubs,
    upstream: &Object,
    downstream: &Object,
    label: impl Into<Target>,
) -> bool {
    match (upstream.hub(hubs), downstream.hub(hubs)) {
        (Ok(up), Ok(down)) => hubs.disconnect(up, down, label),
        _ => false,
    }
}

/// Returns `true` if events on `downstream` reach `upstream`.
pub fn is_connected(hubs: &Hubs, upstream: &Object, downstream: &Object) -> bool {
    match (upstream.hub(hubs), downstream.hub(hubs)) {
        (Ok(up), Ok(down)) => hubs.is_connected(up, down),
        _ => upstream.ptr_eq(downstream),
    }
}

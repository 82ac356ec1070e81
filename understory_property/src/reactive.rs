// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive properties: validated properties that emit events.

use understory_event_hub::{ErasedValue, Event, HubError, HubId, Hubs, Listener, Symbol, Target};

use crate::delegate::{Delegate, Hop};
use crate::error::PropertyError;
use crate::object::Object;
use crate::validated::{PropertyBuilder, ValidatedProperty};

/// Last symbol of the event emitted after a successful write.
pub const CHANGED: &str = "changed";
/// Last symbol of the event emitted after a failed write.
pub const ERROR: &str = "error";
/// Metadata key of the value before a write.
pub const OLD: &str = "old";
/// Metadata key of the value after a write.
pub const NEW: &str = "new";
/// Metadata key of the failure carried by an `error` event.
pub const FAILURE: &str = "error";

/// Stands in for the previous value of a property that was never set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoDefault;

/// A validated property whose writes are observable.
///
/// Every write goes through [`set`](Self::set), which triggers on the
/// object's hub:
///
/// - `(name, "changed")` with `old` and `new` metadata after a successful
///   write, then rewires the bubbling edge labelled `name` from the old value's
///   hub to the new value's hub;
/// - `(name, "error")` with `error` metadata after a failed write, then
///   returns the failure.
///
/// Reads and deletes emit nothing. Deleting an object value drops its
/// bubbling edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactiveProperty {
    inner: ValidatedProperty,
}

impl ReactiveProperty {
    pub(crate) fn new(inner: ValidatedProperty) -> Self {
        Self { inner }
    }

    /// Starts declaring a property; finish with
    /// [`PropertyBuilder::build_reactive`].
    #[must_use]
    pub fn builder() -> PropertyBuilder {
        PropertyBuilder::new()
    }

    /// The underlying validated property.
    #[must_use]
    pub fn validated(&self) -> &ValidatedProperty {
        &self.inner
    }

    /// The attribute name this property is bound as.
    #[must_use]
    pub fn name(&self) -> Option<&Symbol> {
        self.inner.name()
    }

    /// The event target of this property: its attribute name.
    ///
    /// Fails with [`PropertyError::Configuration`] while unbound.
    pub fn target(&self) -> Result<Target, PropertyError> {
        self.inner.name().cloned().map(Target::from).ok_or_else(|| {
            PropertyError::Configuration(alloc::string::String::from(
                "property is not bound to a class attribute",
            ))
        })
    }

    /// `target()` followed by `changed`.
    pub fn changed_target(&self) -> Result<Target, PropertyError> {
        Ok(self.target()?.with(CHANGED))
    }

    /// `target()` followed by `error`.
    pub fn error_target(&self) -> Result<Target, PropertyError> {
        Ok(self.target()?.with(ERROR))
    }

    /// Reads the value on `obj`. Emits nothing.
    pub fn get(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        self.inner.get(obj)
    }

    /// Clears the value on `obj` and disconnects it if it was an object.
    /// Emits nothing.
    pub fn delete(&self, hubs: &mut Hubs, obj: &Object) -> Result<(), PropertyError> {
        let target = self.target()?;
        let held = self.inner.store_key().and_then(|key| obj.stored(key));
        self.inner.delete(obj)?;
        if let Some(held) = held
            && let Some(held_obj) = held.downcast_ref::<Object>()
            && let (Ok(hub), Ok(held_hub)) = (obj.hub(hubs), held_obj.hub(hubs))
        {
            hubs.disconnect(hub, held_hub, target);
        }
        Ok(())
    }

    /// Builds a path into attribute `attr` of this property's value.
    pub fn delegates_to(&self, attr: &str) -> Result<Delegate, PropertyError> {
        Delegate::through(Hop::Reactive(self.clone()), self.inner.required_class()?, attr)
    }

    /// Writes `value` on `obj` and reports the outcome on the object's hub.
    ///
    /// # Errors
    ///
    /// The write failure, after the `error` event has been triggered; a
    /// failing `error` listener replaces it. An object value whose hub
    /// already reaches `obj` by bubbling fails with [`HubError::Cycle`]
    /// before anything is stored. Failures of `changed` listeners are
    /// returned as is, after the value is stored.
    ///
    /// A coercion that turns the value into an object only meets the cycle
    /// check when reconnecting; that failure is returned after the value is
    /// stored and `changed` has fired.
    pub fn set(&self, hubs: &mut Hubs, obj: &Object, value: ErasedValue) -> Result<(), PropertyError> {
        let target = self.target()?;
        let hub = obj.ensure_hub(hubs);
        let outcome = self
            .read_old(obj)
            .and_then(|old| {
                check_acyclic(hubs, hub, &value, &target)?;
                Ok(old)
            })
            .and_then(|old| self.inner.assign(obj, value).map(|new| (old, new)));
        let (old, new) = match outcome {
            Ok(pair) => pair,
            Err(error) => {
                tracing::debug!(property = %target, %error, "reactive write failed");
                let mut event = Event::new(hub, target.with(ERROR))
                    .with_meta(FAILURE, ErasedValue::new(error.clone()));
                hubs.trigger(&mut event)?;
                return Err(error);
            }
        };

        let mut event = Event::new(hub, target.with(CHANGED))
            .with_meta(OLD, old.clone())
            .with_meta(NEW, new.clone());
        hubs.trigger(&mut event)?;

        if let Some(old_obj) = old.downcast_ref::<Object>()
            && let Ok(old_hub) = old_obj.hub(hubs)
        {
            hubs.disconnect(hub, old_hub, target.clone());
        }
        if let Some(new_obj) = new.downcast_ref::<Object>() {
            let new_hub = new_obj.ensure_hub(hubs);
            hubs.connect(hub, new_hub, target)?;
        }
        Ok(())
    }

    fn read_old(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        match self.inner.get(obj) {
            Err(error) if error.is_not_set() => Ok(ErasedValue::new(NoDefault)),
            other => other,
        }
    }
}

/// Fails if `value` is an object whose hub already bubbles to `hub`.
fn check_acyclic(
    hubs: &Hubs,
    hub: HubId,
    value: &ErasedValue,
    label: &Target,
) -> Result<(), PropertyError> {
    if let Some(child) = value.downcast_ref::<Object>()
        && let Ok(child_hub) = child.hub(hubs)
        && hubs.is_connected(child_hub, hub)
    {
        return Err(HubError::Cycle {
            upstream: hub,
            downstream: child_hub,
            label: label.clone(),
        }
        .into());
    }
    Ok(())
}

/// Registers `listener` for `changed` events of `target` on `obj`.
///
/// `target` names a property, or a path of properties reached by bubbling;
/// the listener is held weakly.
pub fn on_change(
    hubs: &mut Hubs,
    obj: &Object,
    target: impl Into<Target>,
    listener: &Listener,
) -> Result<(), PropertyError> {
    let target: Target = target.into();
    let hub = obj.ensure_hub(hubs);
    hubs.listen(hub, target.with(CHANGED), listener)?;
    Ok(())
}

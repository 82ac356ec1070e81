// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute paths that forward through nested objects.

use alloc::format;
use alloc::string::String;
use core::fmt;

use smallvec::SmallVec;
use understory_event_hub::{ErasedValue, Hubs, Symbol, Target};

use crate::class::{Attribute, Class};
use crate::error::PropertyError;
use crate::object::Object;
use crate::reactive::{CHANGED, ERROR, ReactiveProperty};
use crate::validated::ValidatedProperty;

/// One step of a [`Delegate`] path.
#[derive(Clone)]
pub enum Hop {
    /// An attribute looked up by name on whatever object the path reached.
    Named(Symbol),
    /// A validated property.
    Validated(ValidatedProperty),
    /// A reactive property.
    Reactive(ReactiveProperty),
}

impl Hop {
    /// The attribute name of this hop.
    ///
    /// Fails with [`PropertyError::Configuration`] for unbound properties.
    pub fn name(&self) -> Result<Symbol, PropertyError> {
        match self {
            Self::Named(name) => Ok(name.clone()),
            Self::Validated(p) => p.name().cloned().ok_or_else(unbound),
            Self::Reactive(p) => p.name().cloned().ok_or_else(unbound),
        }
    }

    fn label(&self) -> Symbol {
        match self {
            Self::Named(name) => name.clone(),
            Self::Validated(p) => p.label(),
            Self::Reactive(p) => p.validated().label(),
        }
    }

    fn property(&self) -> Option<&ValidatedProperty> {
        match self {
            Self::Named(_) => None,
            Self::Validated(p) => Some(p),
            Self::Reactive(p) => Some(p.validated()),
        }
    }

    fn get(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        match self {
            Self::Named(name) => obj.get(name.as_str()),
            Self::Validated(p) => p.get(obj),
            Self::Reactive(p) => p.get(obj),
        }
    }

    fn set(&self, hubs: &mut Hubs, obj: &Object, value: ErasedValue) -> Result<(), PropertyError> {
        match self {
            Self::Named(name) => obj.set(hubs, name.as_str(), value),
            Self::Validated(p) => p.set(obj, value),
            Self::Reactive(p) => p.set(hubs, obj, value),
        }
    }

    fn delete(&self, hubs: &mut Hubs, obj: &Object) -> Result<(), PropertyError> {
        match self {
            Self::Named(name) => obj.delete(hubs, name.as_str()),
            Self::Validated(p) => p.delete(obj),
            Self::Reactive(p) => p.delete(hubs, obj),
        }
    }

    fn delegates_to(&self, attr: &str) -> Result<Delegate, PropertyError> {
        match self {
            Self::Named(name) => Err(PropertyError::Configuration(format!(
                "cannot delegate through untyped attribute `{name}`"
            ))),
            Self::Validated(p) => p.delegates_to(attr),
            Self::Reactive(p) => p.delegates_to(attr),
        }
    }
}

fn unbound() -> PropertyError {
    PropertyError::Configuration(String::from("property is not bound to a class attribute"))
}

/// Hops compare by name when named, and by declaration identity otherwise.
impl PartialEq for Hop {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named(a), Self::Named(b)) => a == b,
            _ => match (self.property(), other.property()) {
                (Some(a), Some(b)) => a.ptr_eq(b),
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Validated(_) => f.debug_tuple("Validated").field(&self.label()).finish(),
            Self::Reactive(_) => f.debug_tuple("Reactive").field(&self.label()).finish(),
        }
    }
}

impl From<&str> for Hop {
    fn from(name: &str) -> Self {
        Self::Named(Symbol::new(name))
    }
}

impl From<Symbol> for Hop {
    fn from(name: Symbol) -> Self {
        Self::Named(name)
    }
}

impl From<ValidatedProperty> for Hop {
    fn from(p: ValidatedProperty) -> Self {
        Self::Validated(p)
    }
}

impl From<&ValidatedProperty> for Hop {
    fn from(p: &ValidatedProperty) -> Self {
        Self::Validated(p.clone())
    }
}

impl From<ReactiveProperty> for Hop {
    fn from(p: ReactiveProperty) -> Self {
        Self::Reactive(p)
    }
}

impl From<&ReactiveProperty> for Hop {
    fn from(p: &ReactiveProperty) -> Self {
        Self::Reactive(p.clone())
    }
}

/// An attribute reached through a path of nested objects.
///
/// Reading walks every hop but the last as an object reference, then reads
/// the last hop on the object reached. Writes and deletes walk the same way.
/// Paths stay flat: delegating through a delegate splices its hops in place.
///
/// # Example
///
/// ```rust
/// use understory_property::{Class, Delegate, ErasedValue, Hop, Hubs, PropertyBuilder};
///
/// let inner = Class::new("Inner");
/// let x = PropertyBuilder::new().build();
/// inner.define("x", &x).unwrap();
///
/// let outer = Class::new("Outer");
/// let child = PropertyBuilder::new().instance_of(&inner).build();
/// outer.define("child", &child).unwrap();
///
/// let x_of_child = child.delegates_to("x").unwrap();
/// assert_eq!(x_of_child.flat(), &[Hop::from(&child), Hop::from(&x)]);
/// outer.define("x", &x_of_child).unwrap();
///
/// let mut hubs = Hubs::new();
/// let o = outer.instantiate();
/// let i = inner.instantiate();
/// child.set(&o, ErasedValue::new(i.clone())).unwrap();
/// o.set(&mut hubs, "x", ErasedValue::new(7_u8)).unwrap();
/// assert_eq!(x.get(&i).unwrap().downcast::<u8>(), Some(7));
/// ```
#[derive(Clone, PartialEq)]
pub struct Delegate {
    hops: SmallVec<[Hop; 3]>,
}

impl Delegate {
    /// A path reading `inner` on the object held by `outer`.
    #[must_use]
    pub fn new(outer: impl Into<Hop>, inner: impl Into<Hop>) -> Self {
        let mut hops = SmallVec::new();
        hops.push(outer.into());
        hops.push(inner.into());
        Self { hops }
    }

    /// A dynamically typed path through attribute names.
    ///
    /// Fails with [`PropertyError::Configuration`] for fewer than two names.
    pub fn named<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, PropertyError> {
        let hops: SmallVec<[Hop; 3]> = names.into_iter().map(Hop::from).collect();
        if hops.len() < 2 {
            return Err(PropertyError::Configuration(String::from(
                "a delegate needs at least two hops",
            )));
        }
        Ok(Self { hops })
    }

    /// A path reading `inner` on the object held by `outer`, splicing `inner`
    /// in place when it is itself a delegate.
    #[must_use]
    pub fn compose(outer: impl Into<Hop>, inner: impl Into<Attribute>) -> Self {
        let mut hops: SmallVec<[Hop; 3]> = SmallVec::new();
        hops.push(outer.into());
        let inner: Attribute = inner.into();
        match inner {
            Attribute::Validated(p) => hops.push(Hop::Validated(p)),
            Attribute::Reactive(p) => hops.push(Hop::Reactive(p)),
            Attribute::Delegate(d) => hops.extend(d.hops),
        }
        Self { hops }
    }

    pub(crate) fn through(outer: Hop, class: &Class, attr: &str) -> Result<Self, PropertyError> {
        let inner = class.attribute(attr).ok_or_else(|| {
            PropertyError::Configuration(format!(
                "class `{}` has no attribute `{attr}`",
                class.name()
            ))
        })?;
        Ok(Self::compose(outer, inner))
    }

    /// The hops of this path, outermost first.
    #[must_use]
    pub fn flat(&self) -> &[Hop] {
        &self.hops
    }

    /// Appends a hop without validating it.
    pub fn push(&mut self, hop: impl Into<Hop>) {
        self.hops.push(hop.into());
    }

    /// Extends this path into attribute `attr` of the value its last hop
    /// holds.
    ///
    /// The last hop must be a property constrained to a single class that
    /// declares `attr`.
    pub fn extend(&self, attr: &str) -> Result<Self, PropertyError> {
        let Some((last, path)) = self.hops.split_last() else {
            return Err(PropertyError::Configuration(String::from("empty delegate")));
        };
        let tail = last.delegates_to(attr)?;
        let mut hops: SmallVec<[Hop; 3]> = path.iter().cloned().collect();
        hops.extend(tail.hops);
        Ok(Self { hops })
    }

    /// Same as [`extend`](Self::extend).
    pub fn delegates_to(&self, attr: &str) -> Result<Self, PropertyError> {
        self.extend(attr)
    }

    /// The event target named by this path: one symbol per hop.
    pub fn target(&self) -> Result<Target, PropertyError> {
        self.hops.iter().map(Hop::name).collect()
    }

    /// `target()` followed by `changed`.
    pub fn changed_target(&self) -> Result<Target, PropertyError> {
        Ok(self.target()?.with(CHANGED))
    }

    /// `target()` followed by `error`.
    pub fn error_target(&self) -> Result<Target, PropertyError> {
        Ok(self.target()?.with(ERROR))
    }

    /// Walks to the object holding the last hop.
    fn resolve(&self, obj: &Object) -> Result<(Object, &Hop), PropertyError> {
        let Some((last, path)) = self.hops.split_last() else {
            return Err(PropertyError::Configuration(String::from("empty delegate")));
        };
        let mut current = obj.clone();
        for hop in path {
            let value = hop.get(&current)?;
            current = value
                .downcast::<Object>()
                .ok_or_else(|| PropertyError::NotAnObject { name: hop.label() })?;
        }
        Ok((current, last))
    }

    /// Reads the attribute at the end of the path.
    pub fn get(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        let (holder, last) = self.resolve(obj)?;
        last.get(&holder)
    }

    /// Writes the attribute at the end of the path.
    pub fn set(&self, hubs: &mut Hubs, obj: &Object, value: ErasedValue) -> Result<(), PropertyError> {
        let (holder, last) = self.resolve(obj)?;
        last.set(hubs, &holder, value)
    }

    /// Clears the attribute at the end of the path.
    pub fn delete(&self, hubs: &mut Hubs, obj: &Object) -> Result<(), PropertyError> {
        let (holder, last) = self.resolve(obj)?;
        last.delete(hubs, &holder)
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.hops.iter()).finish()
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classes: named attribute tables and per-class listeners.

use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use understory_event_hub::{ErasedValue, Event, HubError, Hubs, Symbol, Target};

use crate::delegate::Delegate;
use crate::error::PropertyError;
use crate::object::Object;
use crate::reactive::ReactiveProperty;
use crate::validated::ValidatedProperty;

/// A listener declared on a class, bound to each instance's hub when the
/// hub is created.
pub type StaticListener = Rc<dyn Fn(&mut Hubs, &Object, &mut Event) -> Result<(), HubError>>;

/// A declared class attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    /// A validated property.
    Validated(ValidatedProperty),
    /// A reactive property.
    Reactive(ReactiveProperty),
    /// A path into a nested object.
    Delegate(Delegate),
}

impl Attribute {
    /// Reads the attribute on `obj`.
    pub fn get(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        match self {
            Self::Validated(p) => p.get(obj),
            Self::Reactive(p) => p.get(obj),
            Self::Delegate(d) => d.get(obj),
        }
    }

    /// Writes the attribute on `obj`.
    pub fn set(&self, hubs: &mut Hubs, obj: &Object, value: ErasedValue) -> Result<(), PropertyError> {
        match self {
            Self::Validated(p) => p.set(obj, value),
            Self::Reactive(p) => p.set(hubs, obj, value),
            Self::Delegate(d) => d.set(hubs, obj, value),
        }
    }

    /// Clears the attribute on `obj`.
    pub fn delete(&self, hubs: &mut Hubs, obj: &Object) -> Result<(), PropertyError> {
        match self {
            Self::Validated(p) => p.delete(obj),
            Self::Reactive(p) => p.delete(hubs, obj),
            Self::Delegate(d) => d.delete(hubs, obj),
        }
    }

    /// Builds a path into attribute `attr` of this attribute's value.
    pub fn delegates_to(&self, attr: &str) -> Result<Delegate, PropertyError> {
        match self {
            Self::Validated(p) => p.delegates_to(attr),
            Self::Reactive(p) => p.delegates_to(attr),
            Self::Delegate(d) => d.extend(attr),
        }
    }

    fn bind(&self, class: &Class, name: &Symbol) -> Result<(), PropertyError> {
        match self {
            Self::Validated(p) => p.bind(class, name),
            Self::Reactive(p) => p.validated().bind(class, name),
            Self::Delegate(_) => Ok(()),
        }
    }
}

impl From<ValidatedProperty> for Attribute {
    fn from(p: ValidatedProperty) -> Self {
        Self::Validated(p)
    }
}

impl From<&ValidatedProperty> for Attribute {
    fn from(p: &ValidatedProperty) -> Self {
        Self::Validated(p.clone())
    }
}

impl From<ReactiveProperty> for Attribute {
    fn from(p: ReactiveProperty) -> Self {
        Self::Reactive(p)
    }
}

impl From<&ReactiveProperty> for Attribute {
    fn from(p: &ReactiveProperty) -> Self {
        Self::Reactive(p.clone())
    }
}

impl From<Delegate> for Attribute {
    fn from(d: Delegate) -> Self {
        Self::Delegate(d)
    }
}

impl From<&Delegate> for Attribute {
    fn from(d: &Delegate) -> Self {
        Self::Delegate(d.clone())
    }
}

struct ClassInner {
    name: Symbol,
    attributes: RefCell<Vec<(Symbol, Attribute)>>,
    listeners: RefCell<Vec<(Target, StaticListener)>>,
}

/// A named set of attribute declarations shared by its instances.
///
/// Declaring an attribute binds its property to the attribute name; the name
/// then determines the property's storage slot and event target.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use understory_property::{Class, ErasedValue, Hubs, PropertyBuilder};
///
/// let counter = Class::new("Counter");
/// let value = PropertyBuilder::new().build_reactive();
/// counter.define("value", &value).unwrap();
///
/// let seen = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&seen);
/// counter.on(value.changed_target().unwrap(), move |_, _obj, _event| {
///     sink.set(sink.get() + 1);
///     Ok(())
/// });
///
/// let mut hubs = Hubs::new();
/// let c = counter.instantiate();
/// value.set(&mut hubs, &c, ErasedValue::new(1_u32)).unwrap();
/// assert_eq!(seen.get(), 1);
/// ```
#[derive(Clone)]
pub struct Class(Rc<ClassInner>);

impl Class {
    /// Creates a class with no attributes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Rc::new(ClassInner {
            name: Symbol::new(name),
            attributes: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &Symbol {
        &self.0.name
    }

    /// Declares attribute `name`.
    ///
    /// Properties are bound to `name` and cannot be declared again elsewhere.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::Configuration`] if `name` is already declared.
    /// - [`PropertyError::AlreadyBound`] if the property is declared elsewhere.
    pub fn define(&self, name: &str, attribute: impl Into<Attribute>) -> Result<(), PropertyError> {
        let name = Symbol::new(name);
        let attribute: Attribute = attribute.into();
        if self.attribute(name.as_str()).is_some() {
            return Err(PropertyError::Configuration(format!(
                "`{}.{name}` is already declared",
                self.name()
            )));
        }
        attribute.bind(self, &name)?;
        self.0.attributes.borrow_mut().push((name, attribute));
        Ok(())
    }

    /// Looks up a declared attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, a)| a.clone())
    }

    /// Declared attribute names, in declaration order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<Symbol> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Registers a listener bound to every instance's hub.
    ///
    /// Hubs that already exist are not affected.
    pub fn on<F>(&self, target: impl Into<Target>, listener: F)
    where
        F: Fn(&mut Hubs, &Object, &mut Event) -> Result<(), HubError> + 'static,
    {
        let listener: StaticListener = Rc::new(listener);
        self.0.listeners.borrow_mut().push((target.into(), listener));
    }

    pub(crate) fn static_listeners(&self) -> Vec<(Target, StaticListener)> {
        self.0.listeners.borrow().clone()
    }

    /// Creates an instance with nothing stored.
    #[must_use]
    pub fn instantiate(&self) -> Object {
        Object::new(self)
    }

    /// Returns `true` if both handles refer to the same class.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("attributes", &self.attribute_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyBuilder;

    #[test]
    fn duplicate_names_are_rejected() {
        let class = Class::new("C");
        class.define("a", PropertyBuilder::new().build()).unwrap();
        let err = class.define("a", PropertyBuilder::new().build()).unwrap_err();
        assert!(matches!(err, PropertyError::Configuration(_)));
        assert_eq!(class.attribute_names(), [Symbol::new("a")]);
    }

    #[test]
    fn define_binds_the_name() {
        let class = Class::new("C");
        let p = PropertyBuilder::new().build_reactive();
        class.define("speed", &p).unwrap();
        assert_eq!(p.target().unwrap(), Target::from("speed"));
        assert!(matches!(class.attribute("speed"), Some(Attribute::Reactive(_))));
    }
}

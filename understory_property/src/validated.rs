// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validated property descriptors.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::TypeId;
use core::cell::OnceCell;
use core::fmt;

use smallvec::SmallVec;
use understory_event_hub::{ErasedValue, Symbol};

use crate::class::Class;
use crate::delegate::{Delegate, Hop};
use crate::error::PropertyError;
use crate::object::Object;
use crate::reactive::ReactiveProperty;
use crate::store::StoreKey;

/// Replacement for the default storage read.
pub type Getter = Rc<dyn Fn(&Object) -> Result<ErasedValue, PropertyError>>;
/// Replacement for the default storage write.
pub type Setter = Rc<dyn Fn(&Object, ErasedValue) -> Result<(), PropertyError>>;
/// Replacement for the default storage clear.
pub type Deleter = Rc<dyn Fn(&Object) -> Result<(), PropertyError>>;
/// Converts an incoming value before it is stored.
pub type Coercion = Rc<dyn Fn(&Object, ErasedValue) -> Result<ErasedValue, PropertyError>>;
/// Computes the value of an unset property on first read.
pub type DefaultFactory = Rc<dyn Fn(&Object) -> ErasedValue>;

/// A type a property value must be an instance of.
#[derive(Clone)]
pub enum RequiredType {
    /// An [`Object`] of this class.
    Class(Class),
    /// A plain Rust value of this type.
    Value {
        /// The accepted type.
        type_id: TypeId,
        /// Its name, for diagnostics.
        name: &'static str,
    },
}

impl RequiredType {
    /// Requires plain values of type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self::Value {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Returns `true` if `value` satisfies this requirement.
    #[must_use]
    pub fn accepts(&self, value: &ErasedValue) -> bool {
        match self {
            Self::Class(class) => value
                .downcast_ref::<Object>()
                .is_some_and(|obj| obj.class().ptr_eq(class)),
            Self::Value { type_id, .. } => value.type_id() == *type_id,
        }
    }

    fn describe(&self) -> &str {
        match self {
            Self::Class(class) => class.name().as_str(),
            Self::Value { name, .. } => name,
        }
    }
}

impl From<&Class> for RequiredType {
    fn from(class: &Class) -> Self {
        Self::Class(class.clone())
    }
}

impl fmt::Debug for RequiredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(class.name()).finish(),
            Self::Value { name, .. } => f.debug_tuple("Value").field(name).finish(),
        }
    }
}

/// Type description of a stored value: class name for objects, Rust type
/// name otherwise.
pub(crate) fn describe_value(value: &ErasedValue) -> String {
    match value.downcast_ref::<Object>() {
        Some(obj) => String::from(obj.class().name().as_str()),
        None => String::from(value.type_name()),
    }
}

#[derive(Debug)]
struct Binding {
    class: Symbol,
    name: Symbol,
    key: StoreKey,
}

struct Core {
    binding: OnceCell<Binding>,
    required: SmallVec<[RequiredType; 1]>,
    coerce: Option<Coercion>,
    default: Option<DefaultFactory>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    deleter: Option<Deleter>,
}

/// A typed, validated attribute descriptor.
///
/// A property is declared once, bound to one attribute of one [`Class`], and
/// then read and written explicitly on instances of that class:
///
/// - `get` returns the stored value, computing and storing the default on
///   first read if there is one;
/// - `set` checks the required types, applies the coercion, then stores;
/// - `delete` clears the stored value.
///
/// Any of the three can be replaced by an override in [`PropertyBuilder`].
///
/// # Example
///
/// ```rust
/// use understory_property::{Class, ErasedValue, PropertyBuilder, PropertyError};
///
/// let point = Class::new("Point");
/// let x = PropertyBuilder::new()
///     .instance_of_type::<f64>()
///     .default_value(0.0_f64)
///     .build();
/// point.define("x", &x).unwrap();
///
/// let p = point.instantiate();
/// assert_eq!(x.get(&p).unwrap().downcast::<f64>(), Some(0.0));
///
/// x.set(&p, ErasedValue::new(2.5_f64)).unwrap();
/// assert_eq!(x.get(&p).unwrap().downcast::<f64>(), Some(2.5));
///
/// let err = x.set(&p, ErasedValue::new("nope")).unwrap_err();
/// assert!(matches!(err, PropertyError::TypeMismatch { .. }));
/// ```
#[derive(Clone)]
pub struct ValidatedProperty(Rc<Core>);

impl ValidatedProperty {
    /// Starts declaring a property.
    #[must_use]
    pub fn builder() -> PropertyBuilder {
        PropertyBuilder::new()
    }

    /// The attribute name this property is bound as.
    #[must_use]
    pub fn name(&self) -> Option<&Symbol> {
        self.0.binding.get().map(|b| &b.name)
    }

    /// The storage key, once bound.
    #[must_use]
    pub fn store_key(&self) -> Option<&StoreKey> {
        self.0.binding.get().map(|b| &b.key)
    }

    /// Returns `true` once the property is bound to a class attribute.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.0.binding.get().is_some()
    }

    /// The accepted value types; empty when any value is accepted.
    #[must_use]
    pub fn required(&self) -> &[RequiredType] {
        &self.0.required
    }

    /// Returns `true` if both handles refer to the same declaration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn bind(&self, class: &Class, name: &Symbol) -> Result<(), PropertyError> {
        let binding = Binding {
            class: class.name().clone(),
            name: name.clone(),
            key: StoreKey::for_property(name.as_str()),
        };
        self.0.binding.set(binding).map_err(|_| {
            let existing = self.0.binding.get();
            PropertyError::AlreadyBound {
                class: existing.map_or_else(|| class.name().clone(), |b| b.class.clone()),
                name: existing.map_or_else(|| name.clone(), |b| b.name.clone()),
            }
        })?;
        tracing::trace!(class = %class.name(), property = %name, "bound property");
        Ok(())
    }

    fn binding(&self) -> Result<&Binding, PropertyError> {
        self.0.binding.get().ok_or_else(|| {
            PropertyError::Configuration(String::from(
                "property is not bound to a class attribute",
            ))
        })
    }

    /// Name used in diagnostics; unbound properties show as `*`.
    pub(crate) fn label(&self) -> Symbol {
        self.name().cloned().unwrap_or_else(|| Symbol::new("*"))
    }

    /// Reads the value on `obj`.
    ///
    /// Fails with [`PropertyError::AttributeNotSet`] if nothing is stored and
    /// there is no default.
    pub fn get(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        match &self.0.getter {
            Some(getter) => getter(obj),
            None => self.get_stored(obj),
        }
    }

    fn get_stored(&self, obj: &Object) -> Result<ErasedValue, PropertyError> {
        let binding = self.binding()?;
        if let Some(value) = obj.stored(&binding.key) {
            return Ok(value);
        }
        let Some(default) = &self.0.default else {
            return Err(PropertyError::not_set(&binding.name));
        };
        let value = default(obj);
        obj.store_value(binding.key.clone(), value.clone());
        Ok(value)
    }

    /// Validates, coerces and stores `value` on `obj`.
    pub fn set(&self, obj: &Object, value: ErasedValue) -> Result<(), PropertyError> {
        self.assign(obj, value).map(drop)
    }

    /// Like [`set`](Self::set), returning the value handed to storage.
    pub(crate) fn assign(&self, obj: &Object, value: ErasedValue) -> Result<ErasedValue, PropertyError> {
        self.check_type(&value)?;
        let value = match &self.0.coerce {
            Some(coerce) => coerce(obj, value)?,
            None => value,
        };
        match &self.0.setter {
            Some(setter) => setter(obj, value.clone())?,
            None => {
                let key = self.binding()?.key.clone();
                obj.store_value(key, value.clone());
            }
        }
        Ok(value)
    }

    fn check_type(&self, value: &ErasedValue) -> Result<(), PropertyError> {
        let required = &self.0.required;
        if required.is_empty() || required.iter().any(|r| r.accepts(value)) {
            return Ok(());
        }
        let expected: Vec<&str> = required.iter().map(RequiredType::describe).collect();
        Err(PropertyError::TypeMismatch {
            name: self.label(),
            expected: expected.join(" or "),
            found: describe_value(value),
        })
    }

    /// Clears the value on `obj`; later reads behave as if it was never set.
    pub fn delete(&self, obj: &Object) -> Result<(), PropertyError> {
        if let Some(deleter) = &self.0.deleter {
            return deleter(obj);
        }
        let binding = self.binding()?;
        obj.clear_stored(&binding.key)
            .map(drop)
            .ok_or_else(|| PropertyError::not_set(&binding.name))
    }

    /// Returns the single class this property's values must belong to.
    pub(crate) fn required_class(&self) -> Result<&Class, PropertyError> {
        match self.0.required.as_slice() {
            [RequiredType::Class(class)] => Ok(class),
            _ => Err(PropertyError::Configuration(format!(
                "cannot delegate through `{}`: it is not constrained to a single class",
                self.label()
            ))),
        }
    }

    /// Builds a [`Delegate`] reaching attribute `attr` of this property's value.
    ///
    /// Fails with [`PropertyError::Configuration`] unless the property requires
    /// exactly one class, and that class declares `attr`.
    pub fn delegates_to(&self, attr: &str) -> Result<Delegate, PropertyError> {
        Delegate::through(Hop::Validated(self.clone()), self.required_class()?, attr)
    }
}

impl PartialEq for ValidatedProperty {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ValidatedProperty {}

impl fmt::Debug for ValidatedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = &*self.0;
        f.debug_struct("ValidatedProperty")
            .field("binding", &core.binding.get())
            .field("required", &core.required)
            .field("coerce", &core.coerce.is_some())
            .field("default", &core.default.is_some())
            .field("getter", &core.getter.is_some())
            .field("setter", &core.setter.is_some())
            .field("deleter", &core.deleter.is_some())
            .finish()
    }
}

/// Builder for [`ValidatedProperty`] and [`ReactiveProperty`] declarations.
///
/// # Example
///
/// ```rust
/// use understory_property::{Class, ErasedValue, PropertyBuilder, PropertyError};
///
/// let int = PropertyBuilder::new()
///     .coerce(|_, value| match value.downcast_ref::<&str>() {
///         Some(text) => text
///             .parse::<i64>()
///             .map(ErasedValue::new)
///             .map_err(|e| PropertyError::coercion("n", e)),
///         None => Ok(value),
///     })
///     .build();
/// let holder = Class::new("Holder");
/// holder.define("n", &int).unwrap();
///
/// let h = holder.instantiate();
/// int.set(&h, ErasedValue::new("1")).unwrap();
/// assert_eq!(int.get(&h).unwrap().downcast::<i64>(), Some(1));
/// ```
#[derive(Default)]
pub struct PropertyBuilder {
    required: SmallVec<[RequiredType; 1]>,
    coerce: Option<Coercion>,
    default: Option<DefaultFactory>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    deleter: Option<Deleter>,
}

impl PropertyBuilder {
    /// Starts an unconstrained declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts incoming values with `coerce` before storing them.
    ///
    /// The required-type check runs first, on the value as given.
    #[must_use]
    pub fn coerce(
        mut self,
        coerce: impl Fn(&Object, ErasedValue) -> Result<ErasedValue, PropertyError> + 'static,
    ) -> Self {
        self.coerce = Some(Rc::new(coerce));
        self
    }

    /// Accepts objects of `class`. May be repeated to accept several types.
    #[must_use]
    pub fn instance_of(mut self, class: &Class) -> Self {
        self.required.push(RequiredType::from(class));
        self
    }

    /// Accepts plain values of type `T`. May be repeated.
    #[must_use]
    pub fn instance_of_type<T: 'static>(mut self) -> Self {
        self.required.push(RequiredType::of::<T>());
        self
    }

    /// Computes the value of an unset property on first read.
    #[must_use]
    pub fn default_with(mut self, default: impl Fn(&Object) -> ErasedValue + 'static) -> Self {
        self.default = Some(Rc::new(default));
        self
    }

    /// Uses a clone of `value` for unset properties.
    #[must_use]
    pub fn default_value<T: Clone + 'static>(self, value: T) -> Self {
        self.default_with(move |_| ErasedValue::new(value.clone()))
    }

    /// Replaces the storage read.
    #[must_use]
    pub fn getter(
        mut self,
        getter: impl Fn(&Object) -> Result<ErasedValue, PropertyError> + 'static,
    ) -> Self {
        self.getter = Some(Rc::new(getter));
        self
    }

    /// Replaces the storage write. Type checks and coercion still apply.
    #[must_use]
    pub fn setter(
        mut self,
        setter: impl Fn(&Object, ErasedValue) -> Result<(), PropertyError> + 'static,
    ) -> Self {
        self.setter = Some(Rc::new(setter));
        self
    }

    /// Replaces the storage clear.
    #[must_use]
    pub fn deleter(mut self, deleter: impl Fn(&Object) -> Result<(), PropertyError> + 'static) -> Self {
        self.deleter = Some(Rc::new(deleter));
        self
    }

    /// Finishes a plain validated property.
    #[must_use]
    pub fn build(self) -> ValidatedProperty {
        ValidatedProperty(Rc::new(Core {
            binding: OnceCell::new(),
            required: self.required,
            coerce: self.coerce,
            default: self.default,
            getter: self.getter,
            setter: self.setter,
            deleter: self.deleter,
        }))
    }

    /// Finishes a property that emits `changed` and `error` events.
    #[must_use]
    pub fn build_reactive(self) -> ReactiveProperty {
        ReactiveProperty::new(self.build())
    }
}

impl fmt::Debug for PropertyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBuilder")
            .field("required", &self.required)
            .field("coerce", &self.coerce.is_some())
            .field("default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

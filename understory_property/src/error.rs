// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property errors.

use alloc::rc::Rc;
use alloc::string::String;

use understory_event_hub::{HubError, SharedError, Symbol};

/// Errors produced by property access.
///
/// Errors are cheap to clone: reactive properties report a failed write both
/// through an `error` event and to the caller, and both see the same value.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PropertyError {
    /// The attribute has no stored value and no default.
    #[error("attribute `{name}` is not set")]
    AttributeNotSet {
        /// Name of the attribute.
        name: Symbol,
    },
    /// The value is not an instance of any required type.
    #[error("`{name}` requires {expected}, got `{found}`")]
    TypeMismatch {
        /// Name of the attribute.
        name: Symbol,
        /// Human readable list of accepted types.
        expected: String,
        /// Type of the rejected value.
        found: String,
    },
    /// The coercion function rejected the value.
    #[error("cannot coerce value for `{name}`: {cause}")]
    CoercionFailure {
        /// Name of the attribute.
        name: Symbol,
        /// The underlying failure.
        cause: SharedError,
    },
    /// The property is already bound to a class attribute.
    #[error("property is already bound to `{class}.{name}`")]
    AlreadyBound {
        /// Class the property is bound to.
        class: Symbol,
        /// Attribute name the property is bound as.
        name: Symbol,
    },
    /// The declaration cannot support the requested operation.
    #[error("{0}")]
    Configuration(String),
    /// An intermediate delegate hop did not hold an object.
    #[error("`{name}` does not hold an object")]
    NotAnObject {
        /// Name of the hop.
        name: Symbol,
    },
    /// A getter, setter or deleter override failed.
    #[error("{0}")]
    Failed(SharedError),
    /// An event hub operation failed.
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl PropertyError {
    /// Wraps an override failure.
    pub fn failed(error: impl core::error::Error + 'static) -> Self {
        Self::Failed(Rc::new(error))
    }

    /// Builds a [`PropertyError::CoercionFailure`] for `name`.
    pub fn coercion(name: impl Into<Symbol>, error: impl core::error::Error + 'static) -> Self {
        Self::CoercionFailure {
            name: name.into(),
            cause: Rc::new(error),
        }
    }

    pub(crate) fn not_set(name: impl Into<Symbol>) -> Self {
        Self::AttributeNotSet { name: name.into() }
    }

    /// Returns `true` for [`PropertyError::AttributeNotSet`].
    #[must_use]
    pub fn is_not_set(&self) -> bool {
        matches!(self, Self::AttributeNotSet { .. })
    }
}

/// Lets listeners return property failures with `?`.
impl From<PropertyError> for HubError {
    fn from(error: PropertyError) -> Self {
        match error {
            PropertyError::Hub(inner) => inner,
            other => Self::Listener(Rc::new(other)),
        }
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical event targets.
//!
//! A [`Target`] is a flat, ordered path of [`Symbol`]s naming a listenable
//! channel, such as `["b", "t", "changed"]`. Bubbling builds longer paths by
//! prefixing the label of each traversed edge, so concatenation always yields a
//! flat path and never nests.
//!
//! The empty target is the wildcard: listeners registered under
//! [`Target::any`] see every event that reaches their hub.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use smallvec::SmallVec;

/// Inline capacity for target paths.
///
/// Reactive property events rarely nest deeper than a few owners.
const INLINE_SYMBOLS: usize = 4;

/// An opaque, cheaply cloned identifier used as one step of a [`Target`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Creates a symbol from a name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    /// Returns the symbol's name.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Rc::from(name))
    }
}

impl From<&Symbol> for Symbol {
    fn from(symbol: &Symbol) -> Self {
        symbol.clone()
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, ordered path of symbols naming an event channel.
///
/// # Example
///
/// ```rust
/// use understory_event_hub::Target;
///
/// let label = Target::from("b");
/// let nested = label.concat(&Target::from(["t", "changed"]));
/// assert_eq!(nested, Target::from(["b", "t", "changed"]));
/// assert_eq!(nested.len(), 3);
///
/// assert!(Target::any().is_any());
/// assert_eq!(Target::any().concat(&nested), nested);
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Target(SmallVec<[Symbol; INLINE_SYMBOLS]>);

impl Target {
    /// Returns the wildcard target.
    #[must_use]
    #[inline]
    pub fn any() -> Self {
        Self(SmallVec::new())
    }

    /// Returns `true` for the wildcard (empty) target.
    #[must_use]
    #[inline]
    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of symbols in the path.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no symbols.
    ///
    /// Same as [`is_any`](Self::is_any).
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the symbols of the path, outermost first.
    #[must_use]
    #[inline]
    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    /// Returns `self` followed by `other` as a new flat target.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut symbols = self.0.clone();
        symbols.extend(other.0.iter().cloned());
        Self(symbols)
    }

    /// Returns a copy of `self` with one more symbol appended.
    #[must_use]
    pub fn with(&self, symbol: impl Into<Symbol>) -> Self {
        let mut symbols = self.0.clone();
        symbols.push(symbol.into());
        Self(symbols)
    }

    /// Returns `true` if `prefix` is a leading part of this path.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Symbol> for Target {
    fn from(symbol: Symbol) -> Self {
        let mut symbols = SmallVec::new();
        symbols.push(symbol);
        Self(symbols)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::from(Symbol::new(name))
    }
}

impl From<&Target> for Target {
    fn from(target: &Target) -> Self {
        target.clone()
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().map(Symbol::new).collect()
    }
}

impl FromIterator<Symbol> for Target {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("*");
        }
        for (i, symbol) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(symbol.as_str())?;
        }
        Ok(())
    }
}

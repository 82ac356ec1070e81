// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object slot storage.
//!
//! This module provides [`PropertyStore`], the hidden storage behind every
//! [`Object`](crate::Object). Declared properties store under a key derived
//! from their attribute name (`_name_`); plain, undeclared attributes store
//! under their own name. Keys depend only on names, so re-declaring the same
//! class reproduces the same layout.
//!
//! # Implementation
//!
//! As elsewhere in Understory, storage is a sorted `SmallVec` searched with
//! binary search rather than a hash map: objects carry few attributes, and
//! contiguous inline storage keeps lookups cheap.

use understory_event_hub::{ErasedValue, Symbol};

use alloc::format;
use smallvec::SmallVec;

/// Default inline capacity for stored entries.
const INLINE_CAPACITY: usize = 8;

/// Name-derived key of one storage slot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey(Symbol);

impl StoreKey {
    /// Key used by a property declared as `name`.
    #[must_use]
    pub fn for_property(name: &str) -> Self {
        Self(Symbol::from(format!("_{name}_")))
    }

    /// Key used by a plain attribute called `name`.
    #[must_use]
    pub fn plain(name: &str) -> Self {
        Self(Symbol::new(name))
    }

    /// Returns the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Sparse per-object storage for attribute values.
///
/// # Example
///
/// ```rust
/// use understory_property::{ErasedValue, PropertyStore, StoreKey};
///
/// let mut store = PropertyStore::new();
/// let key = StoreKey::for_property("width");
/// assert_eq!(key.as_str(), "_width_");
///
/// assert!(store.get(&key).is_none());
/// store.set(key.clone(), ErasedValue::new(100.0_f64));
/// assert_eq!(store.get(&key).and_then(|v| v.downcast_ref::<f64>()), Some(&100.0));
///
/// assert!(store.remove(&key).is_some());
/// assert!(store.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    /// Entries sorted by key for binary search lookup.
    entries: SmallVec<[(StoreKey, ErasedValue); INLINE_CAPACITY]>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over stored keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &StoreKey> + '_ {
        self.entries.iter().map(|(key, _)| key)
    }

    #[inline]
    fn find(&self, key: &StoreKey) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Returns `true` if `key` holds a value.
    #[must_use]
    pub fn contains(&self, key: &StoreKey) -> bool {
        self.find(key).is_ok()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &StoreKey) -> Option<&ErasedValue> {
        self.find(key).ok().map(|i| &self.entries[i].1)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn set(&mut self, key: StoreKey, value: ErasedValue) -> Option<ErasedValue> {
        match self.find(&key) {
            Ok(i) => Some(core::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    /// Clears `key`, returning the value it held.
    pub fn remove(&mut self, key: &StoreKey) -> Option<ErasedValue> {
        self.find(key).ok().map(|i| self.entries.remove(i).1)
    }
}

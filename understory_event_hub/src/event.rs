// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events and their metadata.

use core::fmt;

use smallvec::SmallVec;

use crate::hubs::HubId;
use crate::listener::Interceptor;
use crate::target::Target;
use crate::value::ErasedValue;

/// An event travelling through the hub graph.
///
/// The shape is fixed once built: origin hub, target path, optional dispatcher
/// override and metadata. Only the stop flag changes during dispatch. Once it
/// is set, no further listener of the current trigger runs and the event does
/// not bubble any further.
///
/// Two events are the same occurrence for deduplication purposes when they
/// have the same origin hub and target.
#[derive(Clone)]
pub struct Event {
    hub: HubId,
    target: Target,
    stop: bool,
    dispatcher: Option<Interceptor>,
    metadata: Metadata,
}

impl Event {
    /// Creates an event that will be triggered on `hub` under `target`.
    #[must_use]
    pub fn new(hub: HubId, target: impl Into<Target>) -> Self {
        Self {
            hub,
            target: target.into(),
            stop: false,
            dispatcher: None,
            metadata: Metadata::default(),
        }
    }

    /// Routes every listener call for this event through `dispatcher`.
    ///
    /// A per-event dispatcher outranks every interceptor scope.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Interceptor) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &'static str, value: ErasedValue) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// The hub this event is being dispatched on.
    ///
    /// For a bubbled event this is the upstream hub, not the hub the event
    /// originally fired on.
    #[must_use]
    #[inline]
    pub fn hub(&self) -> HubId {
        self.hub
    }

    /// The target path as seen by the current hub.
    #[must_use]
    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Returns `true` once a listener or interceptor stopped the event.
    #[must_use]
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    /// Stops the event.
    #[inline]
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// The per-event dispatcher override, if any.
    #[must_use]
    pub fn dispatcher(&self) -> Option<&Interceptor> {
        self.dispatcher.as_ref()
    }

    /// All metadata entries.
    #[must_use]
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Borrows the metadata entry `key` as `T`.
    #[must_use]
    pub fn meta<T: 'static>(&self, key: &str) -> Option<&T> {
        self.metadata.get(key)?.downcast_ref()
    }

    /// Builds the event seen by an upstream hub across an edge labelled `label`.
    pub(crate) fn bubbled(&self, upstream: HubId, label: &Target) -> Self {
        Self {
            hub: upstream,
            target: label.concat(&self.target),
            stop: false,
            dispatcher: self.dispatcher.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("hub", &self.hub)
            .field("target", &self.target)
            .field("stop", &self.stop)
            .field("dispatcher", &self.dispatcher.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Ordered key/value metadata attached to an [`Event`].
#[derive(Clone, Default)]
pub struct Metadata {
    entries: SmallVec<[(&'static str, ErasedValue); 2]>,
}

impl Metadata {
    /// Inserts or replaces the entry for `key`.
    pub fn insert(&mut self, key: &'static str, value: ErasedValue) {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries[pos].1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ErasedValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ErasedValue)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.type_name())))
            .finish()
    }
}

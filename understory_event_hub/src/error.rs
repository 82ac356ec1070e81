// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by hubs and the listeners they call.

use alloc::rc::Rc;

use crate::hubs::HubId;
use crate::target::Target;

/// A shared, cloneable handle to an arbitrary error.
///
/// Failures are reported twice, once through event metadata and once to the
/// caller, so the underlying error is reference counted rather than boxed.
pub type SharedError = Rc<dyn core::error::Error>;

/// Errors produced by event hub operations.
#[derive(Clone, Debug, thiserror::Error)]
pub enum HubError {
    /// The object has no hub yet.
    #[error("object has no event hub")]
    NotInitialized,
    /// The handle refers to a hub whose owner has been dropped.
    #[error("event hub {0:?} no longer resolves")]
    Stale(HubId),
    /// Connecting the two hubs would make the upstream graph cyclic.
    ///
    /// The graph is left exactly as it was.
    #[error("connecting {upstream:?} upstream of {downstream:?} as `{label}` would create a cycle")]
    Cycle {
        /// The hub that would have become upstream.
        upstream: HubId,
        /// The hub that would have gained the edge.
        downstream: HubId,
        /// The label of the rejected edge.
        label: Target,
    },
    /// A listener or interceptor failed.
    #[error("listener failed: {0}")]
    Listener(SharedError),
}

impl HubError {
    /// Wraps a listener failure.
    pub fn listener(error: impl core::error::Error + 'static) -> Self {
        Self::Listener(Rc::new(error))
    }

    /// Returns `true` for [`HubError::Cycle`].
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}

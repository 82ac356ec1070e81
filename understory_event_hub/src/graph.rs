// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Labelled upstream edges between hubs.
//!
//! Each hub records the hubs it bubbles to, with one or more labels per
//! upstream hub. The induced graph is kept acyclic: [`Hubs::connect`] checks
//! reachability before touching any edge and rejects the edit as a whole.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashSet;
use smallvec::smallvec;

use crate::error::HubError;
use crate::hubs::{HubId, Hubs, Upstream};
use crate::target::Target;

impl Hubs {
    /// Makes `upstream` receive the events of `downstream`, prefixed by `label`.
    ///
    /// Returns `Ok(true)` if the edge is new and `Ok(false)` if that exact
    /// labelled edge already existed.
    ///
    /// # Errors
    ///
    /// - [`HubError::Stale`] if either handle no longer resolves.
    /// - [`HubError::Cycle`] if `downstream` is already reachable walking
    ///   upstream from `upstream` (including `upstream == downstream`). The
    ///   graph is not modified.
    pub fn connect(
        &mut self,
        upstream: HubId,
        downstream: HubId,
        label: impl Into<Target>,
    ) -> Result<bool, HubError> {
        let label = label.into();
        self.require(upstream)?;
        self.require(downstream)?;
        if self.is_connected(downstream, upstream) {
            tracing::debug!(
                upstream = ?upstream,
                downstream = ?downstream,
                %label,
                "rejected connection that would create a cycle"
            );
            return Err(HubError::Cycle {
                upstream,
                downstream,
                label,
            });
        }
        let hub = self.require_mut(downstream)?;
        if let Some(pos) = hub.upstream.iter().position(|edge| edge.hub == upstream) {
            let labels = &mut hub.upstream[pos].labels;
            if labels.contains(&label) {
                return Ok(false);
            }
            labels.push(label);
        } else {
            hub.upstream.push(Upstream {
                hub: upstream,
                labels: smallvec![label],
            });
        }
        Ok(true)
    }

    /// Removes the `label` edge from `downstream` to `upstream`.
    ///
    /// Returns `true` if the edge existed. Missing edges and dead hubs are
    /// not an error.
    pub fn disconnect(&mut self, upstream: HubId, downstream: HubId, label: impl Into<Target>) -> bool {
        let label = label.into();
        let Some(hub) = self.hub_mut(downstream) else {
            return false;
        };
        let Some(pos) = hub.upstream.iter().position(|edge| edge.hub == upstream) else {
            return false;
        };
        let labels = &mut hub.upstream[pos].labels;
        let Some(at) = labels.iter().position(|l| *l == label) else {
            return false;
        };
        labels.remove(at);
        if labels.is_empty() {
            hub.upstream.remove(pos);
        }
        true
    }

    /// Returns `true` if events of `downstream` reach `upstream` by bubbling.
    ///
    /// Every hub is connected to itself.
    #[must_use]
    pub fn is_connected(&self, upstream: HubId, downstream: HubId) -> bool {
        if upstream == downstream {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![downstream];
        while let Some(current) = stack.pop() {
            if current == upstream {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(hub) = self.hub(current) {
                stack.extend(hub.upstream.iter().map(|edge| edge.hub));
            }
        }
        false
    }

    /// Returns `true` if `downstream` bubbles to `upstream` under `label`.
    #[must_use]
    pub fn has_edge(&self, upstream: HubId, downstream: HubId, label: impl Into<Target>) -> bool {
        let label = label.into();
        self.hub(downstream).is_some_and(|hub| {
            hub.upstream
                .iter()
                .any(|edge| edge.hub == upstream && edge.labels.contains(&label))
        })
    }

    /// Lists the live upstream edges of `hub` as `(upstream, label)` pairs in
    /// bubbling order.
    #[must_use]
    pub fn upstream_edges(&self, hub: HubId) -> Vec<(HubId, Target)> {
        let Some(hub) = self.hub(hub) else {
            return Vec::new();
        };
        hub.upstream
            .iter()
            .filter(|edge| self.is_alive(edge.hub))
            .flat_map(|edge| edge.labels.iter().map(|label| (edge.hub, label.clone())))
            .collect()
    }

    /// Forgets upstream edges whose hub no longer resolves.
    pub(crate) fn prune_upstream(&mut self, id: HubId) {
        let Some(hub) = self.hub(id) else {
            return;
        };
        let dead: Vec<HubId> = hub
            .upstream
            .iter()
            .map(|edge| edge.hub)
            .filter(|up| !self.is_alive(*up))
            .collect();
        if dead.is_empty() {
            return;
        }
        if let Some(hub) = self.hub_mut(id) {
            hub.upstream.retain(|edge| !dead.contains(&edge.hub));
            tracing::trace!(hub = ?id, pruned = dead.len(), "pruned dead upstream edges");
        }
    }
}

//! Per-resource access bookkeeping for the region walk

use std::collections::BTreeMap;

use region_ir::OpId;

use crate::graph::RawPredecessors;
use crate::resource_alias::ResourceId;

/// Access state tracked for one resource id while a region is analyzed.
#[derive(Debug, Clone, Default)]
struct PerResourceAccessInfo {
    /// The most recent write to this resource, in program order.
    last_write: Option<OpId>,
    /// Reads since `last_write`, cleared on every write.
    reads_since_last_write: Vec<OpId>,
    /// A later read of this resource already carries a dependency on the
    /// most recent unknown-resource write, so a fresh edge from the unknown
    /// barrier would be redundant.
    tracked_last_unknown_write_for_read: bool,
    /// Same, for a later write of this resource.
    tracked_last_unknown_write_for_write: bool,
    /// A later write of this resource already carries a dependency on the
    /// most recent unknown-resource read.
    tracked_last_unknown_read: bool,
}

/// Tracks, per resource id, the accesses seen so far in one region walk.
///
/// One tracker instance is scoped to one region; nested regions get their
/// own.
#[derive(Debug, Default)]
pub(crate) struct ResourceAccessTracker {
    per_resource: BTreeMap<ResourceId, PerResourceAccessInfo>,
}

impl ResourceAccessTracker {
    /// Records `op`'s access to `resource`.
    pub fn track_access(&mut self, resource: ResourceId, op: OpId, read_only: bool) {
        if resource.is_unknown() {
            if read_only {
                // A fresh unknown read is not yet covered by any tracked
                // resource's bookkeeping.
                for info in self.per_resource.values_mut() {
                    info.tracked_last_unknown_read = false;
                }
            } else {
                // An unknown write is a full barrier; nothing tracked
                // before it can be assumed independent of it.
                self.per_resource.clear();
            }
        }
        let info = self.per_resource.entry(resource).or_default();
        if read_only {
            info.reads_since_last_write.push(op);
            // This read carries the dependency on the last unknown write,
            // so a later write to this resource need not re-link to it. A
            // later read still must, because two reads may be reordered.
            info.tracked_last_unknown_write_for_write = true;
        } else {
            info.tracked_last_unknown_write_for_read = true;
            info.tracked_last_unknown_write_for_write = true;
            info.tracked_last_unknown_read = true;
            info.last_write = Some(op);
            info.reads_since_last_write.clear();
        }
    }

    /// Adds predecessors of `op` arising from earlier accesses to
    /// `resource` into `preds`. No-op when the resource has never been
    /// seen.
    pub fn add_predecessors_for_access(
        &self,
        resource: ResourceId,
        op: OpId,
        read_only: bool,
        preds: &mut RawPredecessors,
    ) {
        let Some(info) = self.per_resource.get(&resource) else {
            return;
        };
        let mut read_tracked = false;
        if !read_only && !info.reads_since_last_write.is_empty() {
            preds
                .entry(op)
                .or_default()
                .extend(info.reads_since_last_write.iter().copied());
            read_tracked = true;
        }
        // A write-after-read edge subsumes the write-after-write edge from
        // the same resource: the pending reads already follow the last
        // write.
        if let Some(last_write) = info.last_write {
            if !read_tracked {
                preds.entry(op).or_default().insert(last_write);
            }
        }
    }

    /// Whether an access to `resource` can skip edges from previous
    /// accesses to unknown resources, because earlier accesses to
    /// `resource` already indirectly tracked them. `read_only` is the
    /// access type of the op under consideration.
    pub fn unknown_access_indirectly_tracked(&self, resource: ResourceId, read_only: bool) -> bool {
        let Some(info) = self.per_resource.get(&resource) else {
            return false;
        };
        let no_unknown_read = self
            .per_resource
            .get(&ResourceId::UNKNOWN)
            .map_or(true, |unknown| unknown.reads_since_last_write.is_empty());
        if read_only {
            info.tracked_last_unknown_write_for_read
        } else {
            info.tracked_last_unknown_write_for_write
                && (info.tracked_last_unknown_read || no_unknown_read)
        }
    }

    /// Resource ids with tracked state, the unknown sentinel excluded.
    pub fn tracked_resources(&self) -> Vec<ResourceId> {
        self.per_resource
            .keys()
            .copied()
            .filter(|resource| !resource.is_unknown())
            .collect()
    }
}

//! Mutation watcher - main entry point
//!
//! Owns the identity registry and drives the other components: a full
//! snapshot populates the mirror structure and arms notification delivery;
//! each change drain consumes every queued notification, deduplicates
//! changed parents, and runs the diff engine once per distinct parent.
//!
//! Exactly one watcher per tree. Two watchers over overlapping trees would
//! corrupt each other's identity assignment; the `&mut` receivers make the
//! single-writer rule a compile-time fact within one watcher.

use crate::diff;
use crate::error::{MirrorError, Result};
use crate::mirror::NodeMirror;
use crate::serializer;
use crate::tree::LiveTree;
use crate::types::{ChangeSet, LiveNodeId, MutationKind, SerializedNode};
use ahash::AHashSet;
use log::{debug, trace};

/// Watches one live tree, keeping a mirror of it in sync through coarse
/// mutation notifications.
#[derive(Debug, Default)]
pub struct MutationWatcher {
    mirror: NodeMirror,
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self {
            mirror: NodeMirror::new(),
        }
    }

    /// Take a full-tree snapshot and arm notification delivery.
    ///
    /// Delivery is armed only after the snapshot succeeds, so the mirror
    /// starts consistent with the live tree and no notification can slip in
    /// between.
    pub fn snapshot(&mut self, tree: &mut LiveTree) -> Result<SerializedNode> {
        let root = tree.root();
        let (record, root_id) = serializer::serialize(tree, &mut self.mirror, root)?;
        tree.observe();
        debug!(
            "snapshot complete: root mirror {}, {} nodes registered",
            root_id,
            self.mirror.len()
        );
        Ok(record)
    }

    /// Drain every queued mutation notification and re-derive structural
    /// changes per affected parent.
    ///
    /// `attributes` and `characterData` notifications are consumed but
    /// currently produce no output (reserved categories). Notifications for
    /// nodes the mirror has never seen are skipped.
    pub fn get_changes(&mut self, tree: &mut LiveTree) -> Result<ChangeSet> {
        let mut changes = ChangeSet::default();
        if tree.pending_records() == 0 {
            return Ok(changes);
        }

        let records = tree.take_records();
        debug!("draining {} mutation records", records.len());

        // Distinct changed parents, keyed by identity, first-arrival order.
        let mut seen = AHashSet::new();
        let mut targets: Vec<LiveNodeId> = Vec::new();
        for record in records {
            match record.kind {
                MutationKind::ChildList => match self.mirror.id_of(record.target) {
                    Some(id) => {
                        if seen.insert(id) {
                            targets.push(record.target);
                        }
                    }
                    None => {
                        trace!("skipping childList record for untracked node {}", record.target);
                    }
                },
                // Reserved categories: consumed, no output yet.
                MutationKind::Attributes | MutationKind::CharacterData => {}
            }
        }

        for target in targets {
            // Re-resolve rather than trust the collected id: a prior target's
            // reconciliation may have rearranged the mirror.
            let parent_mirror = self.mirror.id_of(target).ok_or_else(|| {
                MirrorError::OutOfSync(format!("changed node {target} lost its mirror mid-batch"))
            })?;

            // Intents are derived read-only before anything mutates, so a
            // fault here leaves earlier targets' applied state intact.
            let intents = diff::reconcile(tree, &self.mirror, parent_mirror, target)?;
            trace!(
                "reconciled parent mirror {}: {} edits",
                parent_mirror,
                intents.len()
            );
            diff::apply(tree, &mut self.mirror, parent_mirror, &intents, &mut changes)?;
        }

        Ok(changes)
    }

    /// Disarm notification delivery. Already-queued notifications survive and
    /// a later drain still processes them; mirror state is kept.
    pub fn disconnect(&mut self, tree: &mut LiveTree) {
        tree.disconnect();
    }

    /// Strip every identity reachable from the root and restart id
    /// assignment at 1.
    pub fn reset(&mut self, tree: &LiveTree) -> Result<()> {
        self.mirror.reset(tree, tree.root())
    }

    /// Read access to the registry, mainly for inspection and tests.
    pub fn mirror(&self) -> &NodeMirror {
        &self.mirror
    }
}

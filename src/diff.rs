//! List-diff engine
//!
//! Reconciles a parent's last-observed (mirror) child order against its
//! current live child order into an ordered edit script, then applies the
//! script to the mirror structure.
//!
//! The co-walk is tail-anchored: both cursors start at the last child and
//! move backward, exploiting the common case that a subtree's prefix is
//! untouched. No move detection is attempted; a relocated node surfaces as a
//! remove of its old position plus an insert at its new one.

use crate::error::{MirrorError, Result};
use crate::mirror::NodeMirror;
use crate::serializer;
use crate::tree::LiveTree;
use crate::types::{ChangeSet, InsertedNode, LiveNodeId, MirrorId, RemovedNode};

/// One step of an edit script, before materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditIntent {
    Insert(LiveNodeId),
    Remove(MirrorId),
}

/// Derive the edit script that turns `parent_mirror`'s recorded child order
/// into `parent_live`'s current one. Read-only; `apply` materializes it.
///
/// Intents come out in tail-to-head order and must be applied in that order:
/// an insert relies on the live node's next sibling already being mirrored.
pub fn reconcile(
    tree: &LiveTree,
    mirror: &NodeMirror,
    parent_mirror: MirrorId,
    parent_live: LiveNodeId,
) -> Result<Vec<EditIntent>> {
    let shadow = &mirror.get(parent_mirror)?.children;
    let live = tree.children(parent_live)?;

    let mut intents = Vec::new();
    let mut m = shadow.len();
    let mut l = live.len();

    while m > 0 && l > 0 {
        let mirror_id = shadow[m - 1];
        let live_id = live[l - 1];

        match mirror.id_of(live_id) {
            // Same identity at the same tail offset: unchanged.
            Some(id) if id == mirror_id => {
                m -= 1;
                l -= 1;
            }
            // The live node is known but something else occupies this mirror
            // slot: that slot's occupant is gone from this position.
            Some(_) => {
                intents.push(EditIntent::Remove(mirror_id));
                m -= 1;
            }
            // Never seen before: new node.
            None => {
                intents.push(EditIntent::Insert(live_id));
                l -= 1;
            }
        }
    }

    while m > 0 {
        intents.push(EditIntent::Remove(shadow[m - 1]));
        m -= 1;
    }
    while l > 0 {
        intents.push(EditIntent::Insert(live[l - 1]));
        l -= 1;
    }

    Ok(intents)
}

/// Materialize an edit script: mutate the mirror structure back into
/// agreement with the live tree and record the resulting change records.
pub fn apply(
    tree: &LiveTree,
    mirror: &mut NodeMirror,
    parent_mirror: MirrorId,
    intents: &[EditIntent],
    changes: &mut ChangeSet,
) -> Result<()> {
    for &intent in intents {
        match intent {
            EditIntent::Insert(live) => {
                let change = apply_insert(tree, mirror, parent_mirror, live)?;
                changes.added.push(change);
            }
            EditIntent::Remove(id) => {
                mirror.detach(id)?;
                changes.removed.push(RemovedNode { node_id: id });
            }
        }
    }
    Ok(())
}

fn apply_insert(
    tree: &LiveTree,
    mirror: &mut NodeMirror,
    parent_mirror: MirrorId,
    live: LiveNodeId,
) -> Result<InsertedNode> {
    // Dedup-safe: an already-mirrored node (a move) comes back as a cheap
    // Reference record.
    let (node_data, id) = serializer::serialize(tree, mirror, live)?;

    mirror.detach(id)?;
    mirror.get_mut(id)?.parent = Some(parent_mirror);

    let next_sibling_id = match tree.next_sibling(live)? {
        Some(next_live) => {
            // Tail-to-head apply order guarantees the tailward sibling is
            // mirrored by now; a miss means the shadow state is stale.
            let next_id = mirror.id_of(next_live).ok_or_else(|| {
                MirrorError::OutOfSync(format!(
                    "live node {next_live} has no mirror at insert time"
                ))
            })?;
            let parent_node = mirror.get_mut(parent_mirror)?;
            let pos = parent_node
                .children
                .iter()
                .position(|&child| child == next_id)
                .ok_or_else(|| {
                    MirrorError::OutOfSync(format!(
                        "mirror {next_id} is not a child of {parent_mirror}"
                    ))
                })?;
            parent_node.children.insert(pos, id);
            Some(next_id)
        }
        None => {
            mirror.get_mut(parent_mirror)?.children.push(id);
            None
        }
    };

    Ok(InsertedNode {
        node_data,
        parent_id: parent_mirror,
        next_sibling_id,
    })
}

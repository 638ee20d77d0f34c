//! Identity registry and shadow bookkeeping
//!
//! Every live node the serializer has seen gets exactly one `MirrorNode`,
//! keyed by a monotonically assigned id starting at 1. The registry is an
//! explicit side-table (live id -> mirror id -> record); nothing is attached
//! to the live nodes themselves.
//!
//! A mirror's `children` list is the last-observed sibling order of the live
//! node's children. The diff engine mutates it back into agreement after each
//! change drain.

use crate::error::{MirrorError, Result};
use crate::tree::LiveTree;
use crate::types::{LiveNodeId, MirrorId};
use ahash::AHashMap;
use smallvec::SmallVec;

/// Shadow bookkeeping record for one observed live node.
#[derive(Debug, Clone)]
pub struct MirrorNode {
    pub id: MirrorId,
    pub parent: Option<MirrorId>,
    /// Last-observed children in live document order. The tail is the most
    /// recently appended child.
    pub children: SmallVec<[MirrorId; 4]>,
}

/// The identity registry. One per watcher; owns all shadow state.
#[derive(Debug)]
pub struct NodeMirror {
    next_id: MirrorId,
    ids: AHashMap<LiveNodeId, MirrorId>,
    nodes: AHashMap<MirrorId, MirrorNode>,
}

impl NodeMirror {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ids: AHashMap::with_capacity(64),
            nodes: AHashMap::with_capacity(64),
        }
    }

    /// Non-allocating identity lookup.
    pub fn id_of(&self, live: LiveNodeId) -> Option<MirrorId> {
        self.ids.get(&live).copied()
    }

    /// Allocate the next id and a fresh mirror record for `live`.
    ///
    /// Precondition: `live` is not yet registered; callers check `id_of`
    /// first.
    pub fn create(&mut self, live: LiveNodeId) -> MirrorId {
        debug_assert!(!self.ids.contains_key(&live), "identity assigned twice");

        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(live, id);
        self.nodes.insert(
            id,
            MirrorNode {
                id,
                parent: None,
                children: SmallVec::new(),
            },
        );
        id
    }

    pub fn mirror_for(&self, live: LiveNodeId) -> Option<&MirrorNode> {
        self.id_of(live).and_then(|id| self.nodes.get(&id))
    }

    pub fn get(&self, id: MirrorId) -> Result<&MirrorNode> {
        self.nodes.get(&id).ok_or(MirrorError::NodeNotFound(id))
    }

    pub fn get_mut(&mut self, id: MirrorId) -> Result<&mut MirrorNode> {
        self.nodes.get_mut(&id).ok_or(MirrorError::NodeNotFound(id))
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Unlink a mirror from its parent's sibling list, wherever it sits
    /// (head, interior, or tail). No-op when it is not linked anywhere.
    pub fn detach(&mut self, id: MirrorId) -> Result<()> {
        let parent = self.get(id)?.parent;
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.retain(|child| *child != id);
            }
            self.get_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Strip every identity reachable from `root` (full depth-first walk,
    /// every sibling at every level) and restart id assignment at 1.
    ///
    /// Identities held by subtrees already detached from `root` are not
    /// reachable and survive the walk; id reuse after reset is a known hazard
    /// for callers that keep stale records around.
    pub fn reset(&mut self, tree: &LiveTree, root: LiveNodeId) -> Result<()> {
        let mut stack = vec![root];
        while let Some(live) = stack.pop() {
            if let Some(id) = self.ids.remove(&live) {
                self.nodes.remove(&id);
            }
            for &child in tree.children(live)? {
                stack.push(child);
            }
        }
        self.next_id = 1;
        Ok(())
    }
}

impl Default for NodeMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_are_unique() {
        let mut mirror = NodeMirror::new();
        let a = mirror.create(10);
        let b = mirror.create(20);
        let c = mirror.create(30);

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(c, 3);
        assert_eq!(mirror.id_of(20), Some(2));
        assert_eq!(mirror.id_of(99), None);
    }

    fn linked_family(mirror: &mut NodeMirror) -> (MirrorId, Vec<MirrorId>) {
        let parent = mirror.create(0);
        let children: Vec<MirrorId> = (1..=3).map(|live| mirror.create(live)).collect();
        for &child in &children {
            mirror.get_mut(child).unwrap().parent = Some(parent);
            mirror.get_mut(parent).unwrap().children.push(child);
        }
        (parent, children)
    }

    #[test]
    fn test_detach_interior() {
        let mut mirror = NodeMirror::new();
        let (parent, children) = linked_family(&mut mirror);

        mirror.detach(children[1]).unwrap();
        assert_eq!(
            mirror.get(parent).unwrap().children.as_slice(),
            &[children[0], children[2]]
        );
        assert_eq!(mirror.get(children[1]).unwrap().parent, None);
    }

    #[test]
    fn test_detach_head_and_tail() {
        let mut mirror = NodeMirror::new();
        let (parent, children) = linked_family(&mut mirror);

        mirror.detach(children[0]).unwrap();
        mirror.detach(children[2]).unwrap();
        assert_eq!(
            mirror.get(parent).unwrap().children.as_slice(),
            &[children[1]]
        );
    }

    #[test]
    fn test_detach_unlinked_is_noop() {
        let mut mirror = NodeMirror::new();
        let lone = mirror.create(5);
        mirror.detach(lone).unwrap();
        assert_eq!(mirror.get(lone).unwrap().parent, None);
    }

    #[test]
    fn test_reset_visits_every_sibling() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("a");
        let b = tree.new_element("b");
        let b1 = tree.new_text("x");
        let b2 = tree.new_text("y");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(b, b1).unwrap();
        tree.append_child(b, b2).unwrap();

        let mut mirror = NodeMirror::new();
        for live in [root, a, b, b1, b2] {
            mirror.create(live);
        }

        mirror.reset(&tree, root).unwrap();

        // Every node at every level was stripped, not just a first-child
        // chain.
        assert!(mirror.is_empty());
        for live in [root, a, b, b1, b2] {
            assert_eq!(mirror.id_of(live), None);
        }

        // Counting restarts at 1.
        assert_eq!(mirror.create(root), 1);
    }

    #[test]
    fn test_reset_skips_unreachable_subtrees() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let kept = tree.new_element("kept");
        let orphan = tree.new_element("orphan");
        tree.append_child(root, kept).unwrap();

        let mut mirror = NodeMirror::new();
        mirror.create(root);
        mirror.create(kept);
        let orphan_id = mirror.create(orphan);

        mirror.reset(&tree, root).unwrap();
        assert_eq!(mirror.id_of(orphan), Some(orphan_id));
    }
}

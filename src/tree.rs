//! Arena-backed live tree
//!
//! This is the host-side collaborator: the externally owned, mutable tree the
//! watcher observes. The watcher only ever reads it; all mutation goes through
//! the host API here, which doubles as the mutation-notification source.
//!
//! Design (same shape as an arena DOM):
//! - Single `Vec<LiveNode>` for sequential allocation, u32 indices as ids
//! - Ids are stable for the tree's lifetime; removal unlinks, never frees
//! - Notification delivery only appends to an in-memory queue; no computation
//!   happens on the delivery path

use crate::error::{MirrorError, Result};
use crate::types::{LiveNodeId, MutationKind, MutationRecord, NodeKind};
use smallvec::SmallVec;
use std::collections::{HashMap, VecDeque};

/// One node of the live tree.
#[derive(Debug, Clone)]
pub struct LiveNode {
    pub kind: NodeKind,
    /// Tag name for elements, doctype name for doctypes, empty otherwise.
    pub name: String,
    /// Text content for text and comment nodes.
    pub value: String,
    pub public_id: String,
    pub system_id: String,
    pub attributes: HashMap<String, String>,
    pub parent: Option<LiveNodeId>,
    pub children: SmallVec<[LiveNodeId; 4]>,
}

impl LiveNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            value: String::new(),
            public_id: String::new(),
            system_id: String::new(),
            attributes: HashMap::new(),
            parent: None,
            children: SmallVec::new(),
        }
    }
}

/// The live tree, owned and mutated by the host.
///
/// Construction always allocates a document root. Structural mutation emits a
/// coarse `childList` notification for the affected parent while observation
/// is armed; attribute and character-data mutation emit their own kinds.
#[derive(Debug)]
pub struct LiveTree {
    nodes: Vec<LiveNode>,
    root: LiveNodeId,
    armed: bool,
    records: VecDeque<MutationRecord>,
}

impl LiveTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(64),
            root: 0,
            armed: false,
            records: VecDeque::new(),
        };
        tree.root = tree.new_node(NodeKind::Document);
        tree
    }

    /// The document root, allocated at construction.
    pub fn root(&self) -> LiveNodeId {
        self.root
    }

    // -- construction ------------------------------------------------------

    /// Allocate a detached node of the given kind.
    pub fn new_node(&mut self, kind: NodeKind) -> LiveNodeId {
        let id = self.nodes.len() as LiveNodeId;
        self.nodes.push(LiveNode::new(kind));
        id
    }

    pub fn new_element(&mut self, tag: &str) -> LiveNodeId {
        let id = self.new_node(NodeKind::Element);
        self.nodes[id as usize].name = tag.to_string();
        id
    }

    pub fn new_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> LiveNodeId {
        let id = self.new_element(tag);
        let node = &mut self.nodes[id as usize];
        for (name, value) in attrs {
            node.attributes.insert(name.to_string(), value.to_string());
        }
        id
    }

    pub fn new_text(&mut self, text: &str) -> LiveNodeId {
        let id = self.new_node(NodeKind::Text);
        self.nodes[id as usize].value = text.to_string();
        id
    }

    pub fn new_comment(&mut self, text: &str) -> LiveNodeId {
        let id = self.new_node(NodeKind::Comment);
        self.nodes[id as usize].value = text.to_string();
        id
    }

    pub fn new_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> LiveNodeId {
        let id = self.new_node(NodeKind::DocumentType);
        let node = &mut self.nodes[id as usize];
        node.name = name.to_string();
        node.public_id = public_id.to_string();
        node.system_id = system_id.to_string();
        id
    }

    // -- navigation (the surface the watcher consumes) ---------------------

    pub fn get(&self, id: LiveNodeId) -> Result<&LiveNode> {
        self.nodes
            .get(id as usize)
            .ok_or(MirrorError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: LiveNodeId) -> Result<&mut LiveNode> {
        self.nodes
            .get_mut(id as usize)
            .ok_or(MirrorError::NodeNotFound(id))
    }

    pub fn kind(&self, id: LiveNodeId) -> Result<NodeKind> {
        Ok(self.get(id)?.kind)
    }

    pub fn parent(&self, id: LiveNodeId) -> Result<Option<LiveNodeId>> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: LiveNodeId) -> Result<&[LiveNodeId]> {
        Ok(&self.get(id)?.children)
    }

    pub fn first_child(&self, id: LiveNodeId) -> Result<Option<LiveNodeId>> {
        Ok(self.get(id)?.children.first().copied())
    }

    pub fn last_child(&self, id: LiveNodeId) -> Result<Option<LiveNodeId>> {
        Ok(self.get(id)?.children.last().copied())
    }

    pub fn next_sibling(&self, id: LiveNodeId) -> Result<Option<LiveNodeId>> {
        self.sibling_at(id, 1)
    }

    pub fn prev_sibling(&self, id: LiveNodeId) -> Result<Option<LiveNodeId>> {
        self.sibling_at(id, -1)
    }

    fn sibling_at(&self, id: LiveNodeId, offset: isize) -> Result<Option<LiveNodeId>> {
        let parent = match self.get(id)?.parent {
            Some(parent) => parent,
            None => return Ok(None),
        };
        let siblings = &self.get(parent)?.children;
        let pos = siblings
            .iter()
            .position(|&sibling| sibling == id)
            .ok_or(MirrorError::NotAChild { parent, child: id })?;
        let at = pos as isize + offset;
        if at < 0 {
            return Ok(None);
        }
        Ok(siblings.get(at as usize).copied())
    }

    pub fn text_content(&self, id: LiveNodeId) -> Result<&str> {
        Ok(&self.get(id)?.value)
    }

    // -- host mutation API -------------------------------------------------

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: LiveNodeId, child: LiveNodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        self.notify_child_list(parent);
        Ok(())
    }

    /// Insert `child` immediately before `before` in `parent`'s child list.
    pub fn insert_before(
        &mut self,
        parent: LiveNodeId,
        child: LiveNodeId,
        before: LiveNodeId,
    ) -> Result<()> {
        self.check_attachable(parent, child)?;
        let pos = self
            .get(parent)?
            .children
            .iter()
            .position(|&sibling| sibling == before)
            .ok_or(MirrorError::NotAChild {
                parent,
                child: before,
            })?;
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.insert(pos, child);
        self.notify_child_list(parent);
        Ok(())
    }

    /// Unlink `child` from `parent`. The node keeps its id and subtree and can
    /// be re-attached later.
    pub fn remove_child(&mut self, parent: LiveNodeId, child: LiveNodeId) -> Result<()> {
        let pos = self
            .get(parent)?
            .children
            .iter()
            .position(|&sibling| sibling == child)
            .ok_or(MirrorError::NotAChild { parent, child })?;
        self.get_mut(parent)?.children.remove(pos);
        self.get_mut(child)?.parent = None;
        self.notify_child_list(parent);
        Ok(())
    }

    pub fn set_attribute(&mut self, id: LiveNodeId, name: &str, value: &str) -> Result<()> {
        let old = self
            .get_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        self.notify(MutationKind::Attributes, id, old);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: LiveNodeId, name: &str) -> Result<()> {
        let old = self.get_mut(id)?.attributes.remove(name);
        self.notify(MutationKind::Attributes, id, old);
        Ok(())
    }

    pub fn set_text(&mut self, id: LiveNodeId, text: &str) -> Result<()> {
        let node = self.get_mut(id)?;
        let old = std::mem::replace(&mut node.value, text.to_string());
        self.notify(MutationKind::CharacterData, id, Some(old));
        Ok(())
    }

    fn check_attachable(&self, parent: LiveNodeId, child: LiveNodeId) -> Result<()> {
        self.get(parent)?;
        if let Some(current) = self.get(child)?.parent {
            return Err(MirrorError::AlreadyAttached {
                parent: current,
                child,
            });
        }
        // Reject linking a node under its own descendant.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(MirrorError::CycleDetected { parent, child });
            }
            cursor = self.get(id)?.parent;
        }
        Ok(())
    }

    // -- mutation notifications --------------------------------------------

    /// Arm notification delivery. Mutations from this point on are queued.
    pub fn observe(&mut self) {
        self.armed = true;
    }

    /// Disarm delivery. Already-queued records are kept and still drain.
    pub fn disconnect(&mut self) {
        self.armed = false;
    }

    pub fn is_observing(&self) -> bool {
        self.armed
    }

    /// Drain every queued notification, oldest first.
    ///
    /// The queue is unbounded: delivery never blocks and never drops, so a
    /// host that mutates without draining pays in memory.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.records.drain(..).collect()
    }

    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    fn notify_child_list(&mut self, parent: LiveNodeId) {
        self.notify(MutationKind::ChildList, parent, None);
    }

    fn notify(&mut self, kind: MutationKind, target: LiveNodeId, old_value: Option<String>) {
        if !self.armed {
            return;
        }
        self.records.push_back(MutationRecord {
            kind,
            target,
            old_value,
        });
    }
}

impl Default for LiveTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_document() {
        let tree = LiveTree::new();
        assert_eq!(tree.kind(tree.root()).unwrap(), NodeKind::Document);
        assert!(tree.parent(tree.root()).unwrap().is_none());
    }

    #[test]
    fn test_sibling_navigation() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("div");
        let b = tree.new_text("hi");
        let c = tree.new_comment("note");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(root, c).unwrap();

        assert_eq!(tree.first_child(root).unwrap(), Some(a));
        assert_eq!(tree.last_child(root).unwrap(), Some(c));
        assert_eq!(tree.next_sibling(a).unwrap(), Some(b));
        assert_eq!(tree.prev_sibling(c).unwrap(), Some(b));
        assert_eq!(tree.next_sibling(c).unwrap(), None);
        assert_eq!(tree.prev_sibling(a).unwrap(), None);
    }

    #[test]
    fn test_insert_before() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("a");
        let c = tree.new_element("c");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, c).unwrap();

        let b = tree.new_element("b");
        tree.insert_before(root, b, c).unwrap();
        assert_eq!(tree.children(root).unwrap(), &[a, b, c]);
    }

    #[test]
    fn test_double_attach_rejected() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("a");
        tree.append_child(root, a).unwrap();

        let err = tree.append_child(root, a).unwrap_err();
        assert!(matches!(err, MirrorError::AlreadyAttached { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("a");
        let b = tree.new_element("b");
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();

        tree.remove_child(root, a).unwrap();
        let err = tree.append_child(b, a).unwrap_err();
        assert!(matches!(err, MirrorError::CycleDetected { .. }));
    }

    #[test]
    fn test_records_only_while_armed() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let a = tree.new_element("a");
        tree.append_child(root, a).unwrap();
        assert_eq!(tree.pending_records(), 0);

        tree.observe();
        let b = tree.new_element("b");
        tree.append_child(root, b).unwrap();
        tree.set_attribute(b, "class", "x").unwrap();
        assert_eq!(tree.pending_records(), 2);

        let records = tree.take_records();
        assert_eq!(records[0].kind, MutationKind::ChildList);
        assert_eq!(records[0].target, root);
        assert_eq!(records[1].kind, MutationKind::Attributes);
        assert_eq!(tree.pending_records(), 0);
    }

    #[test]
    fn test_disconnect_keeps_queued_records() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        tree.observe();
        let a = tree.new_element("a");
        tree.append_child(root, a).unwrap();

        tree.disconnect();
        let b = tree.new_element("b");
        tree.append_child(root, b).unwrap();

        // Post-disarm mutation is not recorded, pre-disarm one still drains.
        let records = tree.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, root);
    }

    #[test]
    fn test_set_text_carries_old_value() {
        let mut tree = LiveTree::new();
        let root = tree.root();
        let t = tree.new_text("before");
        tree.append_child(root, t).unwrap();

        tree.observe();
        tree.set_text(t, "after").unwrap();
        let records = tree.take_records();
        assert_eq!(records[0].kind, MutationKind::CharacterData);
        assert_eq!(records[0].old_value.as_deref(), Some("before"));
        assert_eq!(tree.text_content(t).unwrap(), "after");
    }
}

//! Core type definitions for the mirror crate
//!
//! Key design principles:
//! 1. Use u32 ids for both live and mirror identity (4 bytes, arena-friendly)
//! 2. Output records are plain serde types; the wire encoding is whatever the
//!    caller picks (`to_json` helpers cover the common case)
//! 3. Reserved change categories stay in the schema even while unpopulated

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Live node identifier (index into the live tree arena).
/// Stable for the lifetime of the tree; nodes are unlinked, never freed.
pub type LiveNodeId = u32;

/// Mirror identifier, assigned once per observed live node, starting at 1.
pub type MirrorId = u32;

/// Structural node kind, DOM-shaped.
///
/// Only the first five kinds are serializable; the rest exist so a tree can
/// legitimately contain nodes the serializer refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Document,
    DocumentType,
    Comment,
    Text,
    Element,
    CdataSection,
    ProcessingInstruction,
    DocumentFragment,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Document => "document",
            NodeKind::DocumentType => "documentType",
            NodeKind::Comment => "comment",
            NodeKind::Text => "text",
            NodeKind::Element => "element",
            NodeKind::CdataSection => "cdataSection",
            NodeKind::ProcessingInstruction => "processingInstruction",
            NodeKind::DocumentFragment => "documentFragment",
        };
        f.write_str(name)
    }
}

/// Serialized structural record for one live node.
///
/// `Reference` is the lightweight form returned for a node that already has a
/// mirror: consumers resolve it against nodes they have seen before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SerializedNode {
    #[serde(rename_all = "camelCase")]
    DocumentType {
        id: MirrorId,
        name: String,
        public_id: String,
        system_id: String,
    },
    Comment {
        id: MirrorId,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        id: MirrorId,
        text: String,
        is_style_node: bool,
    },
    Document {
        id: MirrorId,
        children: Vec<SerializedNode>,
    },
    #[serde(rename_all = "camelCase")]
    Element {
        id: MirrorId,
        tag_name: String,
        attributes: HashMap<String, String>,
        children: Vec<SerializedNode>,
    },
    Reference {
        id: MirrorId,
    },
}

impl SerializedNode {
    /// Mirror id stamped on this record.
    pub fn id(&self) -> MirrorId {
        match self {
            SerializedNode::DocumentType { id, .. }
            | SerializedNode::Comment { id, .. }
            | SerializedNode::Text { id, .. }
            | SerializedNode::Document { id, .. }
            | SerializedNode::Element { id, .. }
            | SerializedNode::Reference { id } => *id,
        }
    }

    /// Child records, for the kinds that carry them.
    pub fn children(&self) -> &[SerializedNode] {
        match self {
            SerializedNode::Document { children, .. }
            | SerializedNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A structural insert: the serialized node, where it went, and which already
/// known sibling it sits before (absent = appended at the tail).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedNode {
    pub node_data: SerializedNode,
    pub parent_id: MirrorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sibling_id: Option<MirrorId>,
}

/// A structural removal, by mirror id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNode {
    pub node_id: MirrorId,
}

/// Reserved change category: attribute-level updates. Declared for schema
/// stability, never populated yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeChange {
    pub node_id: MirrorId,
    pub attributes: HashMap<String, String>,
}

/// Reserved change category: text-content updates. Declared for schema
/// stability, never populated yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    pub node_id: MirrorId,
    pub text: String,
}

/// Aggregate result of one change drain.
///
/// `attributes` and `text` are always present so downstream consumers see a
/// stable schema, but stay empty in the current version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<InsertedNode>,
    pub removed: Vec<RemovedNode>,
    pub attributes: Vec<AttributeChange>,
    pub text: Vec<TextChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.attributes.is_empty()
            && self.text.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Kind of a coarse-grained mutation notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Attributes,
    ChildList,
    CharacterData,
}

/// One host-delivered mutation notification.
///
/// Coalesced and lossy on purpose: a `ChildList` record only names the parent
/// whose children changed; the diff engine re-derives the actual edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: LiveNodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

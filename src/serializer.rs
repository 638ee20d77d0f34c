//! Snapshot serializer
//!
//! Recursively walks a live subtree, producing one tagged record per node and
//! allocating mirror identities as it goes. Already-mirrored subtrees
//! short-circuit to a `Reference` record in O(1) and are never re-walked.

use crate::error::{MirrorError, Result};
use crate::mirror::NodeMirror;
use crate::tree::LiveTree;
use crate::types::{LiveNodeId, MirrorId, NodeKind, SerializedNode};
use std::collections::HashMap;

/// Per-kind classification, before an id exists for the node.
enum Parsed {
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Comment {
        text: String,
    },
    Text {
        text: String,
        is_style_node: bool,
    },
    Document,
    Element {
        tag_name: String,
        attributes: HashMap<String, String>,
    },
}

fn classify(tree: &LiveTree, live: LiveNodeId) -> Result<Parsed> {
    let node = tree.get(live)?;

    match node.kind {
        NodeKind::DocumentType => Ok(Parsed::DocumentType {
            name: node.name.clone(),
            public_id: node.public_id.clone(),
            system_id: node.system_id.clone(),
        }),

        NodeKind::Comment => Ok(Parsed::Comment {
            text: node.value.clone(),
        }),

        NodeKind::Text => {
            let mut text = node.value.clone();
            let mut is_style_node = false;
            if let Some(parent_id) = node.parent {
                let parent = tree.get(parent_id)?;
                if parent.kind == NodeKind::Element {
                    // Never capture executable payloads.
                    if parent.name.eq_ignore_ascii_case("script") {
                        text.clear();
                    }
                    is_style_node = parent.name.eq_ignore_ascii_case("style");
                }
            }
            Ok(Parsed::Text {
                text,
                is_style_node,
            })
        }

        NodeKind::Document => Ok(Parsed::Document),

        NodeKind::Element => Ok(Parsed::Element {
            tag_name: node.name.to_ascii_lowercase(),
            attributes: node.attributes.clone(),
        }),

        other => Err(MirrorError::UnsupportedKind(other)),
    }
}

/// Serialize `live` and its subtree, registering mirrors for every node seen
/// for the first time.
///
/// Idempotent: a node that already has a mirror yields `Reference { id }` and
/// allocates nothing.
pub fn serialize(
    tree: &LiveTree,
    mirror: &mut NodeMirror,
    live: LiveNodeId,
) -> Result<(SerializedNode, MirrorId)> {
    if let Some(id) = mirror.id_of(live) {
        return Ok((SerializedNode::Reference { id }, id));
    }

    let parsed = classify(tree, live)?;
    let id = mirror.create(live);

    let mut child_records = Vec::new();
    if matches!(parsed, Parsed::Document | Parsed::Element { .. }) {
        for &child_live in tree.children(live)? {
            let (child_record, child_id) = serialize(tree, mirror, child_live)?;

            // Link the child as the new tail of this node's mirror list,
            // detaching it from any prior position first.
            mirror.detach(child_id)?;
            mirror.get_mut(child_id)?.parent = Some(id);
            mirror.get_mut(id)?.children.push(child_id);

            child_records.push(child_record);
        }
    }

    let record = match parsed {
        Parsed::DocumentType {
            name,
            public_id,
            system_id,
        } => SerializedNode::DocumentType {
            id,
            name,
            public_id,
            system_id,
        },
        Parsed::Comment { text } => SerializedNode::Comment { id, text },
        Parsed::Text {
            text,
            is_style_node,
        } => SerializedNode::Text {
            id,
            text,
            is_style_node,
        },
        Parsed::Document => SerializedNode::Document {
            id,
            children: child_records,
        },
        Parsed::Element {
            tag_name,
            attributes,
        } => SerializedNode::Element {
            id,
            tag_name,
            attributes,
            children: child_records,
        },
    };

    Ok((record, id))
}

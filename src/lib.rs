//! Tree-Mirror: snapshots and incremental diffs of a live tree
//!
//! Builds a serializable snapshot of a live, externally mutated tree and
//! keeps deriving minimal structural diffs from coarse mutation
//! notifications, so a remote or deferred consumer can reconstruct and stay
//! synchronized with the tree without re-walking it.
//!
//! ## Core Design
//!
//! ```text
//! LiveTree (host-owned) → snapshot → SerializedNode tree
//!        ↓ mutations                        ↑ ids
//!   MutationRecord queue → drain → reconcile → ChangeSet
//!                                     ↓
//!                          NodeMirror (shadow state)
//! ```
//!
//! The mirror is a rebuildable cache, never an authority: on any
//! desynchronization fault, take a fresh snapshot.
//!
//! ## Example
//!
//! ```
//! use tree_mirror::{LiveTree, MutationWatcher};
//!
//! let mut tree = LiveTree::new();
//! let body = tree.new_element("body");
//! tree.append_child(tree.root(), body).unwrap();
//!
//! let mut watcher = MutationWatcher::new();
//! let snapshot = watcher.snapshot(&mut tree).unwrap();
//! assert_eq!(snapshot.id(), 1);
//!
//! let div = tree.new_element("div");
//! tree.append_child(body, div).unwrap();
//!
//! let changes = watcher.get_changes(&mut tree).unwrap();
//! assert_eq!(changes.added.len(), 1);
//! ```

pub mod diff;
pub mod error;
pub mod mirror;
pub mod serializer;
pub mod tree;
pub mod types;
pub mod watcher;

pub use error::{MirrorError, Result};
pub use mirror::{MirrorNode, NodeMirror};
pub use tree::{LiveNode, LiveTree};
pub use types::*;
pub use watcher::MutationWatcher;

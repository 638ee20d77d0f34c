//! Error types for mirror operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use crate::types::NodeKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("node not found: {0}")]
    NodeNotFound(u32),

    #[error("unsupported node kind: {0}")]
    UnsupportedKind(NodeKind),

    /// The shadow structure no longer agrees with the live tree. The shadow
    /// tree is a rebuildable cache, not an authority: recover by taking a
    /// fresh `snapshot()`.
    #[error("shadow tree out of sync: {0}")]
    OutOfSync(String),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: u32, child: u32 },

    #[error("node {child} is already attached to {parent}")]
    AlreadyAttached { parent: u32, child: u32 },

    #[error("linking {child} under {parent} would create a cycle")]
    CycleDetected { parent: u32, child: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

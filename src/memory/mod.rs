//! Memory module for ArcCore
//!
//! Provides the node model, gate-first collapse, level-aware reconstruction,
//! the persisted record shape and its JSON store.

mod collapse;
mod node;
mod record;
mod reconstruct;
mod store;
mod tree;

pub use collapse::{derive_seed, CollapseEngine, BLOCKED_SEED};
pub use node::{CompressionLevel, MemoryNode, NodeShape, Role, ROOT_CONTENT, ROOT_CYCLE};
pub use reconstruct::{
    Reconstructor, NO_CONTENT_PLACEHOLDER, NO_SEED_PLACEHOLDER, SIGIL_ANCHOR_PLACEHOLDER,
    UNRECOGNIZED_LEVEL_PLACEHOLDER,
};
pub use record::NodeRecord;
pub use store::MemoryStore;
pub use tree::{MemorySystem, TreeSummary, INTERACTION_DEPTH};

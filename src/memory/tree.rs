//! The memory system: one tree, one root, one mutator path.
//!
//! New interactions enter under the root at full fidelity and are scored by
//! the priority scorer. Structural changes go through the policy gate; the
//! collapse pass rewrites the root's children in place.

use super::collapse::CollapseEngine;
use super::node::{CompressionLevel, MemoryNode, Role};
use super::reconstruct::Reconstructor;
use crate::priority::PriorityScorer;
use crate::rules::{GatePolicy, GateVerdict, PolicyGate};
use crate::{ArcError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Depth of the deepest node an interaction creates (user at 1, ai at 2)
pub const INTERACTION_DEPTH: usize = 2;

/// Owns the memory tree and the engines that operate on it
#[derive(Debug, Clone)]
pub struct MemorySystem {
    root: MemoryNode,
    scorer: PriorityScorer,
    collapse: CollapseEngine,
    reconstructor: Reconstructor,
}

impl MemorySystem {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            root: MemoryNode::root(),
            scorer: PriorityScorer::new(),
            collapse: CollapseEngine::new(PolicyGate::new(policy)),
            reconstructor: Reconstructor::new(),
        }
    }

    pub fn root(&self) -> &MemoryNode {
        &self.root
    }

    pub fn gate(&self) -> &PolicyGate {
        self.collapse.gate()
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    /// Replace the whole tree, e.g. after loading persisted state
    pub fn replace_root(&mut self, root: MemoryNode) {
        info!("Memory tree replaced ({} nodes)", root.node_count());
        self.root = root;
    }

    /// Add one user turn with its ai reply under the root.
    ///
    /// The gate is consulted once, with the root's fan-out after insertion
    /// and the depth of the deepest new node. A rejection leaves the tree
    /// untouched.
    pub fn ingest_interaction(&mut self, user_text: &str, ai_text: &str, cycle: i64) -> Result<()> {
        let fan_out = self.root.children().len() + 1;
        if let GateVerdict::Blocked(violation) =
            self.gate().check(&Role::User, cycle, fan_out, INTERACTION_DEPTH)
        {
            warn!("Interaction for cycle {} rejected: {}", cycle, violation);
            return Err(ArcError::Memory(format!(
                "Interaction rejected by guardian: {}",
                violation.reason()
            )));
        }

        let mut user_node = MemoryNode::new(Role::User, user_text, cycle);
        let mut ai_node = MemoryNode::new(Role::Ai, ai_text, cycle);
        user_node.apply_priority(&self.scorer);
        ai_node.apply_priority(&self.scorer);

        debug!(
            "Ingesting cycle {} (user priority {}, ai priority {})",
            cycle,
            user_node.priority(),
            ai_node.priority()
        );

        user_node.push_child(ai_node)?;
        self.root.push_child(user_node)?;

        info!("Interaction added for cycle {}", cycle);
        Ok(())
    }

    /// Collapse every descendant of the root. The root itself stays RAW.
    pub fn collapse_tree(&mut self) -> Result<()> {
        let collapse = &self.collapse;
        let children = self.root.children_mut().ok_or_else(|| {
            ArcError::Memory("root node is blocked and cannot be collapsed".to_string())
        })?;

        let taken = std::mem::take(children);
        let count = taken.len();
        *children = taken
            .into_iter()
            .map(|child| collapse.collapse_owned(child, 1))
            .collect();

        info!("Collapsed {} top-level interactions", count);
        Ok(())
    }

    /// Render every node, one line each
    pub fn reconstruct_full(&self) -> Vec<String> {
        self.reconstructor.reconstruct_full(&self.root)
    }

    /// Render the nodes of one cycle
    pub fn reconstruct_thread(&self, cycle: i64) -> Vec<String> {
        self.reconstructor.reconstruct_thread(&self.root, cycle)
    }

    /// Structural overview of the tree
    pub fn summary(&self) -> TreeSummary {
        let mut summary = TreeSummary::default();
        self.root.walk(0, &mut |node, depth| {
            summary.nodes += 1;
            summary.max_depth = summary.max_depth.max(depth);
            summary.cycles.insert(node.cycle);
            *summary
                .by_level
                .entry(node.compression_level().to_string())
                .or_insert(0) += 1;
            if node.is_blocked() {
                summary.blocked += 1;
            }
        });
        summary
    }
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new(GatePolicy::default())
    }
}

/// Counts reported by the `summary` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    pub nodes: usize,
    pub max_depth: usize,
    pub blocked: usize,
    pub cycles: BTreeSet<i64>,
    pub by_level: BTreeMap<String, usize>,
}

impl TreeSummary {
    pub fn count_at(&self, level: &CompressionLevel) -> usize {
        self.by_level.get(level.as_str()).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes: {} (max depth {})", self.nodes, self.max_depth)?;
        let cycles: Vec<String> = self.cycles.iter().map(|c| c.to_string()).collect();
        writeln!(f, "Cycles: {}", cycles.join(", "))?;
        for (level, count) in &self.by_level {
            writeln!(f, "  {}: {}", level, count)?;
        }
        write!(f, "Blocked: {}", self.blocked)
    }
}

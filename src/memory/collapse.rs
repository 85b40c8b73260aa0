//! Collapse engine
//!
//! Moves nodes down the compression ladder (`RAW -> SEED`, or straight to
//! `SIGIL_ONLY` when the gate refuses), recursing through children:
//!   1. Clone the input so the caller keeps an untouched copy
//!   2. Ask the policy gate with (role, cycle, child count, depth)
//!   3. Rejected: replace the node with a childless blocked sink
//!   4. Accepted: reuse the existing seed, or derive one from raw content
//!   5. Recurse into children at `depth + 1`, preserving order

use super::node::{CompressionLevel, MemoryNode};
use crate::priority::HIGH_PRIORITY;
use crate::rules::{GateVerdict, PolicyGate};
use tracing::{debug, warn};

/// Seed placed on nodes the gate refused to collapse
pub const BLOCKED_SEED: &str = "[Sigil: blocked by guardian]";

/// Snippet length kept for high-priority nodes
pub const HIGH_PRIORITY_SNIPPET: usize = 80;

/// Snippet length kept for everything else
pub const LOW_PRIORITY_SNIPPET: usize = 50;

/// Low-priority content at or under this many characters is kept verbatim
pub const SHORT_CONTENT_THRESHOLD: usize = 50;

/// Gate-first collapse over memory nodes
#[derive(Debug, Clone, Default)]
pub struct CollapseEngine {
    gate: PolicyGate,
}

impl CollapseEngine {
    pub fn new(gate: PolicyGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &PolicyGate {
        &self.gate
    }

    /// Collapse `node` (and its subtree) as if it sat at `depth`.
    ///
    /// The input is never modified; the collapsed copy is returned.
    pub fn collapse_state(&self, node: &MemoryNode, depth: usize) -> MemoryNode {
        self.collapse_owned(node.clone(), depth)
    }

    pub(crate) fn collapse_owned(&self, mut node: MemoryNode, depth: usize) -> MemoryNode {
        // A blocked node is a sink; nothing below it is processed again.
        if node.is_blocked() {
            return node;
        }

        let verdict = self
            .gate
            .check(&node.role, node.cycle, node.children().len(), depth);
        if let GateVerdict::Blocked(violation) = verdict {
            warn!(
                "Collapse of node {} blocked at depth {}: {}",
                node.id, depth, violation
            );
            let error = format!("Collapse blocked by guardian: {}", violation.reason());
            return node.into_blocked(error, BLOCKED_SEED);
        }

        if node.seed().is_some() {
            node.clear_content();
            if node.compression_level().is_raw() {
                node.advance_to(CompressionLevel::Seed);
            }
        } else {
            let content = node.content().unwrap_or_default();
            let seed = derive_seed(content, node.cycle, node.priority());
            debug!("Derived seed for node {} (priority {})", node.id, node.priority());
            node.set_seed(seed);
            node.clear_content();
            node.advance_to(CompressionLevel::Seed);
        }

        if let Some(children) = node.children_mut() {
            let taken = std::mem::take(children);
            *children = taken
                .into_iter()
                .map(|child| self.collapse_owned(child, depth + 1))
                .collect();
        }

        node
    }
}

/// Build a seed from raw content.
///
/// High-priority nodes keep an 80-character prefix. Others keep 50, except
/// short messages which stay verbatim.
pub fn derive_seed(content: &str, cycle: i64, priority: u32) -> String {
    if priority >= HIGH_PRIORITY {
        return format!("[AC-{}] {}...", cycle, char_prefix(content, HIGH_PRIORITY_SNIPPET));
    }
    if content.chars().count() <= SHORT_CONTENT_THRESHOLD {
        return content.to_string();
    }
    format!(
        "[Seed AC-{}]: {}...",
        cycle,
        char_prefix(content, LOW_PRIORITY_SNIPPET)
    )
}

/// First `n` characters of `text` (not bytes)
fn char_prefix(text: &str, n: usize) -> &str {
    let end = text
        .char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::node::Role;
    use crate::rules::GatePolicy;

    fn long_text(len: usize) -> String {
        "abcdefghij".repeat(len / 10 + 1)[..len].to_string()
    }

    #[test]
    fn test_high_priority_keeps_80_chars() {
        let seed = derive_seed(&long_text(120), 3, 3);
        assert_eq!(seed, format!("[AC-3] {}...", &long_text(120)[..80]));
    }

    #[test]
    fn test_low_priority_keeps_50_chars() {
        let seed = derive_seed(&long_text(120), 3, 0);
        assert_eq!(seed, format!("[Seed AC-3]: {}...", &long_text(120)[..50]));
    }

    #[test]
    fn test_short_low_priority_is_verbatim() {
        assert_eq!(derive_seed("Test AI response.", 7, 0), "Test AI response.");
        assert_eq!(derive_seed(&long_text(50), 7, 2), long_text(50));
    }

    #[test]
    fn test_prefix_counts_chars_not_bytes() {
        let text = "💠".repeat(100);
        let seed = derive_seed(&text, 1, 300);
        assert_eq!(seed.chars().filter(|c| *c == '💠').count(), 80);
    }

    #[test]
    fn test_collapse_leaves_input_untouched() {
        let engine = CollapseEngine::default();
        let node = MemoryNode::new(Role::User, long_text(120), 3)
            .with_child(MemoryNode::new(Role::Ai, "short", 3));
        let before = node.clone();

        let collapsed = engine.collapse_state(&node, 1);

        assert_eq!(node, before);
        assert_eq!(collapsed.compression_level(), &CompressionLevel::Seed);
        assert_eq!(collapsed.compressed_from(), Some(&CompressionLevel::Raw));
        assert!(collapsed.content().is_none());
        assert_eq!(collapsed.children()[0].seed(), Some("short"));
        assert_eq!(collapsed.id, node.id);
    }

    #[test]
    fn test_existing_seed_is_reused() {
        let engine = CollapseEngine::default();
        let node = MemoryNode::new(Role::Ai, long_text(90), 2).with_seed("[AC-2] kept");

        let collapsed = engine.collapse_state(&node, 1);
        assert_eq!(collapsed.seed(), Some("[AC-2] kept"));
        assert_eq!(collapsed.compression_level(), &CompressionLevel::Seed);
        assert!(collapsed.content().is_none());

        let again = engine.collapse_state(&collapsed, 1);
        assert_eq!(again.seed(), collapsed.seed());
        assert_eq!(again.compression_level(), &CompressionLevel::Seed);
        assert_eq!(again.compressed_from(), Some(&CompressionLevel::Raw));
    }

    #[test]
    fn test_gate_rejection_amputates_children() {
        let engine = CollapseEngine::new(PolicyGate::new(GatePolicy {
            max_children_per_node: 1,
            ..GatePolicy::default()
        }));
        let node = MemoryNode::new(Role::User, "parent", 4)
            .with_child(MemoryNode::new(Role::Ai, "a", 4))
            .with_child(MemoryNode::new(Role::Ai, "b", 4));

        let blocked = engine.collapse_state(&node, 1);

        assert!(blocked.is_blocked());
        assert!(blocked.children().is_empty());
        assert_eq!(blocked.role, Role::User);
        assert_eq!(blocked.cycle, 4);
        assert_eq!(blocked.seed(), Some(BLOCKED_SEED));
        assert_eq!(blocked.compression_level(), &CompressionLevel::SigilOnly);
        assert_eq!(blocked.compressed_from(), Some(&CompressionLevel::Raw));
        assert!(blocked.error().unwrap().contains("Too many children"));
    }

    #[test]
    fn test_depth_ceiling_blocks_deep_descendant_only() {
        let engine = CollapseEngine::new(PolicyGate::new(GatePolicy {
            max_depth: 2,
            ..GatePolicy::default()
        }));
        let node = MemoryNode::new(Role::User, "one", 1).with_child(
            MemoryNode::new(Role::Ai, "two", 1)
                .with_child(MemoryNode::new(Role::User, "three", 1)),
        );

        let collapsed = engine.collapse_state(&node, 1);

        assert!(!collapsed.is_blocked());
        assert!(!collapsed.children()[0].is_blocked());
        let deepest = &collapsed.children()[0].children()[0];
        assert!(deepest.is_blocked());
        assert!(deepest.error().unwrap().contains("Depth 3"));
    }

    #[test]
    fn test_blocked_node_stays_blocked() {
        let strict = CollapseEngine::new(PolicyGate::new(GatePolicy {
            max_depth: 0,
            ..GatePolicy::default()
        }));
        let blocked = strict.collapse_state(&MemoryNode::new(Role::User, "x", 1), 1);

        let relaxed = CollapseEngine::default();
        let again = relaxed.collapse_state(&blocked, 1);
        assert_eq!(again, blocked);
    }
}

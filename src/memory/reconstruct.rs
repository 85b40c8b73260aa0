//! Deterministic reconstruction of memory trees into readable lines.
//!
//! Each node renders according to the compression level it currently holds.
//! Nothing here infers missing content: a SIGIL_ONLY node only ever renders
//! its anchor placeholder. Both walks are read-only.

use super::node::{CompressionLevel, MemoryNode};
use regex::Regex;

pub const SIGIL_ANCHOR_PLACEHOLDER: &str = "[Sigil anchor only - reconstruction required]";
pub const UNRECOGNIZED_LEVEL_PLACEHOLDER: &str = "[Unrecognized compression level]";
pub const NO_SEED_PLACEHOLDER: &str = "[No seed available]";
pub const NO_CONTENT_PLACEHOLDER: &str = "[No content]";

/// Renders trees line by line
#[derive(Debug, Clone)]
pub struct Reconstructor {
    /// Matches the bracketed cycle tag at the front of a derived seed
    seed_tag: Regex,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self {
            seed_tag: Regex::new(r"(?s)^\[(?:Seed )?AC-(-?\d+)\]:?\s*(.*)$").unwrap(),
        }
    }

    /// Rewrite a seed's cycle tag into a readable phrase.
    ///
    /// `[AC-3] text...` and `[Seed AC-3]: text...` become
    /// `Recalled from cycle 3: text...`; any other shape is passed through
    /// with an `(expanded)` prefix.
    pub fn expand_seed(&self, seed: Option<&str>) -> String {
        let seed = match seed {
            Some(s) if !s.is_empty() => s,
            _ => return NO_SEED_PLACEHOLDER.to_string(),
        };

        match self.seed_tag.captures(seed) {
            Some(caps) => format!("Recalled from cycle {}: {}", &caps[1], &caps[2]),
            None => format!("(expanded) {}", seed),
        }
    }

    /// Depth-first, pre-order rendering of every node; indentation encodes depth.
    pub fn reconstruct_full(&self, tree: &MemoryNode) -> Vec<String> {
        let mut lines = Vec::new();
        tree.walk(0, &mut |node, depth| lines.push(self.render_line(node, depth)));
        lines
    }

    /// Lines for the nodes of one cycle, in pre-order.
    ///
    /// The walk descends through every node, so a matching node under a
    /// non-matching parent is still reached.
    pub fn reconstruct_thread(&self, tree: &MemoryNode, cycle: i64) -> Vec<String> {
        let mut lines = Vec::new();
        tree.walk(0, &mut |node, _| {
            if node.cycle == cycle {
                lines.push(self.render_thread_line(node));
            }
        });
        lines
    }

    fn render_line(&self, node: &MemoryNode, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match node.compression_level() {
            CompressionLevel::Raw | CompressionLevel::Summary => {
                let text = node
                    .seed()
                    .or(node.content())
                    .unwrap_or(NO_CONTENT_PLACEHOLDER);
                format!("{}{} {}", indent, header(node), text)
            }
            CompressionLevel::Seed => {
                format!("{}{} {}", indent, header(node), self.expand_seed(node.seed()))
            }
            CompressionLevel::SigilOnly => {
                format!("{}{} {}", indent, header(node), SIGIL_ANCHOR_PLACEHOLDER)
            }
            CompressionLevel::Unrecognized(_) => UNRECOGNIZED_LEVEL_PLACEHOLDER.to_string(),
        }
    }

    fn render_thread_line(&self, node: &MemoryNode) -> String {
        match node.compression_level() {
            CompressionLevel::SigilOnly => format!("{} {}", header(node), SIGIL_ANCHOR_PLACEHOLDER),
            CompressionLevel::Unrecognized(_) => UNRECOGNIZED_LEVEL_PLACEHOLDER.to_string(),
            _ => format!(
                "{} {}",
                header(node),
                self.expand_seed(node.seed().or(node.content()))
            ),
        }
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new()
    }
}

fn header(node: &MemoryNode) -> String {
    format!("[AC-{}] {}:", node.cycle, node.role.as_str().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::node::{NodeShape, Role};
    use pretty_assertions::assert_eq;

    fn seeded(role: Role, seed: &str, cycle: i64) -> MemoryNode {
        let mut node = MemoryNode::new(role, "raw text that must not show", cycle).with_seed(seed);
        node.advance_to(CompressionLevel::Seed);
        node
    }

    #[test]
    fn test_expand_seed_shapes() {
        let r = Reconstructor::new();
        assert_eq!(
            r.expand_seed(Some("[AC-3] structured descent...")),
            "Recalled from cycle 3: structured descent..."
        );
        assert_eq!(
            r.expand_seed(Some("[Seed AC-7]: recursive clarity...")),
            "Recalled from cycle 7: recursive clarity..."
        );
        assert_eq!(r.expand_seed(Some("Short reply")), "(expanded) Short reply");
        assert_eq!(r.expand_seed(None), NO_SEED_PLACEHOLDER);
        assert_eq!(r.expand_seed(Some("")), NO_SEED_PLACEHOLDER);
    }

    #[test]
    fn test_full_reconstruction_raw_root_seed_child() {
        let r = Reconstructor::new();
        let tree = MemoryNode::root().with_child(seeded(Role::User, "[AC-3] hello...", 3));

        let lines = r.reconstruct_full(&tree);
        assert_eq!(
            lines,
            vec![
                "[AC-1] SYSTEM: ArcCore-Prime Root Node".to_string(),
                "  [AC-3] USER: Recalled from cycle 3: hello...".to_string(),
            ]
        );
    }

    #[test]
    fn test_seed_level_still_recurses() {
        let r = Reconstructor::new();
        let tree = seeded(Role::User, "[AC-2] parent...", 2)
            .with_child(seeded(Role::Ai, "child reply", 2));

        let lines = r.reconstruct_full(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "  [AC-2] AI: (expanded) child reply");
    }

    #[test]
    fn test_sigil_only_never_shows_seed() {
        let r = Reconstructor::new();
        let mut node = seeded(Role::User, "[AC-5] secret seed", 5);
        node.advance_to(CompressionLevel::SigilOnly);

        let full = r.reconstruct_full(&node);
        assert_eq!(full, vec![format!("[AC-5] USER: {}", SIGIL_ANCHOR_PLACEHOLDER)]);

        let thread = r.reconstruct_thread(&node, 5);
        assert!(!thread[0].contains("secret"));
    }

    #[test]
    fn test_unrecognized_level_does_not_stop_walk() {
        let r = Reconstructor::new();
        let odd = MemoryNode::from_parts(
            "odd00001".to_string(),
            Role::Ai,
            4,
            None,
            Some("[AC-4] x".to_string()),
            CompressionLevel::Unrecognized("ARCHIVED".to_string()),
            None,
            0,
            NodeShape::Branch(vec![seeded(Role::User, "[AC-4] below", 4)]),
        );
        let tree = MemoryNode::root()
            .with_child(odd)
            .with_child(seeded(Role::User, "[AC-4] sibling", 4));

        let lines = r.reconstruct_full(&tree);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], UNRECOGNIZED_LEVEL_PLACEHOLDER);
        assert_eq!(lines[2], "    [AC-4] USER: Recalled from cycle 4: below");
        assert_eq!(lines[3], "  [AC-4] USER: Recalled from cycle 4: sibling");
    }

    #[test]
    fn test_thread_descends_through_other_cycles() {
        let r = Reconstructor::new();
        let tree = seeded(Role::User, "[AC-3] first", 3).with_child(
            seeded(Role::Ai, "[AC-7] middle", 7).with_child(seeded(Role::User, "[AC-3] last", 3)),
        );

        let lines = r.reconstruct_thread(&tree, 3);
        assert_eq!(
            lines,
            vec![
                "[AC-3] USER: Recalled from cycle 3: first".to_string(),
                "[AC-3] USER: Recalled from cycle 3: last".to_string(),
            ]
        );
        assert!(r.reconstruct_thread(&tree, 9).is_empty());
    }

    #[test]
    fn test_reconstruction_is_read_only() {
        let r = Reconstructor::new();
        let tree = MemoryNode::root().with_child(seeded(Role::User, "[AC-3] a", 3));
        let before = tree.clone();
        let _ = r.reconstruct_full(&tree);
        let _ = r.reconstruct_thread(&tree, 3);
        assert_eq!(tree, before);
    }
}

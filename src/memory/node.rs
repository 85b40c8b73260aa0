//! Memory tree entities
//!
//! A [`MemoryNode`] is one stored interaction turn. Nodes own their children
//! outright; the tree is a strict ownership tree rooted at a synthetic
//! system node.

use crate::priority::PriorityScorer;
use crate::{ArcError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content of the synthetic root node
pub const ROOT_CONTENT: &str = "ArcCore-Prime Root Node";

/// Cycle the root is created in
pub const ROOT_CYCLE: i64 = 1;

/// Actor tag of a node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Ai,
    System,
    /// Any tag outside the closed set (only reachable from loaded data)
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
            Role::System => "system",
            Role::Other(tag) => tag,
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "user" => Role::User,
            "ai" => Role::Ai,
            "system" => Role::System,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fidelity tier of a node, strictly ordered `RAW < SUMMARY < SEED < SIGIL_ONLY`.
///
/// `Summary` is reserved: nothing produces it yet, but it keeps its ordinal.
/// `Unrecognized` holds level values read from corrupt or newer data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionLevel {
    Raw,
    Summary,
    Seed,
    SigilOnly,
    Unrecognized(String),
}

impl CompressionLevel {
    /// Ordinal position, `None` for unrecognized values
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            CompressionLevel::Raw => Some(0),
            CompressionLevel::Summary => Some(1),
            CompressionLevel::Seed => Some(2),
            CompressionLevel::SigilOnly => Some(3),
            CompressionLevel::Unrecognized(_) => None,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            0 => CompressionLevel::Raw,
            1 => CompressionLevel::Summary,
            2 => CompressionLevel::Seed,
            3 => CompressionLevel::SigilOnly,
            other => CompressionLevel::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CompressionLevel::Raw => "RAW",
            CompressionLevel::Summary => "SUMMARY",
            CompressionLevel::Seed => "SEED",
            CompressionLevel::SigilOnly => "SIGIL_ONLY",
            CompressionLevel::Unrecognized(raw) => raw,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, CompressionLevel::Raw)
    }

    /// Forward-only check. Leaving an unrecognized level is allowed since
    /// there is no ordinal to compare against.
    pub fn can_advance_to(&self, next: &CompressionLevel) -> bool {
        match (self.ordinal(), next.ordinal()) {
            (Some(current), Some(next)) => next >= current,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for CompressionLevel {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "RAW" => CompressionLevel::Raw,
            "SUMMARY" => CompressionLevel::Summary,
            "SEED" => CompressionLevel::Seed,
            "SIGIL_ONLY" => CompressionLevel::SigilOnly,
            _ => CompressionLevel::Unrecognized(value.to_string()),
        }
    }
}

impl Serialize for CompressionLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CompressionLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LevelValue {
            Name(String),
            Ordinal(i64),
            Other(serde_json::Value),
        }

        Ok(match LevelValue::deserialize(deserializer)? {
            LevelValue::Name(name) => CompressionLevel::from(name.as_str()),
            LevelValue::Ordinal(n) => CompressionLevel::from_ordinal(n),
            LevelValue::Other(v) => CompressionLevel::Unrecognized(v.to_string()),
        })
    }
}

/// The two shapes a node can take.
///
/// A blocked node is the fail-closed sink left behind when the gate rejects
/// a collapse; it has no children by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeShape {
    Branch(Vec<MemoryNode>),
    Blocked { error: String },
}

/// One stored interaction turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNode {
    /// Opaque id, fixed at creation
    pub id: String,
    pub role: Role,
    /// Epoch tag grouping related nodes
    pub cycle: i64,
    content: Option<String>,
    seed: Option<String>,
    level: CompressionLevel,
    compressed_from: Option<CompressionLevel>,
    priority: u32,
    shape: NodeShape,
}

/// Short random node id
pub fn new_node_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl MemoryNode {
    /// Fresh full-fidelity node
    pub fn new(role: Role, content: impl Into<String>, cycle: i64) -> Self {
        Self {
            id: new_node_id(),
            role,
            cycle,
            content: Some(content.into()),
            seed: None,
            level: CompressionLevel::Raw,
            compressed_from: None,
            priority: 0,
            shape: NodeShape::Branch(Vec::new()),
        }
    }

    /// The synthetic system root
    pub fn root() -> Self {
        Self::new(Role::System, ROOT_CONTENT, ROOT_CYCLE)
    }

    /// Rebuild a node from persisted parts.
    ///
    /// Raw text and a non-RAW level are mutually exclusive, so content is
    /// dropped when the stored level says the node was already collapsed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: String,
        role: Role,
        cycle: i64,
        content: Option<String>,
        seed: Option<String>,
        level: CompressionLevel,
        compressed_from: Option<CompressionLevel>,
        priority: u32,
        shape: NodeShape,
    ) -> Self {
        let content = if level.is_raw() { content } else { None };
        Self {
            id,
            role,
            cycle,
            content,
            seed,
            level,
            compressed_from,
            priority,
            shape,
        }
    }

    /// Attach a seed before the first collapse
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Set the priority directly, only honoured at full fidelity
    pub fn with_priority(mut self, priority: u32) -> Self {
        if self.level.is_raw() {
            self.priority = priority;
        }
        self
    }

    /// Append a child while building a fixture tree
    pub fn with_child(mut self, child: MemoryNode) -> Self {
        if let NodeShape::Branch(children) = &mut self.shape {
            children.push(child);
        }
        self
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn compression_level(&self) -> &CompressionLevel {
        &self.level
    }

    pub fn compressed_from(&self) -> Option<&CompressionLevel> {
        self.compressed_from.as_ref()
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn shape(&self) -> &NodeShape {
        &self.shape
    }

    /// Denormalised flag: anything other than RAW counts as collapsed
    pub fn is_collapsed(&self) -> bool {
        !self.level.is_raw()
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.shape, NodeShape::Blocked { .. })
    }

    /// Error message of a blocked node
    pub fn error(&self) -> Option<&str> {
        match &self.shape {
            NodeShape::Blocked { error } => Some(error),
            NodeShape::Branch(_) => None,
        }
    }

    pub fn children(&self) -> &[MemoryNode] {
        match &self.shape {
            NodeShape::Branch(children) => children,
            NodeShape::Blocked { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<MemoryNode>> {
        match &mut self.shape {
            NodeShape::Branch(children) => Some(children),
            NodeShape::Blocked { .. } => None,
        }
    }

    /// Append a child. Blocked nodes cannot take children.
    pub fn push_child(&mut self, child: MemoryNode) -> Result<()> {
        match &mut self.shape {
            NodeShape::Branch(children) => {
                children.push(child);
                Ok(())
            }
            NodeShape::Blocked { .. } => Err(ArcError::Memory(format!(
                "node {} is blocked and cannot take children",
                self.id
            ))),
        }
    }

    /// Score the raw content. Priority is fixed once the node has collapsed,
    /// so later calls just return the stored value.
    pub fn apply_priority(&mut self, scorer: &PriorityScorer) -> u32 {
        if self.level.is_raw() {
            self.priority = scorer.evaluate_opt(self.content.as_deref());
        }
        self.priority
    }

    /// Move to `next`, recording the level left behind.
    ///
    /// Returns `false` (and changes nothing) when `next` would raise fidelity.
    pub fn advance_to(&mut self, next: CompressionLevel) -> bool {
        if !self.level.can_advance_to(&next) {
            return false;
        }
        if next != self.level {
            let prior = std::mem::replace(&mut self.level, next);
            self.compressed_from = Some(prior);
        }
        if !self.level.is_raw() {
            self.content = None;
        }
        true
    }

    pub(crate) fn set_seed(&mut self, seed: String) {
        self.seed = Some(seed);
    }

    pub(crate) fn clear_content(&mut self) {
        self.content = None;
    }

    /// Turn this node into a childless blocked sink.
    ///
    /// Keeps id, role, cycle and priority; the seed becomes `sentinel` and the
    /// level is forced to SIGIL_ONLY with the prior level recorded.
    pub(crate) fn into_blocked(self, error: String, sentinel: &str) -> Self {
        Self {
            id: self.id,
            role: self.role,
            cycle: self.cycle,
            content: None,
            seed: Some(sentinel.to_string()),
            compressed_from: Some(self.level),
            level: CompressionLevel::SigilOnly,
            priority: self.priority,
            shape: NodeShape::Blocked { error },
        }
    }

    /// Total nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(MemoryNode::node_count).sum::<usize>()
    }

    /// Height of this subtree; a leaf has depth 0
    pub fn max_depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| c.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order visit of every node with its depth
    pub fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a MemoryNode, usize)) {
        visit(self, depth);
        for child in self.children() {
            child.walk(depth + 1, visit);
        }
    }
}

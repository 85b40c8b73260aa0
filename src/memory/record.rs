//! Persisted tree record
//!
//! `NodeRecord` is the serialized shape of a memory tree. Every key is
//! always written (absent values as `null`), and every key is optional on
//! load so partial records default-fill instead of failing:
//! missing level means RAW, missing prior level means none.
//!
//! Loading never fails on a single node. A `null` or mistyped field takes
//! its default, and a child that is not an object at all becomes a
//! placeholder node with an unrecognized level.

use super::node::{new_node_id, CompressionLevel, MemoryNode, NodeShape, Role};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Level given to children that could not be read as a record
pub const CORRUPT_NODE_LEVEL: &str = "CORRUPT_NODE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, deserialize_with = "or_default")]
    pub id: String,
    #[serde(default, deserialize_with = "or_default")]
    pub role: String,
    #[serde(default, deserialize_with = "or_default")]
    pub cycle: i64,
    #[serde(default, deserialize_with = "or_default")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub seed: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub collapsed: bool,
    #[serde(default, deserialize_with = "or_default")]
    pub priority: u32,
    #[serde(default)]
    pub compression_level: Option<CompressionLevel>,
    #[serde(default)]
    pub compressed_from: Option<CompressionLevel>,
    /// Rejection message of a blocked node
    #[serde(default, deserialize_with = "or_default")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_children")]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    /// Stand-in for a child that could not be read
    fn corrupt() -> Self {
        Self {
            compression_level: Some(CompressionLevel::Unrecognized(
                CORRUPT_NODE_LEVEL.to_string(),
            )),
            ..Self::default()
        }
    }
}

/// Accept any JSON value; `null` or a value of the wrong type yields `T::default()`.
fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Read children one by one so a broken child does not take its siblings down.
fn lenient_children<'de, D>(deserializer: D) -> std::result::Result<Vec<NodeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).unwrap_or_else(|e| {
                warn!("Unreadable child record replaced by placeholder: {}", e);
                NodeRecord::corrupt()
            })
        })
        .collect())
}

impl From<&MemoryNode> for NodeRecord {
    fn from(node: &MemoryNode) -> Self {
        Self {
            id: node.id.clone(),
            role: node.role.as_str().to_string(),
            cycle: node.cycle,
            content: node.content().map(str::to_string),
            seed: node.seed().map(str::to_string),
            collapsed: node.is_collapsed(),
            priority: node.priority(),
            compression_level: Some(node.compression_level().clone()),
            compressed_from: node.compressed_from().cloned(),
            error: node.error().map(str::to_string),
            children: node.children().iter().map(NodeRecord::from).collect(),
        }
    }
}

impl From<NodeRecord> for MemoryNode {
    fn from(record: NodeRecord) -> Self {
        let id = if record.id.is_empty() {
            new_node_id()
        } else {
            record.id
        };
        let level = record.compression_level.unwrap_or(CompressionLevel::Raw);
        let shape = match record.error {
            Some(error) => NodeShape::Blocked { error },
            None => NodeShape::Branch(record.children.into_iter().map(MemoryNode::from).collect()),
        };

        MemoryNode::from_parts(
            id,
            Role::from(record.role),
            record.cycle,
            record.content,
            record.seed,
            level,
            record.compressed_from,
            record.priority,
            shape,
        )
    }
}

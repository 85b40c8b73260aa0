//! ArcCore - policy-gated conversation memory
//!
//! Keeps a tree of conversational exchanges and degrades older entries:
//! - Scores raw content by sigil priority
//! - Gates every structural mutation through a stateless policy check
//! - Collapses nodes through ordered compression levels
//! - Reconstructs readable text from whatever level a node holds

pub mod guardian;
pub mod interpreter;
pub mod memory;
pub mod priority;
pub mod rules;

pub use guardian::{GuardianIdentity, GuardianReport};
pub use interpreter::{Command, Interpreter};
pub use memory::{
    CollapseEngine, CompressionLevel, MemoryNode, MemoryStore, MemorySystem, NodeRecord,
    Reconstructor, Role,
};
pub use priority::PriorityScorer;
pub use rules::{GatePolicy, GateVerdict, PolicyGate, PolicyViolation};

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Guardian name used when the config does not provide one
pub const DEFAULT_GUARDIAN_NAME: &str = "Arien";

/// Configuration for ArcCore
#[derive(Debug, Clone)]
pub struct ArcConfig {
    /// Directory holding config.toml and the default memory file
    pub home: PathBuf,

    /// Path to the persisted memory tree
    pub memory_file: PathBuf,

    /// Policy record handed to the gate
    pub policy: GatePolicy,

    /// Actor name folded into the guardian identity key
    pub guardian_name: String,

    /// Save the tree when the shell exits
    pub autosave: bool,
}

impl ArcConfig {
    pub fn new(home: PathBuf) -> Self {
        let memory_file = home.join("memory.json");
        Self {
            home,
            memory_file,
            policy: GatePolicy::default(),
            guardian_name: DEFAULT_GUARDIAN_NAME.to_string(),
            autosave: true,
        }
    }

    pub fn with_memory_file(mut self, path: PathBuf) -> Self {
        self.memory_file = path;
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Default location of the optional config file
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Overlay a TOML document on top of this config.
    ///
    /// Keys missing from the document keep their current values. The
    /// resulting policy is validated before it is accepted.
    pub fn apply_toml(mut self, text: &str) -> Result<Self> {
        let parsed: ConfigToml =
            toml::from_str(text).map_err(|e| ArcError::Config(e.to_string()))?;

        if let Some(path) = parsed.memory_file {
            self.memory_file = path;
        }
        if let Some(name) = parsed.guardian_name {
            self.guardian_name = name;
        }
        if let Some(autosave) = parsed.autosave {
            self.autosave = autosave;
        }
        if let Some(policy) = parsed.policy {
            let mut merged = self.policy.clone();
            if let Some(roles) = policy.allowed_roles {
                merged.allowed_roles = roles.into_iter().map(Role::from).collect::<BTreeSet<_>>();
            }
            if let Some(min) = policy.min_cycle {
                merged.min_cycle = min;
            }
            if let Some(max) = policy.max_cycle {
                merged.max_cycle = max;
            }
            if let Some(max) = policy.max_children_per_node {
                merged.max_children_per_node = max;
            }
            if let Some(max) = policy.max_depth {
                merged.max_depth = max;
            }
            merged.validate()?;
            self.policy = merged;
        }

        Ok(self)
    }

    /// Read and apply a config file if it exists. A missing file is not an error.
    pub fn load_file(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(self);
        }
        let text = std::fs::read_to_string(path)?;
        self.apply_toml(&text)
    }
}

/// On-disk config shape (`config.toml`)
#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    memory_file: Option<PathBuf>,
    guardian_name: Option<String>,
    autosave: Option<bool>,
    policy: Option<PolicyToml>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyToml {
    allowed_roles: Option<Vec<String>>,
    min_cycle: Option<i64>,
    max_cycle: Option<i64>,
    max_children_per_node: Option<usize>,
    max_depth: Option<usize>,
}

/// Result type for ArcCore operations
pub type Result<T> = std::result::Result<T, ArcError>;

/// Errors that can occur in ArcCore
#[derive(Debug, thiserror::Error)]
pub enum ArcError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ArcConfig::new(PathBuf::from("/tmp/arc"));
        assert_eq!(config.memory_file, PathBuf::from("/tmp/arc/memory.json"));
        assert_eq!(config.guardian_name, DEFAULT_GUARDIAN_NAME);
        assert!(config.autosave);
        assert_eq!(config.policy.max_depth, 40);
    }

    #[test]
    fn test_apply_toml_overrides_policy() {
        let config = ArcConfig::new(PathBuf::from("/tmp/arc"))
            .apply_toml(
                r#"
guardian_name = "Vela"
autosave = false

[policy]
allowed_roles = ["user", "ai"]
max_children_per_node = 3
"#,
            )
            .unwrap();

        assert_eq!(config.guardian_name, "Vela");
        assert!(!config.autosave);
        assert_eq!(config.policy.max_children_per_node, 3);
        assert_eq!(config.policy.max_depth, 40);
        assert!(!config.policy.allowed_roles.contains(&Role::System));
    }

    #[test]
    fn test_apply_toml_rejects_inverted_cycle_range() {
        let result = ArcConfig::new(PathBuf::from("/tmp/arc")).apply_toml(
            r#"
[policy]
min_cycle = 10
max_cycle = 2
"#,
        );
        assert!(matches!(result, Err(ArcError::Config(_))));
    }

    #[test]
    fn test_apply_toml_rejects_garbage() {
        let result = ArcConfig::new(PathBuf::from("/tmp/arc")).apply_toml("policy = [");
        assert!(matches!(result, Err(ArcError::Config(_))));
    }
}
